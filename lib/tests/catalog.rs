mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use uvcr::descriptors::{FrameIntervals, MjpegFlags, PixelInfo};
use uvcr::device::DeviceConfig;
use uvcr::{DescriptorSubtype, FrameFormat};
use uvcr_utils::{Call, Topology};

use common::{webcam, webcam_with};

#[test]
fn test_closed_device_has_no_descriptors() {
    let (backend, _, device) = webcam();

    assert_eq!(device.control_interface(), None);
    assert!(device.stream_interfaces().is_empty());
    assert!(backend.calls().is_empty());

    device.open().unwrap();
    device.close();
    assert_eq!(device.control_interface(), None);
    assert!(device.stream_interfaces().is_empty());
}

#[test]
fn test_deep_copy_matches_device() {
    let topology = Topology::webcam();
    let (_, _, device) = webcam();
    device.open().unwrap();

    assert_eq!(
        device.control_interface(),
        Some(topology.control_interface.clone())
    );
    assert_eq!(device.stream_interfaces(), topology.stream_interfaces);
}

#[test]
fn test_copies_outlive_handle() {
    let (backend, _, device) = webcam();
    device.open().unwrap();
    let interfaces = device.stream_interfaces();
    let control = device.control_interface();

    device.close();
    assert_eq!(backend.open_handles(), 0);

    // Everything has been copied out of the freed tree.
    assert_eq!(interfaces, Topology::webcam().stream_interfaces);
    assert_eq!(control.map(|c| c.clock_frequency), Some(48_000_000));
}

#[test]
fn test_declaration_order() {
    let (_, _, device) = webcam();
    device.open().unwrap();
    let interfaces = device.stream_interfaces();
    assert_eq!(interfaces.len(), 1);

    let formats = interfaces[0].format_descriptors();
    assert_eq!(
        formats.iter().map(|f| f.format_index).collect::<Vec<_>>(),
        [1, 2]
    );
    for format in formats {
        assert_eq!(
            format
                .frame_descriptors()
                .iter()
                .map(|f| f.frame_index)
                .collect::<Vec<_>>(),
            [1, 2]
        );
    }
}

#[test]
fn test_descriptor_interpretation() {
    let (_, _, device) = webcam();
    device.open().unwrap();
    let interfaces = device.stream_interfaces();
    let formats = interfaces[0].format_descriptors();

    let yuyv = &formats[0];
    assert_eq!(yuyv.subtype, DescriptorSubtype::FormatUncompressed);
    assert_eq!(yuyv.frame_format(), Some(FrameFormat::Yuyv));
    assert_eq!(&yuyv.fourcc(), b"YUY2");
    assert_eq!(yuyv.pixel_info(), PixelInfo::BitsPerPixel(16));
    assert_eq!(
        yuyv.frame_descriptors()[1].intervals(),
        [333_333, 666_666, 1_000_000]
    );

    let mjpeg = &formats[1];
    assert_eq!(mjpeg.subtype, DescriptorSubtype::FormatMjpeg);
    assert_eq!(mjpeg.frame_format(), Some(FrameFormat::Mjpeg));
    assert_eq!(
        mjpeg.pixel_info(),
        PixelInfo::Mjpeg(MjpegFlags::FIXED_SIZE_SAMPLES)
    );

    let hd = &mjpeg.frame_descriptors()[0];
    assert_eq!((hd.width, hd.height), (1280, 720));
    assert_eq!(
        hd.frame_intervals(),
        FrameIntervals::Discrete(&[166_666, 333_333])
    );

    let vga = &mjpeg.frame_descriptors()[1];
    assert!(vga.intervals().is_empty());
    assert_eq!(
        vga.frame_intervals(),
        FrameIntervals::Continuous {
            min: 333_333,
            max: 2_000_000,
            step: 333_333
        }
    );
}

#[test]
fn test_dumps() {
    let (_, _, device) = webcam_with(
        Topology::webcam().with_uvc_version(0x0110),
        DeviceConfig::new(),
    );
    device.open().unwrap();

    assert_eq!(
        device.control_interface().unwrap().to_string(),
        "bcdUVC: 272\n\
         InterfaceNumber: 0\n\
         EndpointAddress: 135\n\
         ClockFrequency: 48000000\n"
    );

    let interfaces = device.stream_interfaces();
    assert_eq!(
        interfaces[0].to_string(),
        "InterfaceNumber: 1\n\
         EndpointAddress: 129\n\
         TerminalLink: 3\n\
         StillCaptureMethod: 0\n"
    );

    let yuyv = interfaces[0].format_descriptors()[0].to_string();
    assert!(yuyv.starts_with("Subtype: 4\nFormatIndex: 1\nNumFrameDescriptors: 2\n"));
    assert!(yuyv.ends_with("GuidFormat: 5955593200001000800000aa00389b71\n"));
}

#[test]
fn test_traversal_holds_off_close() {
    let (backend, _, device) = webcam();
    let device = Arc::new(device);
    device.open().unwrap();

    let gate = backend.pause_next_traversal();
    let reader = {
        let device = device.clone();
        thread::spawn(move || device.stream_interfaces())
    };
    // The reader has copied the first format, the rest of the tree is still to be walked.
    assert_eq!(gate.wait_entered(), Some(1));

    // The reader holds the device lock in read mode.
    let closer = {
        let device = device.clone();
        thread::spawn(move || device.close())
    };
    thread::sleep(Duration::from_millis(50));
    assert_eq!(backend.count_calls(|c| *c == Call::Close), 0);
    assert_eq!(backend.open_handles(), 1);

    gate.release();
    let interfaces = reader.join().unwrap();
    closer.join().unwrap();

    assert_eq!(interfaces, Topology::webcam().stream_interfaces);
    assert_eq!(backend.count_calls(|c| *c == Call::Close), 1);
    assert_eq!(backend.open_handles(), 0);
    assert!(device.is_closed());
}

#[test]
fn test_traversals_racing_close() {
    let expected = Topology::webcam().stream_interfaces;
    let (_, _, device) = webcam();
    let device = Arc::new(device);

    let toggler = {
        let device = device.clone();
        thread::spawn(move || {
            for _ in 0..100 {
                device.open().unwrap();
                thread::yield_now();
                device.close();
            }
        })
    };

    let readers = (0..4)
        .map(|_| {
            let device = device.clone();
            let expected = expected.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let interfaces = device.stream_interfaces();
                    // Either the device was closed, or we got a full copy.
                    assert!(interfaces.is_empty() || interfaces == expected);
                }
            })
        })
        .collect::<Vec<_>>();

    toggler.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
