//! Descriptor trees of simulated devices.

use std::ffi::CString;

use thiserror::Error;
use uvcr::descriptors::{
    ControlInterface, DeviceDescriptor, FormatDescriptor, FrameDescriptor, StreamInterface,
};
use uvcr::{DescriptorSubtype, FrameFormat};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("format {format_index} declares {declared} frames but has {actual}")]
    FrameCountMismatch {
        format_index: u8,
        declared: u8,
        actual: usize,
    },
    #[error("frame {frame_index} declares {declared} intervals but has {actual}")]
    IntervalCountMismatch {
        frame_index: u8,
        declared: u8,
        actual: usize,
    },
    #[error("frame {0} has a zero interval")]
    ZeroInterval(u8),
    #[error("format {0} has different bits per pixel and flags")]
    PixelInfoMismatch(u8),
    #[error("string {0:?} contains a nul byte")]
    InteriorNul(String),
}

/// Everything a simulated device reports about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub descriptor: DeviceDescriptor,
    pub control_interface: ControlInterface,
    pub stream_interfaces: Vec<StreamInterface>,
    pub bus_number: u8,
    pub device_address: u8,
}

fn discrete_frame(
    subtype: DescriptorSubtype,
    frame_index: u8,
    width: u16,
    height: u16,
    intervals: &[u32],
) -> FrameDescriptor {
    let size = u32::from(width) * u32::from(height) * 2;
    FrameDescriptor {
        subtype,
        frame_index,
        capabilities: 0,
        width,
        height,
        min_bit_rate: size * 8,
        max_bit_rate: size * 8 * 30,
        max_video_frame_buffer_size: size,
        default_frame_interval: intervals.first().copied().unwrap_or(0),
        min_frame_interval: 0,
        max_frame_interval: 0,
        frame_interval_step: 0,
        frame_interval_type: intervals.len() as u8,
        bytes_per_line: 0,
        intervals: intervals.to_vec(),
    }
}

fn continuous_frame(
    subtype: DescriptorSubtype,
    frame_index: u8,
    width: u16,
    height: u16,
    (min, max, step): (u32, u32, u32),
) -> FrameDescriptor {
    FrameDescriptor {
        default_frame_interval: min,
        min_frame_interval: min,
        max_frame_interval: max,
        frame_interval_step: step,
        frame_interval_type: 0,
        ..discrete_frame(subtype, frame_index, width, height, &[])
    }
}

impl Topology {
    /// A typical webcam:
    ///
    /// * YUYV 640x480 at 30 or 15 fps, 320x240 at 30, 15 or 10 fps,
    /// * MJPEG 1280x720 at 60 or 30 fps, 640x480 from 5 to 30 fps in steps of 1/30s.
    ///
    /// Notably, it cannot provide 1920x1080 in any format.
    pub fn webcam() -> Self {
        let yuyv = FormatDescriptor {
            subtype: DescriptorSubtype::FormatUncompressed,
            format_index: 1,
            num_frame_descriptors: 2,
            guid: FrameFormat::Yuyv.guid().unwrap_or_default(),
            bits_per_pixel: 16,
            flags: 16,
            default_frame_index: 1,
            aspect_ratio_x: 0,
            aspect_ratio_y: 0,
            interlace_flags: 0,
            copy_protect: 0,
            variable_size: 0,
            frames: vec![
                discrete_frame(
                    DescriptorSubtype::FrameUncompressed,
                    1,
                    640,
                    480,
                    &[333_333, 666_666],
                ),
                discrete_frame(
                    DescriptorSubtype::FrameUncompressed,
                    2,
                    320,
                    240,
                    &[333_333, 666_666, 1_000_000],
                ),
            ],
        };

        let mjpeg = FormatDescriptor {
            subtype: DescriptorSubtype::FormatMjpeg,
            format_index: 2,
            num_frame_descriptors: 2,
            guid: FrameFormat::Mjpeg.guid().unwrap_or_default(),
            bits_per_pixel: 1,
            flags: 1,
            default_frame_index: 1,
            frames: vec![
                discrete_frame(
                    DescriptorSubtype::FrameMjpeg,
                    1,
                    1280,
                    720,
                    &[166_666, 333_333],
                ),
                continuous_frame(
                    DescriptorSubtype::FrameMjpeg,
                    2,
                    640,
                    480,
                    (333_333, 2_000_000, 333_333),
                ),
            ],
            ..yuyv.clone()
        };

        Topology {
            descriptor: DeviceDescriptor {
                vendor_id: 0x046d,
                product_id: 0x0825,
                bcd_uvc: 0x0100,
                serial_number: "2A7D1F50".into(),
                manufacturer: "Acme".into(),
                product: "Fake Webcam".into(),
            },
            control_interface: ControlInterface {
                bcd_uvc: 0x0100,
                interface_number: 0,
                endpoint_address: 0x87,
                clock_frequency: 48_000_000,
            },
            stream_interfaces: vec![StreamInterface {
                interface_number: 1,
                endpoint_address: 0x81,
                terminal_link: 3,
                still_capture_method: 0,
                formats: vec![yuyv, mjpeg],
            }],
            bus_number: 1,
            device_address: 4,
        }
    }

    /// Changes the UVC version reported by the device.
    pub fn with_uvc_version(mut self, bcd_uvc: u16) -> Self {
        self.descriptor.bcd_uvc = bcd_uvc;
        self.control_interface.bcd_uvc = bcd_uvc;
        self
    }

    /// Checks that the native tree built from this topology reads back identically.
    pub fn validate(&self) -> Result<(), TopologyError> {
        for s in [
            &self.descriptor.serial_number,
            &self.descriptor.manufacturer,
            &self.descriptor.product,
        ] {
            CString::new(s.as_str()).map_err(|_| TopologyError::InteriorNul(s.clone()))?;
        }

        for format in self.stream_interfaces.iter().flat_map(|i| &i.formats) {
            if usize::from(format.num_frame_descriptors) != format.frames.len() {
                return Err(TopologyError::FrameCountMismatch {
                    format_index: format.format_index,
                    declared: format.num_frame_descriptors,
                    actual: format.frames.len(),
                });
            }
            // Both share the same byte in the native descriptor.
            if format.bits_per_pixel != format.flags {
                return Err(TopologyError::PixelInfoMismatch(format.format_index));
            }

            for frame in &format.frames {
                if usize::from(frame.frame_interval_type) != frame.intervals.len() {
                    return Err(TopologyError::IntervalCountMismatch {
                        frame_index: frame.frame_index,
                        declared: frame.frame_interval_type,
                        actual: frame.intervals.len(),
                    });
                }
                if frame.intervals.contains(&0) {
                    return Err(TopologyError::ZeroInterval(frame.frame_index));
                }
            }
        }

        Ok(())
    }

    /// Looks up a frame by interface number, format index and frame index.
    pub fn frame(
        &self,
        interface: u8,
        format_index: u8,
        frame_index: u8,
    ) -> Option<&FrameDescriptor> {
        self.stream_interfaces
            .iter()
            .find(|i| i.interface_number == interface)?
            .formats
            .iter()
            .find(|f| f.format_index == format_index)?
            .frames
            .iter()
            .find(|f| f.frame_index == frame_index)
    }

    pub fn has_interface(&self, interface: u8) -> bool {
        self.stream_interfaces
            .iter()
            .any(|i| i.interface_number == interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webcam_is_valid() {
        assert_eq!(Topology::webcam().validate(), Ok(()));
    }

    #[test]
    fn test_validate() {
        let mut topology = Topology::webcam();
        topology.stream_interfaces[0].formats[0].num_frame_descriptors = 3;
        assert_eq!(
            topology.validate(),
            Err(TopologyError::FrameCountMismatch {
                format_index: 1,
                declared: 3,
                actual: 2
            })
        );

        let mut topology = Topology::webcam();
        topology.stream_interfaces[0].formats[1].frames[0].intervals[1] = 0;
        assert_eq!(topology.validate(), Err(TopologyError::ZeroInterval(1)));

        let mut topology = Topology::webcam();
        topology.descriptor.product = "a\0b".into();
        assert!(matches!(
            topology.validate(),
            Err(TopologyError::InteriorNul(_))
        ));
    }

    #[test]
    fn test_frame_lookup() {
        let topology = Topology::webcam();
        assert_eq!(topology.frame(1, 2, 1).map(|f| f.width), Some(1280));
        assert!(topology.frame(1, 3, 1).is_none());
        assert!(topology.frame(2, 1, 1).is_none());
        assert!(topology.has_interface(1));
    }
}
