//! Owned snapshots of a device's descriptors.
//!
//! The native library exposes the capability tree of an open device as pointer-linked lists owned
//! by the device handle:
//!
//! ```text
//! control interface
//! stream interface -> stream interface -> ...
//!   `- format -> format -> ...
//!        `- frame -> frame -> ...
//! ```
//!
//! [`Device::stream_interfaces`] walks that tree while holding the device lock in read mode for the
//! whole walk, and copies every node into the plain values defined here. Nothing returned by this
//! module borrows native memory, so the values remain usable after the device is closed.
//!
//! Every type implements `Display` as a stable `Field: value` dump, one line per field.

use std::ffi::CStr;
use std::fmt;
use std::marker::PhantomData;
use std::os::raw::c_char;

use bitflags::bitflags;

use crate::backend::Backend;
use crate::bindings;
use crate::device::{Device, OpenHandle};
use crate::{DescriptorSubtype, FrameFormat};

/// Number of 100ns units in a second, i.e. the frame interval of a 1 fps stream.
pub const INTERVALS_PER_SECOND: u32 = 10_000_000;

bitflags! {
    /// `bmCapabilities` of a frame descriptor.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FrameCapabilities: u8 {
        const STILL_IMAGE = 1 << 0;
        const FIXED_FRAME_RATE = 1 << 1;
    }
}

bitflags! {
    /// `bmInterlaceFlags` of a format descriptor.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InterlaceFlags: u8 {
        const INTERLACED = 1 << 0;
        const ONE_FIELD_PER_FRAME = 1 << 1;
        const FIELD_1_FIRST = 1 << 2;
        const FIELD_PATTERN_LOW = 1 << 4;
        const FIELD_PATTERN_HIGH = 1 << 5;
    }
}

bitflags! {
    /// `bmFlags` of an MJPEG format descriptor.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MjpegFlags: u8 {
        const FIXED_SIZE_SAMPLES = 1 << 0;
    }
}

/// Copies a possibly null C string.
///
/// # Safety
///
/// `ptr` must be null or point to a nul-terminated string.
unsafe fn string_from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// Node of one of the native singly-linked descriptor lists.
trait NativeNode {
    fn next_node(&self) -> *const Self;
}

impl NativeNode for bindings::uvc_streaming_interface {
    fn next_node(&self) -> *const Self {
        self.next
    }
}

impl NativeNode for bindings::uvc_format_desc {
    fn next_node(&self) -> *const Self {
        self.next
    }
}

impl NativeNode for bindings::uvc_frame_desc {
    fn next_node(&self) -> *const Self {
        self.next
    }
}

/// Iterator over a native list, from its head to the null sentinel.
struct NativeList<'a, T: NativeNode> {
    cur: *const T,
    _list: PhantomData<&'a T>,
}

impl<'a, T: NativeNode> NativeList<'a, T> {
    /// # Safety
    ///
    /// `head` and every node reachable from it must be null or valid for `'a`.
    unsafe fn new(head: *const T) -> Self {
        NativeList {
            cur: head,
            _list: PhantomData,
        }
    }
}

impl<'a, T: NativeNode> Iterator for NativeList<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: validity of all the nodes is guaranteed by the caller of `new`.
        let node = unsafe { self.cur.as_ref() }?;
        self.cur = node.next_node();
        Some(node)
    }
}

/// Copies a zero-terminated array of frame intervals.
///
/// # Safety
///
/// `ptr` must be null or point to a zero-terminated array.
unsafe fn copy_intervals(ptr: *const u32) -> Vec<u32> {
    let mut intervals = Vec::new();
    if ptr.is_null() {
        return intervals;
    }

    let mut cur = ptr;
    while *cur != 0 {
        intervals.push(*cur);
        cur = cur.add(1);
    }
    intervals
}

/// USB device descriptor of a UVC device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bcd_uvc: u16,
    pub serial_number: String,
    pub manufacturer: String,
    pub product: String,
}

impl DeviceDescriptor {
    /// # Safety
    ///
    /// The string members of `desc` must be null or point to nul-terminated strings.
    pub(crate) unsafe fn from_native(desc: &bindings::uvc_device_descriptor) -> Self {
        DeviceDescriptor {
            vendor_id: desc.idVendor,
            product_id: desc.idProduct,
            bcd_uvc: desc.bcdUVC,
            serial_number: string_from_ptr(desc.serialNumber),
            manufacturer: string_from_ptr(desc.manufacturer),
            product: string_from_ptr(desc.product),
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VendorID: {:04x}", self.vendor_id)?;
        writeln!(f, "ProductID: {:04x}", self.product_id)?;
        writeln!(f, "SerialNumber: {}", self.serial_number)?;
        writeln!(f, "BcdUVC: {}", self.bcd_uvc)?;
        writeln!(f, "Manufacturer: {}", self.manufacturer)?;
        writeln!(f, "Product: {}", self.product)
    }
}

/// The VideoControl interface of a device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlInterface {
    /// UVC version implemented by the device, in BCD.
    pub bcd_uvc: u16,
    pub interface_number: u8,
    /// Endpoint of the status interrupt pipe, 0 if there is none.
    pub endpoint_address: u8,
    /// Device clock frequency in Hz.
    pub clock_frequency: u32,
}

impl From<&bindings::uvc_control_interface> for ControlInterface {
    fn from(itf: &bindings::uvc_control_interface) -> Self {
        ControlInterface {
            bcd_uvc: itf.bcdUVC,
            interface_number: itf.bInterfaceNumber,
            endpoint_address: itf.bEndpointAddress,
            clock_frequency: itf.dwClockFrequency,
        }
    }
}

impl fmt::Display for ControlInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bcdUVC: {}", self.bcd_uvc)?;
        writeln!(f, "InterfaceNumber: {}", self.interface_number)?;
        writeln!(f, "EndpointAddress: {}", self.endpoint_address)?;
        writeln!(f, "ClockFrequency: {}", self.clock_frequency)
    }
}

/// A VideoStreaming interface and the formats it provides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInterface {
    pub interface_number: u8,
    /// USB endpoint to use when streaming from this interface.
    pub endpoint_address: u8,
    pub terminal_link: u8,
    pub still_capture_method: u8,
    pub formats: Vec<FormatDescriptor>,
}

impl StreamInterface {
    /// Formats in the order the device declares them.
    pub fn format_descriptors(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    /// Copies `itf` and its formats, calling `on_format` after each format has been copied.
    ///
    /// # Safety
    ///
    /// Every node reachable from `itf` must be valid for the duration of the call.
    unsafe fn from_native<F>(itf: &bindings::uvc_streaming_interface, on_format: &mut F) -> Self
    where
        F: FnMut(&FormatDescriptor),
    {
        StreamInterface {
            interface_number: itf.bInterfaceNumber,
            endpoint_address: itf.bEndpointAddress,
            terminal_link: itf.bTerminalLink,
            still_capture_method: itf.bStillCaptureMethod,
            formats: NativeList::new(itf.format_descs.cast_const())
                .map(|desc| {
                    let format = FormatDescriptor::from_native(desc);
                    on_format(&format);
                    format
                })
                .collect(),
        }
    }
}

impl fmt::Display for StreamInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "InterfaceNumber: {}", self.interface_number)?;
        writeln!(f, "EndpointAddress: {}", self.endpoint_address)?;
        writeln!(f, "TerminalLink: {}", self.terminal_link)?;
        writeln!(f, "StillCaptureMethod: {}", self.still_capture_method)
    }
}

/// Interpretation of the format-specific byte of a format descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelInfo {
    /// Uncompressed and frame-based formats.
    BitsPerPixel(u8),
    /// MJPEG formats.
    Mjpeg(MjpegFlags),
    /// Formats for which the byte has no known meaning.
    Raw(u8),
}

/// A video format (e.g. YUYV or MJPEG) and the frame configurations available for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub subtype: DescriptorSubtype,
    /// Identifier of this format within its interface.
    pub format_index: u8,
    pub num_frame_descriptors: u8,
    /// Format GUID. For MJPEG formats only the first four bytes (the fourcc) are set.
    pub guid: [u8; 16],
    /// The format-specific byte read as bits per pixel. Only meaningful for uncompressed and
    /// frame-based formats, see [`FormatDescriptor::pixel_info`].
    pub bits_per_pixel: u8,
    /// The format-specific byte read as flags. Only meaningful for MJPEG formats.
    pub flags: u8,
    pub default_frame_index: u8,
    pub aspect_ratio_x: u8,
    pub aspect_ratio_y: u8,
    pub interlace_flags: u8,
    pub copy_protect: u8,
    pub variable_size: u8,
    pub frames: Vec<FrameDescriptor>,
}

impl FormatDescriptor {
    /// Frames in the order the device declares them.
    pub fn frame_descriptors(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    /// Decodes the format-specific byte according to the subtype.
    pub fn pixel_info(&self) -> PixelInfo {
        match self.subtype {
            DescriptorSubtype::FormatUncompressed | DescriptorSubtype::FormatFrameBased => {
                PixelInfo::BitsPerPixel(self.bits_per_pixel)
            }
            DescriptorSubtype::FormatMjpeg => {
                PixelInfo::Mjpeg(MjpegFlags::from_bits_retain(self.flags))
            }
            _ => PixelInfo::Raw(self.bits_per_pixel),
        }
    }

    pub fn fourcc(&self) -> [u8; 4] {
        [self.guid[0], self.guid[1], self.guid[2], self.guid[3]]
    }

    /// The concrete frame format carried by this descriptor, if known.
    pub fn frame_format(&self) -> Option<FrameFormat> {
        FrameFormat::from_guid(&self.guid)
    }

    pub fn interlace(&self) -> InterlaceFlags {
        InterlaceFlags::from_bits_retain(self.interlace_flags)
    }

    /// # Safety
    ///
    /// Every node reachable from `desc` must be valid for the duration of the call.
    unsafe fn from_native(desc: &bindings::uvc_format_desc) -> Self {
        // Both union members are plain bytes sharing the same storage, so each read is valid;
        // which one is meaningful is decided by `pixel_info`.
        let bits_per_pixel = desc.__bindgen_anon_2.bBitsPerPixel;
        let flags = desc.__bindgen_anon_2.bmFlags;

        FormatDescriptor {
            subtype: DescriptorSubtype::from(desc.bDescriptorSubtype),
            format_index: desc.bFormatIndex,
            num_frame_descriptors: desc.bNumFrameDescriptors,
            guid: desc.__bindgen_anon_1.guidFormat,
            bits_per_pixel,
            flags,
            default_frame_index: desc.bDefaultFrameIndex,
            aspect_ratio_x: desc.bAspectRatioX,
            aspect_ratio_y: desc.bAspectRatioY,
            interlace_flags: desc.bmInterlaceFlags,
            copy_protect: desc.bCopyProtect,
            variable_size: desc.bVariableSize,
            frames: NativeList::new(desc.frame_descs.cast_const())
                .map(|frame| FrameDescriptor::from_native(frame))
                .collect(),
        }
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subtype: {}", self.subtype)?;
        writeln!(f, "FormatIndex: {}", self.format_index)?;
        writeln!(f, "NumFrameDescriptors: {}", self.num_frame_descriptors)?;
        writeln!(f, "BitsPerPixel: {}", self.bits_per_pixel)?;
        writeln!(f, "Flags: {}", self.flags)?;
        writeln!(f, "DefaultFrameIndex: {}", self.default_frame_index)?;
        writeln!(f, "AspectRatioX: {}", self.aspect_ratio_x)?;
        writeln!(f, "AspectRatioY: {}", self.aspect_ratio_y)?;
        writeln!(f, "InterlaceFlags: {}", self.interlace_flags)?;
        writeln!(f, "CopyProtect: {}", self.copy_protect)?;
        writeln!(f, "VariableSize: {}", self.variable_size)?;
        write!(f, "GuidFormat: ")?;
        for byte in self.guid {
            write!(f, "{:02x}", byte)?;
        }
        writeln!(f)
    }
}

/// Frame intervals supported by a frame descriptor, in 100ns units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameIntervals<'a> {
    Continuous { min: u32, max: u32, step: u32 },
    Discrete(&'a [u32]),
}

/// One image size of a format, and the frame rates available for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub subtype: DescriptorSubtype,
    /// Index of the frame within its format.
    pub frame_index: u8,
    pub capabilities: u8,
    pub width: u16,
    pub height: u16,
    /// Bitrate at the minimal frame rate.
    pub min_bit_rate: u32,
    /// Bitrate at the maximal frame rate.
    pub max_bit_rate: u32,
    pub max_video_frame_buffer_size: u32,
    pub default_frame_interval: u32,
    pub min_frame_interval: u32,
    pub max_frame_interval: u32,
    pub frame_interval_step: u32,
    /// 0 for continuous intervals, otherwise the number of discrete intervals.
    pub frame_interval_type: u8,
    pub bytes_per_line: u32,
    /// Discrete intervals, empty in continuous mode.
    pub intervals: Vec<u32>,
}

impl FrameDescriptor {
    pub fn intervals(&self) -> &[u32] {
        &self.intervals
    }

    pub fn frame_intervals(&self) -> FrameIntervals<'_> {
        match self.frame_interval_type {
            0 => FrameIntervals::Continuous {
                min: self.min_frame_interval,
                max: self.max_frame_interval,
                step: self.frame_interval_step,
            },
            _ => FrameIntervals::Discrete(&self.intervals),
        }
    }

    pub fn capability_flags(&self) -> FrameCapabilities {
        FrameCapabilities::from_bits_retain(self.capabilities)
    }

    /// Returns the frame interval to request to obtain `fps` frames per second, if supported.
    ///
    /// An `fps` of 0 selects the first discrete interval, or the default one in continuous mode.
    pub fn interval_for_fps(&self, fps: u32) -> Option<u32> {
        match self.frame_intervals() {
            FrameIntervals::Discrete(intervals) => intervals
                .iter()
                .copied()
                .find(|&interval| {
                    fps == 0 || INTERVALS_PER_SECOND.checked_div(interval) == Some(fps)
                }),
            FrameIntervals::Continuous { .. } if fps == 0 => Some(self.default_frame_interval),
            FrameIntervals::Continuous { min, max, step } => {
                let interval = INTERVALS_PER_SECOND / fps;
                if interval < min || interval > max {
                    return None;
                }
                match interval - min {
                    0 => Some(interval),
                    _ if step == 0 => None,
                    offset if offset % step == 0 => Some(interval),
                    _ => None,
                }
            }
        }
    }

    /// # Safety
    ///
    /// `frame.intervals` must be null or a valid zero-terminated array.
    unsafe fn from_native(frame: &bindings::uvc_frame_desc) -> Self {
        FrameDescriptor {
            subtype: DescriptorSubtype::from(frame.bDescriptorSubtype),
            frame_index: frame.bFrameIndex,
            capabilities: frame.bmCapabilities,
            width: frame.wWidth,
            height: frame.wHeight,
            min_bit_rate: frame.dwMinBitRate,
            max_bit_rate: frame.dwMaxBitRate,
            max_video_frame_buffer_size: frame.dwMaxVideoFrameBufferSize,
            default_frame_interval: frame.dwDefaultFrameInterval,
            min_frame_interval: frame.dwMinFrameInterval,
            max_frame_interval: frame.dwMaxFrameInterval,
            frame_interval_step: frame.dwFrameIntervalStep,
            frame_interval_type: frame.bFrameIntervalType,
            bytes_per_line: frame.dwBytesPerLine,
            intervals: copy_intervals(frame.intervals),
        }
    }
}

impl fmt::Display for FrameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subtype: {}", self.subtype)?;
        writeln!(f, "FrameIndex: {}", self.frame_index)?;
        writeln!(f, "Capabilities: {}", self.capabilities)?;
        writeln!(f, "Width: {}", self.width)?;
        writeln!(f, "Height: {}", self.height)?;
        writeln!(f, "MinBitRate: {}", self.min_bit_rate)?;
        writeln!(f, "MaxBitRate: {}", self.max_bit_rate)?;
        writeln!(
            f,
            "MaxVideoFrameBufferSize: {}",
            self.max_video_frame_buffer_size
        )?;
        writeln!(f, "DefaultFrameInterval: {}", self.default_frame_interval)?;
        writeln!(f, "MinFrameInterval: {}", self.min_frame_interval)?;
        writeln!(f, "MaxFrameInterval: {}", self.max_frame_interval)?;
        writeln!(f, "FrameIntervalStep: {}", self.frame_interval_step)?;
        writeln!(f, "FrameIntervalType: {}", self.frame_interval_type)?;
        writeln!(f, "BytesPerLine: {}", self.bytes_per_line)?;
        let intervals = self
            .intervals
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(f, "Intervals: {}", intervals)
    }
}

/// Copies the stream interfaces of the capability tree of `handle`, reporting each copied format
/// to the backend.
pub(crate) fn stream_interfaces_from<B: Backend + ?Sized>(
    handle: &OpenHandle<'_, B>,
) -> Vec<StreamInterface> {
    let Some(info) = handle.info() else {
        return Vec::new();
    };
    let mut on_format = |format: &FormatDescriptor| {
        handle
            .backend()
            .format_copied(handle.raw(), format.format_index)
    };

    // SAFETY: the tree stays valid for as long as `handle` holds the lock, which it does until we
    // return.
    unsafe {
        NativeList::new(info.stream_ifs.cast_const())
            .map(|itf| StreamInterface::from_native(itf, &mut on_format))
            .collect()
    }
}

impl<B: Backend + ?Sized> Device<B> {
    /// Returns the VideoControl interface of the device, or `None` if it is closed.
    pub fn control_interface(&self) -> Option<ControlInterface> {
        let handle = self.open_handle()?;
        let info = handle.info()?;

        Some(ControlInterface::from(&info.ctrl_if))
    }

    /// Returns the VideoStreaming interfaces of the device with all their formats and frames, or
    /// an empty list if it is closed.
    pub fn stream_interfaces(&self) -> Vec<StreamInterface> {
        // The read lock is held until the whole tree has been copied.
        match self.open_handle() {
            Some(handle) => stream_interfaces_from(&handle),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(intervals: &[u32]) -> FrameDescriptor {
        FrameDescriptor {
            subtype: DescriptorSubtype::FrameUncompressed,
            frame_index: 1,
            width: 640,
            height: 480,
            default_frame_interval: intervals.first().copied().unwrap_or(333_333),
            frame_interval_type: intervals.len() as u8,
            intervals: intervals.to_vec(),
            ..Default::default()
        }
    }

    fn continuous(min: u32, max: u32, step: u32) -> FrameDescriptor {
        FrameDescriptor {
            default_frame_interval: min,
            min_frame_interval: min,
            max_frame_interval: max,
            frame_interval_step: step,
            frame_interval_type: 0,
            ..frame(&[])
        }
    }

    #[test]
    fn test_discrete_intervals() {
        let frame = frame(&[333_333, 666_666, 1_000_000]);
        assert_eq!(
            frame.frame_intervals(),
            FrameIntervals::Discrete(&[333_333, 666_666, 1_000_000])
        );
        assert_eq!(frame.interval_for_fps(30), Some(333_333));
        assert_eq!(frame.interval_for_fps(15), Some(666_666));
        assert_eq!(frame.interval_for_fps(10), Some(1_000_000));
        assert_eq!(frame.interval_for_fps(60), None);
        assert_eq!(frame.interval_for_fps(0), Some(333_333));
    }

    #[test]
    fn test_continuous_intervals() {
        // 5 to 30 fps, in steps of 1/30 s.
        let frame = continuous(333_333, 2_000_000, 333_333);
        assert_eq!(
            frame.frame_intervals(),
            FrameIntervals::Continuous {
                min: 333_333,
                max: 2_000_000,
                step: 333_333
            }
        );
        assert_eq!(frame.interval_for_fps(30), Some(333_333));
        assert_eq!(frame.interval_for_fps(0), Some(333_333));
        // 15 fps = 666_666, one step above the minimum.
        assert_eq!(frame.interval_for_fps(15), Some(666_666));
        // 10 fps = 1_000_000 is off the step grid.
        assert_eq!(frame.interval_for_fps(10), None);
        // Out of range.
        assert_eq!(frame.interval_for_fps(60), None);
        assert_eq!(frame.interval_for_fps(1), None);

        let stepless = continuous(333_333, 1_000_000, 0);
        assert_eq!(stepless.interval_for_fps(30), Some(333_333));
        assert_eq!(stepless.interval_for_fps(15), None);
    }

    #[test]
    fn test_pixel_info() {
        let mut format = FormatDescriptor {
            subtype: DescriptorSubtype::FormatUncompressed,
            bits_per_pixel: 16,
            flags: 16,
            ..Default::default()
        };
        assert_eq!(format.pixel_info(), PixelInfo::BitsPerPixel(16));

        format.subtype = DescriptorSubtype::FormatMjpeg;
        format.bits_per_pixel = 1;
        format.flags = 1;
        assert_eq!(
            format.pixel_info(),
            PixelInfo::Mjpeg(MjpegFlags::FIXED_SIZE_SAMPLES)
        );

        format.subtype = DescriptorSubtype::FormatDv;
        assert_eq!(format.pixel_info(), PixelInfo::Raw(1));
    }

    #[test]
    fn test_copy_intervals() {
        let native = [333_333u32, 666_666, 0, 42];
        assert_eq!(
            unsafe { copy_intervals(native.as_ptr()) },
            vec![333_333, 666_666]
        );
        assert!(unsafe { copy_intervals(std::ptr::null()) }.is_empty());
    }

    #[test]
    fn test_device_descriptor_dump() {
        let desc = DeviceDescriptor {
            vendor_id: 0x046d,
            product_id: 0x0825,
            bcd_uvc: 0x0100,
            serial_number: "ABC123".into(),
            manufacturer: "Acme".into(),
            product: "Webcam".into(),
        };
        assert_eq!(
            desc.to_string(),
            "VendorID: 046d\n\
             ProductID: 0825\n\
             SerialNumber: ABC123\n\
             BcdUVC: 256\n\
             Manufacturer: Acme\n\
             Product: Webcam\n"
        );
    }

    #[test]
    fn test_frame_descriptor_dump() {
        let dump = frame(&[333_333, 666_666]).to_string();
        let fields = dump
            .lines()
            .map(|l| l.split(": ").next().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            fields,
            [
                "Subtype",
                "FrameIndex",
                "Capabilities",
                "Width",
                "Height",
                "MinBitRate",
                "MaxBitRate",
                "MaxVideoFrameBufferSize",
                "DefaultFrameInterval",
                "MinFrameInterval",
                "MaxFrameInterval",
                "FrameIntervalStep",
                "FrameIntervalType",
                "BytesPerLine",
                "Intervals",
            ]
        );
        assert!(dump.ends_with("Intervals: 333333,666666\n"));
        assert!(dump.starts_with("Subtype: 5\n"));
    }
}
