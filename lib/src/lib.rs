//! This library provides a safe control plane over USB Video Class devices:
//!
//! * The `device` module wraps a native device reference and its optional open handle into a
//!   [`device::Device`], whose open/closed state is guarded by a reader-writer lock so it can be
//!   shared between threads and closed at any time.
//!
//! * The `descriptors` module copies the capability tree of an open device (control interface,
//!   streaming interfaces, formats and frames) into owned values while the device lock is held.
//!
//! * The `stream` module negotiates streaming parameters with the device using the UVC
//!   probe/commit protocol, and hands the result over to the code performing the actual transfers.
//!
//! * The `controls` module applies exposure and brightness controls.
//!
//! All native calls go through the [`backend::Backend`] trait. With the `libuvc` feature, the
//! [`backend::LibUvc`] backend links against the system libuvc.
//!
#[doc(hidden)]
pub mod bindings;
pub mod backend;
pub mod controls;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod stream;

pub use error::{Error, ErrorKind, Result};

use std::fmt;
use std::fmt::{Debug, Display};

use enumn::N;

/// Frame formats that can be requested when negotiating a stream.
///
/// `Any`, `Uncompressed` and `Compressed` are abstract: they match any of a group of concrete
/// formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, N)]
#[repr(u32)]
pub enum FrameFormat {
    Any = bindings::UVC_FRAME_FORMAT_ANY,
    Uncompressed = bindings::UVC_FRAME_FORMAT_UNCOMPRESSED,
    Compressed = bindings::UVC_FRAME_FORMAT_COMPRESSED,
    Yuyv = bindings::UVC_FRAME_FORMAT_YUYV,
    Uyvy = bindings::UVC_FRAME_FORMAT_UYVY,
    Rgb = bindings::UVC_FRAME_FORMAT_RGB,
    Bgr = bindings::UVC_FRAME_FORMAT_BGR,
    Mjpeg = bindings::UVC_FRAME_FORMAT_MJPEG,
    H264 = bindings::UVC_FRAME_FORMAT_H264,
    Gray8 = bindings::UVC_FRAME_FORMAT_GRAY8,
    Gray16 = bindings::UVC_FRAME_FORMAT_GRAY16,
    By8 = bindings::UVC_FRAME_FORMAT_BY8,
    Ba81 = bindings::UVC_FRAME_FORMAT_BA81,
    Sgrbg8 = bindings::UVC_FRAME_FORMAT_SGRBG8,
    Sgbrg8 = bindings::UVC_FRAME_FORMAT_SGBRG8,
    Srggb8 = bindings::UVC_FRAME_FORMAT_SRGGB8,
    Sbggr8 = bindings::UVC_FRAME_FORMAT_SBGGR8,
    Nv12 = bindings::UVC_FRAME_FORMAT_NV12,
}

/// Trailing 12 bytes shared by the GUIDs of the standard uncompressed formats.
const GUID_TAIL: [u8; 12] = [
    0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

const fn guid_from_fourcc(fourcc: &[u8; 4]) -> [u8; 16] {
    let mut guid = [0u8; 16];
    let mut i = 0;
    while i < 16 {
        guid[i] = if i < 4 { fourcc[i] } else { GUID_TAIL[i - 4] };
        i += 1;
    }
    guid
}

const fn guid_from_fourcc_only(fourcc: &[u8; 4]) -> [u8; 16] {
    [
        fourcc[0], fourcc[1], fourcc[2], fourcc[3], 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ]
}

impl FrameFormat {
    /// Returns the format GUID a format descriptor must carry to match this format, or `None` for
    /// abstract formats and formats without a standard GUID.
    pub const fn guid(self) -> Option<[u8; 16]> {
        Some(match self {
            FrameFormat::Yuyv => guid_from_fourcc(b"YUY2"),
            FrameFormat::Uyvy => guid_from_fourcc(b"UYVY"),
            FrameFormat::Gray8 => guid_from_fourcc(b"Y800"),
            FrameFormat::Gray16 => guid_from_fourcc(b"Y16 "),
            FrameFormat::By8 => guid_from_fourcc(b"BY8 "),
            FrameFormat::Ba81 => guid_from_fourcc(b"BA81"),
            FrameFormat::Sgrbg8 => guid_from_fourcc(b"GRBG"),
            FrameFormat::Sgbrg8 => guid_from_fourcc(b"GBRG"),
            FrameFormat::Srggb8 => guid_from_fourcc(b"RGGB"),
            FrameFormat::Sbggr8 => guid_from_fourcc(b"BGGR"),
            FrameFormat::Nv12 => guid_from_fourcc(b"NV12"),
            FrameFormat::H264 => guid_from_fourcc(b"H264"),
            // MJPEG descriptors carry no GUID; the fourcc is filled in when parsing them.
            FrameFormat::Mjpeg => guid_from_fourcc_only(b"MJPG"),
            FrameFormat::Any
            | FrameFormat::Uncompressed
            | FrameFormat::Compressed
            | FrameFormat::Rgb
            | FrameFormat::Bgr => return None,
        })
    }

    /// Concrete formats an abstract format stands for. Concrete formats return an empty slice.
    pub fn children(self) -> &'static [FrameFormat] {
        match self {
            FrameFormat::Any => &[FrameFormat::Uncompressed, FrameFormat::Compressed],
            FrameFormat::Uncompressed => &[
                FrameFormat::Yuyv,
                FrameFormat::Uyvy,
                FrameFormat::Gray8,
                FrameFormat::Gray16,
                FrameFormat::Nv12,
            ],
            FrameFormat::Compressed => &[FrameFormat::Mjpeg, FrameFormat::H264],
            _ => &[],
        }
    }

    /// Whether a format descriptor carrying `guid` can provide frames of this format.
    pub fn matches_guid(self, guid: &[u8; 16]) -> bool {
        match self.guid() {
            Some(own) => own == *guid,
            None => self.children().iter().any(|f| f.matches_guid(guid)),
        }
    }

    /// Reverse lookup of a concrete format from a descriptor GUID.
    pub fn from_guid(guid: &[u8; 16]) -> Option<Self> {
        (bindings::UVC_FRAME_FORMAT_YUYV..=bindings::UVC_FRAME_FORMAT_NV12)
            .filter_map(FrameFormat::n)
            .find(|f| f.guid().as_ref() == Some(guid))
    }
}

impl Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Subtype of a VideoStreaming class-specific descriptor.
///
/// Values this crate does not know about are preserved in `Other`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DescriptorSubtype {
    #[default]
    Undefined,
    InputHeader,
    OutputHeader,
    StillImageFrame,
    FormatUncompressed,
    FrameUncompressed,
    FormatMjpeg,
    FrameMjpeg,
    FormatMpeg2Ts,
    FormatDv,
    ColorFormat,
    FormatFrameBased,
    FrameFrameBased,
    FormatStreamBased,
    Other(u32),
}

impl From<u32> for DescriptorSubtype {
    fn from(subtype: u32) -> Self {
        match subtype {
            bindings::UVC_VS_UNDEFINED => DescriptorSubtype::Undefined,
            bindings::UVC_VS_INPUT_HEADER => DescriptorSubtype::InputHeader,
            bindings::UVC_VS_OUTPUT_HEADER => DescriptorSubtype::OutputHeader,
            bindings::UVC_VS_STILL_IMAGE_FRAME => DescriptorSubtype::StillImageFrame,
            bindings::UVC_VS_FORMAT_UNCOMPRESSED => DescriptorSubtype::FormatUncompressed,
            bindings::UVC_VS_FRAME_UNCOMPRESSED => DescriptorSubtype::FrameUncompressed,
            bindings::UVC_VS_FORMAT_MJPEG => DescriptorSubtype::FormatMjpeg,
            bindings::UVC_VS_FRAME_MJPEG => DescriptorSubtype::FrameMjpeg,
            bindings::UVC_VS_FORMAT_MPEG2TS => DescriptorSubtype::FormatMpeg2Ts,
            bindings::UVC_VS_FORMAT_DV => DescriptorSubtype::FormatDv,
            bindings::UVC_VS_COLORFORMAT => DescriptorSubtype::ColorFormat,
            bindings::UVC_VS_FORMAT_FRAME_BASED => DescriptorSubtype::FormatFrameBased,
            bindings::UVC_VS_FRAME_FRAME_BASED => DescriptorSubtype::FrameFrameBased,
            bindings::UVC_VS_FORMAT_STREAM_BASED => DescriptorSubtype::FormatStreamBased,
            other => DescriptorSubtype::Other(other),
        }
    }
}

impl From<DescriptorSubtype> for u32 {
    fn from(subtype: DescriptorSubtype) -> Self {
        match subtype {
            DescriptorSubtype::Undefined => bindings::UVC_VS_UNDEFINED,
            DescriptorSubtype::InputHeader => bindings::UVC_VS_INPUT_HEADER,
            DescriptorSubtype::OutputHeader => bindings::UVC_VS_OUTPUT_HEADER,
            DescriptorSubtype::StillImageFrame => bindings::UVC_VS_STILL_IMAGE_FRAME,
            DescriptorSubtype::FormatUncompressed => bindings::UVC_VS_FORMAT_UNCOMPRESSED,
            DescriptorSubtype::FrameUncompressed => bindings::UVC_VS_FRAME_UNCOMPRESSED,
            DescriptorSubtype::FormatMjpeg => bindings::UVC_VS_FORMAT_MJPEG,
            DescriptorSubtype::FrameMjpeg => bindings::UVC_VS_FRAME_MJPEG,
            DescriptorSubtype::FormatMpeg2Ts => bindings::UVC_VS_FORMAT_MPEG2TS,
            DescriptorSubtype::FormatDv => bindings::UVC_VS_FORMAT_DV,
            DescriptorSubtype::ColorFormat => bindings::UVC_VS_COLORFORMAT,
            DescriptorSubtype::FormatFrameBased => bindings::UVC_VS_FORMAT_FRAME_BASED,
            DescriptorSubtype::FrameFrameBased => bindings::UVC_VS_FRAME_FRAME_BASED,
            DescriptorSubtype::FormatStreamBased => bindings::UVC_VS_FORMAT_STREAM_BASED,
            DescriptorSubtype::Other(other) => other,
        }
    }
}

/// Prints the numeric value of the subtype, as found in the descriptor.
///
/// # Examples
///
/// ```
/// # use uvcr::DescriptorSubtype;
/// assert_eq!(DescriptorSubtype::FormatMjpeg.to_string(), "6");
/// assert_eq!(DescriptorSubtype::from(0x42).to_string(), "66");
/// ```
impl Display for DescriptorSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u32::from(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_matching() {
        let yuyv = FrameFormat::Yuyv.guid().unwrap();
        assert_eq!(&yuyv[..4], b"YUY2");
        assert_eq!(&yuyv[4..], &GUID_TAIL);

        assert!(FrameFormat::Yuyv.matches_guid(&yuyv));
        assert!(FrameFormat::Uncompressed.matches_guid(&yuyv));
        assert!(FrameFormat::Any.matches_guid(&yuyv));
        assert!(!FrameFormat::Compressed.matches_guid(&yuyv));
        assert!(!FrameFormat::Mjpeg.matches_guid(&yuyv));

        let mjpeg = FrameFormat::Mjpeg.guid().unwrap();
        assert_eq!(&mjpeg[..4], b"MJPG");
        assert!(mjpeg[4..].iter().all(|&b| b == 0));
        assert!(FrameFormat::Compressed.matches_guid(&mjpeg));
        assert!(FrameFormat::Any.matches_guid(&mjpeg));
        assert!(!FrameFormat::Uncompressed.matches_guid(&mjpeg));

        // No standard GUID.
        assert!(!FrameFormat::Rgb.matches_guid(&[0u8; 16]));
    }

    #[test]
    fn test_from_guid() {
        for format in [FrameFormat::Yuyv, FrameFormat::Nv12, FrameFormat::Mjpeg] {
            assert_eq!(FrameFormat::from_guid(&format.guid().unwrap()), Some(format));
        }
        assert_eq!(FrameFormat::from_guid(&[0xffu8; 16]), None);
    }

    #[test]
    fn test_frame_format_n() {
        assert_eq!(FrameFormat::n(7), Some(FrameFormat::Mjpeg));
        assert_eq!(FrameFormat::n(0), Some(FrameFormat::Any));
        assert_eq!(FrameFormat::n(200), None);
    }

    #[test]
    fn test_descriptor_subtype() {
        for raw in 0..0x20u32 {
            assert_eq!(u32::from(DescriptorSubtype::from(raw)), raw);
        }
        assert_eq!(
            DescriptorSubtype::from(bindings::UVC_VS_FORMAT_MJPEG),
            DescriptorSubtype::FormatMjpeg
        );
        assert_eq!(DescriptorSubtype::from(0x08), DescriptorSubtype::Other(0x08));
    }
}
