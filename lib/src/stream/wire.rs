//! Byte layout of the video probe and commit controls.
//!
//! Both controls share the same little-endian layout: 26 bytes for UVC 1.0 devices, extended to
//! 34 bytes from UVC 1.1 on. `bInterfaceNumber` is not part of the payload: it selects which
//! interface the transfer is addressed to.

use std::io::{self, Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nix::errno::Errno;
use thiserror::Error;

use crate::bindings;

/// Payload length of the controls on UVC 1.0 devices.
pub const UVC_1_0_LEN: usize = 26;
/// Payload length of the controls on UVC 1.1 and later devices.
pub const UVC_1_1_LEN: usize = 34;

/// Returns the payload length used by a device implementing UVC version `bcd_uvc`.
pub fn control_len(bcd_uvc: u16) -> usize {
    if bcd_uvc >= 0x0110 {
        UVC_1_1_LEN
    } else {
        UVC_1_0_LEN
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    #[error("invalid probe/commit payload length {0}")]
    InvalidLength(usize),
    #[error("error while accessing probe/commit payload: {0}")]
    Io(io::ErrorKind),
}

impl From<io::Error> for WireError {
    fn from(err: io::Error) -> Self {
        WireError::Io(err.kind())
    }
}

impl From<WireError> for Errno {
    fn from(err: WireError) -> Self {
        match err {
            WireError::InvalidLength(_) => Errno::EINVAL,
            WireError::Io(_) => Errno::EIO,
        }
    }
}

/// Writes the fields of `ctrl` in payload order. The UVC 1.1 fields are only written if
/// `extended` is set.
fn write_fields<W: Write>(
    w: &mut W,
    ctrl: &bindings::uvc_stream_ctrl,
    extended: bool,
) -> io::Result<()> {
    w.write_u16::<LittleEndian>(ctrl.bmHint)?;
    w.write_u8(ctrl.bFormatIndex)?;
    w.write_u8(ctrl.bFrameIndex)?;
    w.write_u32::<LittleEndian>(ctrl.dwFrameInterval)?;
    w.write_u16::<LittleEndian>(ctrl.wKeyFrameRate)?;
    w.write_u16::<LittleEndian>(ctrl.wPFrameRate)?;
    w.write_u16::<LittleEndian>(ctrl.wCompQuality)?;
    w.write_u16::<LittleEndian>(ctrl.wCompWindowSize)?;
    w.write_u16::<LittleEndian>(ctrl.wDelay)?;
    w.write_u32::<LittleEndian>(ctrl.dwMaxVideoFrameSize)?;
    w.write_u32::<LittleEndian>(ctrl.dwMaxPayloadTransferSize)?;

    if extended {
        w.write_u32::<LittleEndian>(ctrl.dwClockFrequency)?;
        w.write_u8(ctrl.bmFramingInfo)?;
        w.write_u8(ctrl.bPreferredVersion)?;
        w.write_u8(ctrl.bMinVersion)?;
        w.write_u8(ctrl.bMaxVersion)?;
    }

    Ok(())
}

/// Serializes `ctrl` into the payload sent to a device implementing UVC version `bcd_uvc`.
pub fn pack(ctrl: &bindings::uvc_stream_ctrl, bcd_uvc: u16) -> Result<Vec<u8>, WireError> {
    let len = control_len(bcd_uvc);
    let mut buf = Vec::with_capacity(len);
    write_fields(&mut buf, ctrl, len == UVC_1_1_LEN)?;

    Ok(buf)
}

/// Reads a payload received from a device into `ctrl`.
///
/// A UVC 1.0 payload leaves the UVC 1.1 fields of `ctrl` untouched, and `bInterfaceNumber` is
/// always preserved. `ctrl` is only modified if the whole payload could be read.
pub fn unpack(buf: &[u8], ctrl: &mut bindings::uvc_stream_ctrl) -> Result<(), WireError> {
    if buf.len() != UVC_1_0_LEN && buf.len() != UVC_1_1_LEN {
        return Err(WireError::InvalidLength(buf.len()));
    }

    let mut r = Cursor::new(buf);
    let mut answer = bindings::uvc_stream_ctrl {
        bmHint: r.read_u16::<LittleEndian>()?,
        bFormatIndex: r.read_u8()?,
        bFrameIndex: r.read_u8()?,
        dwFrameInterval: r.read_u32::<LittleEndian>()?,
        wKeyFrameRate: r.read_u16::<LittleEndian>()?,
        wPFrameRate: r.read_u16::<LittleEndian>()?,
        wCompQuality: r.read_u16::<LittleEndian>()?,
        wCompWindowSize: r.read_u16::<LittleEndian>()?,
        wDelay: r.read_u16::<LittleEndian>()?,
        dwMaxVideoFrameSize: r.read_u32::<LittleEndian>()?,
        dwMaxPayloadTransferSize: r.read_u32::<LittleEndian>()?,
        ..*ctrl
    };

    if buf.len() == UVC_1_1_LEN {
        answer.dwClockFrequency = r.read_u32::<LittleEndian>()?;
        answer.bmFramingInfo = r.read_u8()?;
        answer.bPreferredVersion = r.read_u8()?;
        answer.bMinVersion = r.read_u8()?;
        answer.bMaxVersion = r.read_u8()?;
    }

    *ctrl = answer;
    Ok(())
}
