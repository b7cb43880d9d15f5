//! Negotiation of streaming parameters.
//!
//! [`Device::get_stream`] picks a streaming interface, format, frame and frame interval matching
//! the request, then runs the UVC probe/commit exchange with the device. The result is a
//! [`StreamControl`], which is bound to the device handle it was negotiated on: once that handle is
//! closed the control is stale and [`Device::start_stream`] refuses it.

pub mod wire;

use std::fmt;

use bitflags::bitflags;
use log::{debug, warn};
use nix::errno::Errno;
use thiserror::Error;

use crate::backend::{Backend, RawHandle, RequestCode, StreamControlSelector};
use crate::bindings;
use crate::descriptors::{self, StreamInterface, INTERVALS_PER_SECOND};
use crate::device::{Device, OpenHandle};
use crate::error::{Error, ErrorKind};
use crate::FrameFormat;

bitflags! {
    /// `bmHint`: which negotiated parameters the device must keep fixed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StreamHint: u16 {
        const FRAME_INTERVAL = 1 << 0;
        const KEY_FRAME_RATE = 1 << 1;
        const P_FRAME_RATE = 1 << 2;
        const COMP_QUALITY = 1 << 3;
        const COMP_WINDOW_SIZE = 1 << 4;
    }
}

bitflags! {
    /// `bmFramingInfo` of UVC 1.1+ devices.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FramingInfo: u8 {
        const FRAME_ID_REQUIRED = 1 << 0;
        const END_OF_FRAME = 1 << 1;
    }
}

/// A streaming interface, format, frame and interval supported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMode {
    pub interface_number: u8,
    pub format_index: u8,
    pub frame_index: u8,
    /// Frame interval in 100ns units.
    pub frame_interval: u32,
}

/// Looks for the first mode of `interfaces` providing `format` frames of exactly `width`x`height`
/// at `fps` frames per second. An `fps` of 0 accepts the first supported rate.
pub fn select_mode(
    interfaces: &[StreamInterface],
    format: FrameFormat,
    width: u16,
    height: u16,
    fps: u32,
) -> Option<StreamMode> {
    for itf in interfaces {
        for fmt in itf
            .format_descriptors()
            .iter()
            .filter(|fmt| format.matches_guid(&fmt.guid))
        {
            for frame in fmt
                .frame_descriptors()
                .iter()
                .filter(|frame| frame.width == width && frame.height == height)
            {
                if let Some(frame_interval) = frame.interval_for_fps(fps) {
                    return Some(StreamMode {
                        interface_number: itf.interface_number,
                        format_index: fmt.format_index,
                        frame_index: frame.frame_index,
                        frame_interval,
                    });
                }
            }
        }
    }

    None
}

/// Streaming parameters negotiated with a device.
///
/// Only valid on the device and handle it has been negotiated on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamControl {
    ctrl: bindings::uvc_stream_ctrl,
    bcd_uvc: u16,
    device_id: u64,
    generation: u64,
}

impl StreamControl {
    pub fn hint(&self) -> StreamHint {
        StreamHint::from_bits_retain(self.ctrl.bmHint)
    }

    pub fn format_index(&self) -> u8 {
        self.ctrl.bFormatIndex
    }

    pub fn frame_index(&self) -> u8 {
        self.ctrl.bFrameIndex
    }

    /// Frame interval in 100ns units.
    pub fn frame_interval(&self) -> u32 {
        self.ctrl.dwFrameInterval
    }

    /// Frames per second corresponding to the negotiated interval, rounded down.
    pub fn fps(&self) -> u32 {
        match self.ctrl.dwFrameInterval {
            0 => 0,
            interval => INTERVALS_PER_SECOND / interval,
        }
    }

    pub fn key_frame_rate(&self) -> u16 {
        self.ctrl.wKeyFrameRate
    }

    pub fn p_frame_rate(&self) -> u16 {
        self.ctrl.wPFrameRate
    }

    pub fn comp_quality(&self) -> u16 {
        self.ctrl.wCompQuality
    }

    pub fn comp_window_size(&self) -> u16 {
        self.ctrl.wCompWindowSize
    }

    /// Internal latency of the device, in ms.
    pub fn delay(&self) -> u16 {
        self.ctrl.wDelay
    }

    pub fn max_video_frame_size(&self) -> u32 {
        self.ctrl.dwMaxVideoFrameSize
    }

    pub fn max_payload_transfer_size(&self) -> u32 {
        self.ctrl.dwMaxPayloadTransferSize
    }

    pub fn clock_frequency(&self) -> u32 {
        self.ctrl.dwClockFrequency
    }

    pub fn framing_info(&self) -> FramingInfo {
        FramingInfo::from_bits_retain(self.ctrl.bmFramingInfo)
    }

    pub fn preferred_version(&self) -> u8 {
        self.ctrl.bPreferredVersion
    }

    pub fn min_version(&self) -> u8 {
        self.ctrl.bMinVersion
    }

    pub fn max_version(&self) -> u8 {
        self.ctrl.bMaxVersion
    }

    pub fn interface_number(&self) -> u8 {
        self.ctrl.bInterfaceNumber
    }

    /// Generation of the device handle this control was negotiated on.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn as_raw(&self) -> &bindings::uvc_stream_ctrl {
        &self.ctrl
    }

    /// The commit payload, as sent to the device.
    pub fn to_bytes(&self) -> Result<Vec<u8>, wire::WireError> {
        wire::pack(&self.ctrl, self.bcd_uvc)
    }
}

impl fmt::Display for StreamControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.ctrl;
        writeln!(f, "Hint: {}", c.bmHint)?;
        writeln!(f, "FormatIndex: {}", c.bFormatIndex)?;
        writeln!(f, "FrameIndex: {}", c.bFrameIndex)?;
        writeln!(f, "FrameInterval: {}", c.dwFrameInterval)?;
        writeln!(f, "KeyFrameRate: {}", c.wKeyFrameRate)?;
        writeln!(f, "PFrameRate: {}", c.wPFrameRate)?;
        writeln!(f, "CompQuality: {}", c.wCompQuality)?;
        writeln!(f, "CompWindowSize: {}", c.wCompWindowSize)?;
        writeln!(f, "Delay: {}", c.wDelay)?;
        writeln!(f, "MaxVideoFrameSize: {}", c.dwMaxVideoFrameSize)?;
        writeln!(f, "MaxPayloadTransferSize: {}", c.dwMaxPayloadTransferSize)?;
        writeln!(f, "ClockFrequency: {}", c.dwClockFrequency)?;
        writeln!(f, "FramingInfo: {}", c.bmFramingInfo)?;
        writeln!(f, "PreferredVersion: {}", c.bPreferredVersion)?;
        writeln!(f, "MinVersion: {}", c.bMinVersion)?;
        writeln!(f, "MaxVersion: {}", c.bMaxVersion)?;
        writeln!(f, "InterfaceNumber: {}", c.bInterfaceNumber)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GetStreamError {
    #[error("device closed")]
    DeviceClosed,
    #[error("no {format} mode at {width}x{height} and {fps} fps")]
    NoSuchMode {
        format: FrameFormat,
        width: u16,
        height: u16,
        fps: u32,
    },
    #[error("probe failed: {0}")]
    Probe(ErrorKind),
    #[error("commit failed: {0}")]
    Commit(ErrorKind),
}

impl GetStreamError {
    /// Translated kind of the error, `None` if the device was closed.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            GetStreamError::DeviceClosed => None,
            GetStreamError::NoSuchMode { .. } => Some(ErrorKind::NotSupported),
            GetStreamError::Probe(kind) | GetStreamError::Commit(kind) => Some(*kind),
        }
    }
}

impl From<GetStreamError> for Error {
    fn from(err: GetStreamError) -> Self {
        match err.kind() {
            None => Error::DeviceClosed,
            Some(kind) => Error::Native(kind),
        }
    }
}

impl From<GetStreamError> for Errno {
    fn from(err: GetStreamError) -> Self {
        Error::from(err).into()
    }
}

#[derive(Debug, Error)]
pub enum StartStreamError {
    #[error("device closed")]
    DeviceClosed,
    #[error("stream control negotiated on a handle that has since been closed")]
    StaleControl,
    #[error("stream control negotiated on another device")]
    ForeignControl,
    #[error("error while starting stream: {0}")]
    Callback(#[from] anyhow::Error),
}

impl From<StartStreamError> for Errno {
    fn from(err: StartStreamError) -> Self {
        match err {
            StartStreamError::DeviceClosed => Errno::EBADF,
            StartStreamError::StaleControl => Errno::ESTALE,
            StartStreamError::ForeignControl => Errno::EINVAL,
            StartStreamError::Callback(_) => Errno::EIO,
        }
    }
}

/// Claims the streaming interface the probe and commit requests are addressed to.
fn claim<B: Backend + ?Sized>(handle: &OpenHandle<'_, B>, interface: u8) -> Result<(), ErrorKind> {
    let status = handle.backend().claim_interface(handle.raw(), interface);
    log::trace!(
        "Claim of interface {} on {:?}: status {}",
        interface,
        handle.raw(),
        status
    );

    ErrorKind::check(status)
}

/// Runs one probe or commit request, translating its status.
fn query<B: Backend + ?Sized>(
    handle: &OpenHandle<'_, B>,
    ctrl: &mut bindings::uvc_stream_ctrl,
    selector: StreamControlSelector,
    req: RequestCode,
) -> Result<(), ErrorKind> {
    let status = handle
        .backend()
        .query_stream_ctrl(handle.raw(), ctrl, selector, req);
    log::trace!(
        "{:?} {:?} on {:?}: status {}",
        req,
        selector,
        handle.raw(),
        status
    );

    ErrorKind::check(status)
}

impl<B: Backend + ?Sized> Device<B> {
    /// Negotiates a stream of `format` frames of `width`x`height` at `fps` frames per second.
    ///
    /// An `fps` of 0 lets the device use its first or default frame rate for that size.
    pub fn get_stream(
        &self,
        format: FrameFormat,
        width: u16,
        height: u16,
        fps: u32,
    ) -> Result<StreamControl, GetStreamError> {
        let no_such_mode = GetStreamError::NoSuchMode {
            format,
            width,
            height,
            fps,
        };

        // Held until the commit, so the handle cannot be closed during the negotiation.
        let handle = self.open_handle().ok_or(GetStreamError::DeviceClosed)?;
        let bcd_uvc = handle.info().ok_or(no_such_mode)?.ctrl_if.bcdUVC;
        let interfaces = descriptors::stream_interfaces_from(&handle);

        let mode = select_mode(&interfaces, format, width, height, fps).ok_or_else(|| {
            debug!("No mode found for {}", no_such_mode);
            no_such_mode
        })?;
        debug!("Selected {:?} for {} {}x{}@{}", mode, format, width, height, fps);

        let mut ctrl = bindings::uvc_stream_ctrl {
            bInterfaceNumber: mode.interface_number,
            ..Default::default()
        };

        claim(&handle, mode.interface_number).map_err(GetStreamError::Probe)?;

        if self.config().queries_max() {
            query(
                &handle,
                &mut ctrl,
                StreamControlSelector::Probe,
                RequestCode::GetMax,
            )
            .map_err(GetStreamError::Probe)?;
        }

        ctrl.bmHint = StreamHint::FRAME_INTERVAL.bits();
        ctrl.bFormatIndex = mode.format_index;
        ctrl.bFrameIndex = mode.frame_index;
        ctrl.dwFrameInterval = mode.frame_interval;
        ctrl.bInterfaceNumber = mode.interface_number;

        query(
            &handle,
            &mut ctrl,
            StreamControlSelector::Probe,
            RequestCode::SetCur,
        )
        .map_err(GetStreamError::Probe)?;
        query(
            &handle,
            &mut ctrl,
            StreamControlSelector::Probe,
            RequestCode::GetCur,
        )
        .map_err(GetStreamError::Probe)?;
        ctrl.bInterfaceNumber = mode.interface_number;

        if ctrl.bFormatIndex != mode.format_index || ctrl.bFrameIndex != mode.frame_index {
            debug!(
                "Device answered format {} frame {} to probe of format {} frame {}",
                ctrl.bFormatIndex, ctrl.bFrameIndex, mode.format_index, mode.frame_index
            );
            return Err(no_such_mode);
        }

        if ctrl.dwFrameInterval != mode.frame_interval {
            if self.config().is_strict_frame_interval() {
                debug!(
                    "Device changed frame interval from {} to {}",
                    mode.frame_interval, ctrl.dwFrameInterval
                );
                return Err(no_such_mode);
            }
            warn!(
                "Device clamped frame interval from {} to {}",
                mode.frame_interval, ctrl.dwFrameInterval
            );
        }

        query(
            &handle,
            &mut ctrl,
            StreamControlSelector::Commit,
            RequestCode::SetCur,
        )
        .map_err(GetStreamError::Commit)?;

        let control = StreamControl {
            ctrl,
            bcd_uvc,
            device_id: self.id(),
            generation: handle.generation(),
        };
        debug!(
            "Negotiated stream on interface {} (generation {}): format {} frame {} interval {}",
            control.interface_number(),
            control.generation,
            control.format_index(),
            control.frame_index(),
            control.frame_interval()
        );

        Ok(control)
    }

    /// Whether `control` can still be used to start a stream on this device.
    pub fn is_stream_valid(&self, control: &StreamControl) -> bool {
        control.device_id == self.id()
            && self
                .open_handle()
                .map(|handle| handle.generation() == control.generation)
                .unwrap_or(false)
    }

    /// Hands the open handle and the negotiated parameters of `control` over to `start`, which
    /// is expected to start the actual transfers.
    ///
    /// The device stays locked, and cannot be closed, while `start` runs. `start` must not call
    /// back into this `Device`: a `close()` waiting on another thread would block that call, and
    /// `start` with it, forever. Everything it needs is available from the [`StreamContext`].
    pub fn start_stream<T, F>(
        &self,
        control: &StreamControl,
        start: F,
    ) -> Result<T, StartStreamError>
    where
        F: FnOnce(&StreamContext<'_, B>) -> anyhow::Result<T>,
    {
        if control.device_id != self.id() {
            return Err(StartStreamError::ForeignControl);
        }

        let handle = self.open_handle().ok_or(StartStreamError::DeviceClosed)?;
        if handle.generation() != control.generation {
            debug!(
                "Refusing control of generation {}, handle is at generation {}",
                control.generation,
                handle.generation()
            );
            return Err(StartStreamError::StaleControl);
        }

        debug!("Starting stream on {:?}", handle.raw());
        let context = StreamContext { handle, control };
        Ok(start(&context)?)
    }
}

/// An open device and the stream control to start, as seen from [`Device::start_stream`].
///
/// The device lock is held for as long as the context exists, so the handle remains open and the
/// control remains valid.
pub struct StreamContext<'a, B: Backend + ?Sized> {
    handle: OpenHandle<'a, B>,
    control: &'a StreamControl,
}

impl<'a, B: Backend + ?Sized> StreamContext<'a, B> {
    pub fn raw_handle(&self) -> RawHandle {
        self.handle.raw()
    }

    pub fn backend(&self) -> &'a B {
        self.handle.backend()
    }

    pub fn control(&self) -> &StreamControl {
        self.control
    }

    /// The negotiated parameters, as expected by the native streaming functions.
    pub fn ctrl(&self) -> &bindings::uvc_stream_ctrl {
        &self.control.ctrl
    }

    pub fn generation(&self) -> u64 {
        self.handle.generation()
    }

    /// Whether a stream is already running on the handle.
    pub fn has_active_streams(&self) -> bool {
        self.backend().has_active_streams(self.handle.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{FormatDescriptor, FrameDescriptor};
    use crate::DescriptorSubtype;

    fn frame(index: u8, width: u16, height: u16, intervals: &[u32]) -> FrameDescriptor {
        FrameDescriptor {
            subtype: DescriptorSubtype::FrameUncompressed,
            frame_index: index,
            width,
            height,
            frame_interval_type: intervals.len() as u8,
            intervals: intervals.to_vec(),
            ..Default::default()
        }
    }

    fn interfaces() -> Vec<StreamInterface> {
        vec![StreamInterface {
            interface_number: 1,
            formats: vec![
                FormatDescriptor {
                    subtype: DescriptorSubtype::FormatUncompressed,
                    format_index: 1,
                    guid: FrameFormat::Yuyv.guid().unwrap(),
                    frames: vec![
                        frame(1, 640, 480, &[333_333, 666_666]),
                        frame(2, 320, 240, &[333_333]),
                    ],
                    ..Default::default()
                },
                FormatDescriptor {
                    subtype: DescriptorSubtype::FormatMjpeg,
                    format_index: 2,
                    guid: FrameFormat::Mjpeg.guid().unwrap(),
                    frames: vec![frame(1, 1280, 720, &[333_333, 166_666])],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }]
    }

    #[test]
    fn test_select_mode() {
        let itfs = interfaces();

        assert_eq!(
            select_mode(&itfs, FrameFormat::Yuyv, 640, 480, 15),
            Some(StreamMode {
                interface_number: 1,
                format_index: 1,
                frame_index: 1,
                frame_interval: 666_666,
            })
        );
        assert_eq!(
            select_mode(&itfs, FrameFormat::Mjpeg, 1280, 720, 60).map(|m| m.frame_interval),
            Some(166_666)
        );
        // Abstract formats.
        assert_eq!(
            select_mode(&itfs, FrameFormat::Compressed, 1280, 720, 0).map(|m| m.format_index),
            Some(2)
        );
        assert_eq!(
            select_mode(&itfs, FrameFormat::Any, 320, 240, 30).map(|m| m.frame_index),
            Some(2)
        );
        // Missing size, rate or format.
        assert_eq!(select_mode(&itfs, FrameFormat::Mjpeg, 1920, 1080, 30), None);
        assert_eq!(select_mode(&itfs, FrameFormat::Yuyv, 640, 480, 60), None);
        assert_eq!(select_mode(&itfs, FrameFormat::Mjpeg, 640, 480, 30), None);
        assert_eq!(select_mode(&[], FrameFormat::Any, 640, 480, 30), None);
    }

    #[test]
    fn test_get_stream_error_kind() {
        let no_mode = GetStreamError::NoSuchMode {
            format: FrameFormat::Mjpeg,
            width: 1920,
            height: 1080,
            fps: 30,
        };
        assert_eq!(no_mode.kind(), Some(ErrorKind::NotSupported));
        assert_eq!(Error::from(no_mode), Error::Native(ErrorKind::NotSupported));
        assert_eq!(no_mode.to_string(), "no Mjpeg mode at 1920x1080 and 30 fps");

        assert_eq!(GetStreamError::DeviceClosed.kind(), None);
        assert_eq!(Error::from(GetStreamError::DeviceClosed), Error::DeviceClosed);
        assert_eq!(
            Errno::from(GetStreamError::Commit(ErrorKind::Pipe)),
            Errno::EPIPE
        );
    }

    #[test]
    fn test_stream_control_accessors() {
        let control = StreamControl {
            ctrl: bindings::uvc_stream_ctrl {
                bmHint: 1,
                bFormatIndex: 2,
                bFrameIndex: 1,
                dwFrameInterval: 333_333,
                bmFramingInfo: 3,
                bInterfaceNumber: 1,
                ..Default::default()
            },
            bcd_uvc: 0x0110,
            device_id: 0,
            generation: 1,
        };

        assert_eq!(control.hint(), StreamHint::FRAME_INTERVAL);
        assert_eq!(control.fps(), 30);
        assert_eq!(
            control.framing_info(),
            FramingInfo::FRAME_ID_REQUIRED | FramingInfo::END_OF_FRAME
        );
        assert_eq!(control.to_bytes().unwrap().len(), wire::UVC_1_1_LEN);

        let dump = control.to_string();
        assert!(dump.starts_with("Hint: 1\nFormatIndex: 2\nFrameIndex: 1\n"));
        assert!(dump.ends_with("InterfaceNumber: 1\n"));
        assert_eq!(dump.lines().count(), 17);
    }
}
