//! Camera controls: auto-exposure, relative exposure and brightness.
//!
//! Each control is a unit type implementing [`Control`], which defines the type of its value and
//! the native setter to call. [`Device::set_control`] applies any of them on an open device:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use uvcr::backend::{Backend, RawDevice};
//! # use uvcr::controls::{AeMode, Brightness};
//! # use uvcr::device::Device;
//! # fn apply<B: Backend>(backend: Arc<B>, dev: RawDevice) -> uvcr::Result<()> {
//! let device = Device::new(backend, dev, Default::default());
//! device.open()?;
//! device.set_control::<Brightness>(64)?;
//! device.set_ae_mode(AeMode::Manual)?;
//! # Ok(())
//! # }
//! ```
//!
//! Setting a control on a closed device fails with [`crate::Error::DeviceClosed`] without reaching
//! the native library.

use std::fmt::Debug;
use std::os::raw::c_int;

use enumn::N;

use crate::backend::{Backend, RawHandle};
use crate::device::Device;
use crate::error::Result;

/// Auto-exposure mode (`CT_AE_MODE_CONTROL`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, N)]
#[repr(u8)]
pub enum AeMode {
    Manual = 1 << 0,
    Auto = 1 << 1,
    ShutterPriority = 1 << 2,
    AperturePriority = 1 << 3,
}

/// Whether the device may vary the frame rate when adjusting exposure
/// (`CT_AE_PRIORITY_CONTROL`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, N)]
#[repr(u8)]
pub enum AePriority {
    ConstantFrameRate = 0,
    VariableFrameRate = 1,
}

/// Trait implemented by types representing a given control in order to define its value type and
/// how to apply it.
pub trait Control {
    /// Name used in logs.
    const NAME: &'static str;
    /// Type of the value of this control.
    type Value: Copy + Debug;

    /// Calls the native setter for this control and returns its status.
    fn apply<B: Backend + ?Sized>(backend: &B, handle: RawHandle, value: Self::Value) -> c_int;
}

pub struct AeModeControl;
impl Control for AeModeControl {
    const NAME: &'static str = "ae_mode";
    type Value = AeMode;

    fn apply<B: Backend + ?Sized>(backend: &B, handle: RawHandle, value: AeMode) -> c_int {
        backend.set_ae_mode(handle, value as u8)
    }
}

pub struct AePriorityControl;
impl Control for AePriorityControl {
    const NAME: &'static str = "ae_priority";
    type Value = AePriority;

    fn apply<B: Backend + ?Sized>(backend: &B, handle: RawHandle, value: AePriority) -> c_int {
        backend.set_ae_priority(handle, value as u8)
    }
}

/// Relative exposure time change: 0 keeps it, 1 increments it and -1 (0xff) decrements it.
pub struct ExposureRelative;
impl Control for ExposureRelative {
    const NAME: &'static str = "exposure_rel";
    type Value = i8;

    fn apply<B: Backend + ?Sized>(backend: &B, handle: RawHandle, value: i8) -> c_int {
        backend.set_exposure_rel(handle, value)
    }
}

pub struct Brightness;
impl Control for Brightness {
    const NAME: &'static str = "brightness";
    type Value = i16;

    fn apply<B: Backend + ?Sized>(backend: &B, handle: RawHandle, value: i16) -> c_int {
        backend.set_brightness(handle, value)
    }
}

impl<B: Backend + ?Sized> Device<B> {
    /// Sets control `C` to `value`.
    pub fn set_control<C: Control>(&self, value: C::Value) -> Result<()> {
        self.control(C::NAME, |backend, handle| {
            log::trace!("Setting {} to {:?}", C::NAME, value);
            C::apply(backend, handle, value)
        })
    }

    pub fn set_ae_mode(&self, mode: AeMode) -> Result<()> {
        self.set_control::<AeModeControl>(mode)
    }

    pub fn set_ae_priority(&self, priority: AePriority) -> Result<()> {
        self.set_control::<AePriorityControl>(priority)
    }

    pub fn set_exposure_relative(&self, step: i8) -> Result<()> {
        self.set_control::<ExposureRelative>(step)
    }

    pub fn set_brightness(&self, brightness: i16) -> Result<()> {
        self.set_control::<Brightness>(brightness)
    }
}
