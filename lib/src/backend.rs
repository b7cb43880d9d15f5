//! The seam between [`crate::device::Device`] and the native UVC library.
//!
//! Backend methods are thin, 1:1 proxies of native calls: they take raw device and handle
//! references, and return the native status code untouched. Translation of these codes and all
//! state tracking happen in the `device` module.
//!
//! With the `libuvc` feature, [`LibUvc`] forwards every call to the system libuvc.

#[cfg(feature = "libuvc")]
mod libuvc;
#[cfg(feature = "libuvc")]
pub use libuvc::LibUvc;

use std::fmt;
use std::os::raw::c_int;
use std::ptr::NonNull;

use enumn::N;

use crate::bindings;

/// Raw reference to a native device, as handed over by the discovery code.
///
/// It may be null, in which case every operation that needs the device fails with
/// [`crate::Error::DeviceNotFound`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawDevice(*mut bindings::uvc_device);

/// The device reference is only ever passed back to the backend, which is `Sync`.
unsafe impl Send for RawDevice {}
unsafe impl Sync for RawDevice {}

impl RawDevice {
    pub const fn from_ptr(ptr: *mut bindings::uvc_device) -> Self {
        Self(ptr)
    }

    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub fn as_ptr(self) -> *mut bindings::uvc_device {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl fmt::Debug for RawDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawDevice({:p})", self.0)
    }
}

/// Raw handle of an opened native device.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawHandle(NonNull<bindings::uvc_device_handle>);

/// Handles are only dereferenced by the backend while the owning device's lock is held.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl RawHandle {
    pub const fn new(ptr: NonNull<bindings::uvc_device_handle>) -> Self {
        Self(ptr)
    }

    pub fn from_ptr(ptr: *mut bindings::uvc_device_handle) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut bindings::uvc_device_handle {
        self.0.as_ptr()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:p})", self.0)
    }
}

/// Request codes of UVC class-specific control transfers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, N)]
#[repr(u8)]
pub enum RequestCode {
    SetCur = bindings::UVC_SET_CUR,
    GetCur = bindings::UVC_GET_CUR,
    GetMin = bindings::UVC_GET_MIN,
    GetMax = bindings::UVC_GET_MAX,
    GetRes = bindings::UVC_GET_RES,
    GetLen = bindings::UVC_GET_LEN,
    GetInfo = bindings::UVC_GET_INFO,
    GetDef = bindings::UVC_GET_DEF,
}

/// Which of the two video streaming negotiation controls a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamControlSelector {
    Probe,
    Commit,
}

/// Native UVC library.
///
/// # Safety
///
/// Implementors guarantee that for a handle returned by [`Backend::open`]:
///
/// * the `uvc_device_handle` it points to, and the capability tree reachable from its `info`
///   member, stay allocated and unmodified until [`Backend::close`] is called on it,
/// * every `next`, `format_descs`, `frame_descs` and `intervals` pointer of that tree is either
///   null or points to a valid node, and every `intervals` array is zero-terminated,
/// * descriptors returned by [`Backend::device_descriptor`] stay valid until passed to
///   [`Backend::free_device_descriptor`], and their string members are null or nul-terminated.
pub unsafe trait Backend: Send + Sync {
    /// Opens `dev`. On failure, returns the native status.
    fn open(&self, dev: RawDevice) -> Result<RawHandle, c_int>;

    /// Closes `handle`, freeing everything it owns. Returns the teardown status.
    fn close(&self, handle: RawHandle) -> c_int;

    fn ref_device(&self, dev: RawDevice);

    fn unref_device(&self, dev: RawDevice);

    fn bus_number(&self, dev: RawDevice) -> u8;

    fn device_address(&self, dev: RawDevice) -> u8;

    fn device_descriptor(
        &self,
        dev: RawDevice,
    ) -> Result<NonNull<bindings::uvc_device_descriptor>, c_int>;

    fn free_device_descriptor(&self, desc: NonNull<bindings::uvc_device_descriptor>);

    /// Returns the capability tree owned by `handle`, or null if the handle has none.
    fn device_info(&self, handle: RawHandle) -> *const bindings::uvc_device_info {
        // SAFETY: the handle is valid as per the trait contract.
        unsafe { (*handle.as_ptr()).info }
    }

    /// Whether any stream is currently running on `handle`.
    fn has_active_streams(&self, handle: RawHandle) -> bool {
        // SAFETY: the handle is valid as per the trait contract.
        unsafe { !(*handle.as_ptr()).streams.is_null() }
    }

    fn set_ae_mode(&self, handle: RawHandle, mode: u8) -> c_int;

    fn set_ae_priority(&self, handle: RawHandle, priority: u8) -> c_int;

    fn set_exposure_rel(&self, handle: RawHandle, step: i8) -> c_int;

    fn set_brightness(&self, handle: RawHandle, brightness: i16) -> c_int;

    /// Claims VideoStreaming interface `interface` of `handle`, detaching the kernel driver bound
    /// to it if needed. Claiming an interface already claimed through `handle` succeeds.
    fn claim_interface(&self, handle: RawHandle, interface: u8) -> c_int;

    /// Called after each format descriptor has been copied out of the capability tree of
    /// `handle`, while the rest of the tree is still being walked.
    fn format_copied(&self, _handle: RawHandle, _format_index: u8) {}

    /// Runs `req` on the probe or commit control of the interface named by
    /// `ctrl.bInterfaceNumber`, reading into or writing from `ctrl`.
    fn query_stream_ctrl(
        &self,
        handle: RawHandle,
        ctrl: &mut bindings::uvc_stream_ctrl,
        selector: StreamControlSelector,
        req: RequestCode,
    ) -> c_int;
}
