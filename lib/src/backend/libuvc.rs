use std::os::raw::c_int;
use std::ptr::NonNull;

use log::trace;

use super::{Backend, RawDevice, RawHandle, RequestCode, StreamControlSelector};
use crate::bindings;

/// Backend forwarding to the system libuvc.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibUvc;

// SAFETY: libuvc owns the handle and its `info` tree until `uvc_close`, and builds its descriptor
// lists with null-terminated `next` pointers and zero-terminated interval arrays.
unsafe impl Backend for LibUvc {
    fn open(&self, dev: RawDevice) -> Result<RawHandle, c_int> {
        let mut devh = std::ptr::null_mut();
        let status = unsafe { bindings::uvc_open(dev.as_ptr(), &mut devh) };
        trace!("uvc_open({:?}) = {}", dev, status);
        match (status, RawHandle::from_ptr(devh)) {
            (bindings::UVC_SUCCESS, Some(handle)) => Ok(handle),
            (bindings::UVC_SUCCESS, None) => Err(bindings::UVC_ERROR_OTHER),
            (status, _) => Err(status),
        }
    }

    fn close(&self, handle: RawHandle) -> c_int {
        unsafe { bindings::uvc_close(handle.as_ptr()) };
        bindings::UVC_SUCCESS
    }

    fn ref_device(&self, dev: RawDevice) {
        unsafe { bindings::uvc_ref_device(dev.as_ptr()) }
    }

    fn unref_device(&self, dev: RawDevice) {
        unsafe { bindings::uvc_unref_device(dev.as_ptr()) }
    }

    fn bus_number(&self, dev: RawDevice) -> u8 {
        unsafe { bindings::uvc_get_bus_number(dev.as_ptr()) }
    }

    fn device_address(&self, dev: RawDevice) -> u8 {
        unsafe { bindings::uvc_get_device_address(dev.as_ptr()) }
    }

    fn device_descriptor(
        &self,
        dev: RawDevice,
    ) -> Result<NonNull<bindings::uvc_device_descriptor>, c_int> {
        let mut desc = std::ptr::null_mut();
        match unsafe { bindings::uvc_get_device_descriptor(dev.as_ptr(), &mut desc) } {
            bindings::UVC_SUCCESS => NonNull::new(desc).ok_or(bindings::UVC_ERROR_OTHER),
            status => Err(status),
        }
    }

    fn free_device_descriptor(&self, desc: NonNull<bindings::uvc_device_descriptor>) {
        unsafe { bindings::uvc_free_device_descriptor(desc.as_ptr()) }
    }

    fn set_ae_mode(&self, handle: RawHandle, mode: u8) -> c_int {
        unsafe { bindings::uvc_set_ae_mode(handle.as_ptr(), mode) }
    }

    fn set_ae_priority(&self, handle: RawHandle, priority: u8) -> c_int {
        unsafe { bindings::uvc_set_ae_priority(handle.as_ptr(), priority) }
    }

    fn set_exposure_rel(&self, handle: RawHandle, step: i8) -> c_int {
        unsafe { bindings::uvc_set_exposure_rel(handle.as_ptr(), step) }
    }

    fn set_brightness(&self, handle: RawHandle, brightness: i16) -> c_int {
        unsafe { bindings::uvc_set_brightness(handle.as_ptr(), brightness) }
    }

    fn claim_interface(&self, handle: RawHandle, interface: u8) -> c_int {
        unsafe { bindings::uvc_claim_if(handle.as_ptr(), c_int::from(interface)) }
    }

    fn query_stream_ctrl(
        &self,
        handle: RawHandle,
        ctrl: &mut bindings::uvc_stream_ctrl,
        selector: StreamControlSelector,
        req: RequestCode,
    ) -> c_int {
        let probe = match selector {
            StreamControlSelector::Probe => 1,
            StreamControlSelector::Commit => 0,
        };
        unsafe { bindings::uvc_query_stream_ctrl(handle.as_ptr(), ctrl, probe, req as c_int) }
    }
}
