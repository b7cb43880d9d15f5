#![allow(dead_code)]
#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::all)]

//! `#[repr(C)]` mirrors of the libuvc structures and constants used by this crate.
//!
//! The capability tree hangs off `uvc_device_handle::info`, which libuvc only declares in its
//! internal header, so these layouts are maintained by hand rather than generated. Only the leading
//! fields of `uvc_device_handle` and `uvc_device_info` that we read are guaranteed to match.

use std::os::raw::c_char;
use std::os::raw::c_int;
use std::os::raw::c_void;

pub const UVC_SUCCESS: c_int = 0;
pub const UVC_ERROR_IO: c_int = -1;
pub const UVC_ERROR_INVALID_PARAM: c_int = -2;
pub const UVC_ERROR_ACCESS: c_int = -3;
pub const UVC_ERROR_NO_DEVICE: c_int = -4;
pub const UVC_ERROR_NOT_FOUND: c_int = -5;
pub const UVC_ERROR_BUSY: c_int = -6;
pub const UVC_ERROR_TIMEOUT: c_int = -7;
pub const UVC_ERROR_OVERFLOW: c_int = -8;
pub const UVC_ERROR_PIPE: c_int = -9;
pub const UVC_ERROR_INTERRUPTED: c_int = -10;
pub const UVC_ERROR_NO_MEM: c_int = -11;
pub const UVC_ERROR_NOT_SUPPORTED: c_int = -12;
pub const UVC_ERROR_INVALID_DEVICE: c_int = -50;
pub const UVC_ERROR_INVALID_MODE: c_int = -51;
pub const UVC_ERROR_CALLBACK_EXISTS: c_int = -52;
pub const UVC_ERROR_OTHER: c_int = -99;

pub type uvc_error_t = c_int;

pub const UVC_VS_UNDEFINED: u32 = 0x00;
pub const UVC_VS_INPUT_HEADER: u32 = 0x01;
pub const UVC_VS_OUTPUT_HEADER: u32 = 0x02;
pub const UVC_VS_STILL_IMAGE_FRAME: u32 = 0x03;
pub const UVC_VS_FORMAT_UNCOMPRESSED: u32 = 0x04;
pub const UVC_VS_FRAME_UNCOMPRESSED: u32 = 0x05;
pub const UVC_VS_FORMAT_MJPEG: u32 = 0x06;
pub const UVC_VS_FRAME_MJPEG: u32 = 0x07;
pub const UVC_VS_FORMAT_MPEG2TS: u32 = 0x0a;
pub const UVC_VS_FORMAT_DV: u32 = 0x0c;
pub const UVC_VS_COLORFORMAT: u32 = 0x0d;
pub const UVC_VS_FORMAT_FRAME_BASED: u32 = 0x10;
pub const UVC_VS_FRAME_FRAME_BASED: u32 = 0x11;
pub const UVC_VS_FORMAT_STREAM_BASED: u32 = 0x12;

pub type uvc_vs_desc_subtype = u32;

pub const UVC_FRAME_FORMAT_ANY: u32 = 0;
pub const UVC_FRAME_FORMAT_UNCOMPRESSED: u32 = 1;
pub const UVC_FRAME_FORMAT_COMPRESSED: u32 = 2;
pub const UVC_FRAME_FORMAT_YUYV: u32 = 3;
pub const UVC_FRAME_FORMAT_UYVY: u32 = 4;
pub const UVC_FRAME_FORMAT_RGB: u32 = 5;
pub const UVC_FRAME_FORMAT_BGR: u32 = 6;
pub const UVC_FRAME_FORMAT_MJPEG: u32 = 7;
pub const UVC_FRAME_FORMAT_H264: u32 = 8;
pub const UVC_FRAME_FORMAT_GRAY8: u32 = 9;
pub const UVC_FRAME_FORMAT_GRAY16: u32 = 10;
pub const UVC_FRAME_FORMAT_BY8: u32 = 11;
pub const UVC_FRAME_FORMAT_BA81: u32 = 12;
pub const UVC_FRAME_FORMAT_SGRBG8: u32 = 13;
pub const UVC_FRAME_FORMAT_SGBRG8: u32 = 14;
pub const UVC_FRAME_FORMAT_SRGGB8: u32 = 15;
pub const UVC_FRAME_FORMAT_SBGGR8: u32 = 16;
pub const UVC_FRAME_FORMAT_NV12: u32 = 17;

pub type uvc_frame_format = u32;

pub const UVC_RC_UNDEFINED: u8 = 0x00;
pub const UVC_SET_CUR: u8 = 0x01;
pub const UVC_GET_CUR: u8 = 0x81;
pub const UVC_GET_MIN: u8 = 0x82;
pub const UVC_GET_MAX: u8 = 0x83;
pub const UVC_GET_RES: u8 = 0x84;
pub const UVC_GET_LEN: u8 = 0x85;
pub const UVC_GET_INFO: u8 = 0x86;
pub const UVC_GET_DEF: u8 = 0x87;

pub type uvc_req_code = c_int;

/// Opaque `struct uvc_device`.
#[repr(C)]
pub struct uvc_device {
    _private: [u8; 0],
}

/// Opaque `struct uvc_stream_handle`.
#[repr(C)]
pub struct uvc_stream_handle {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Debug)]
pub struct uvc_device_descriptor {
    pub idVendor: u16,
    pub idProduct: u16,
    pub bcdUVC: u16,
    pub serialNumber: *const c_char,
    pub manufacturer: *const c_char,
    pub product: *const c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct uvc_control_interface {
    pub parent: *mut uvc_device_info,
    pub input_term_descs: *mut c_void,
    pub selector_unit_descs: *mut c_void,
    pub processing_unit_descs: *mut c_void,
    pub extension_unit_descs: *mut c_void,
    pub bcdUVC: u16,
    pub dwClockFrequency: u32,
    pub bEndpointAddress: u8,
    pub bInterfaceNumber: u8,
}

#[repr(C)]
#[derive(Debug)]
pub struct uvc_streaming_interface {
    pub parent: *mut uvc_device_info,
    pub prev: *mut uvc_streaming_interface,
    pub next: *mut uvc_streaming_interface,
    pub bInterfaceNumber: u8,
    pub format_descs: *mut uvc_format_desc,
    pub bEndpointAddress: u8,
    pub bTerminalLink: u8,
    pub bStillCaptureMethod: u8,
}

/// `guidFormat` / `fourccFormat` union of `struct uvc_format_desc`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union uvc_format_desc__bindgen_ty_1 {
    pub guidFormat: [u8; 16],
    pub fourccFormat: [u8; 4],
}

/// `bBitsPerPixel` / `bmFlags` union of `struct uvc_format_desc`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union uvc_format_desc__bindgen_ty_2 {
    pub bBitsPerPixel: u8,
    pub bmFlags: u8,
}

#[repr(C)]
pub struct uvc_format_desc {
    pub parent: *mut uvc_streaming_interface,
    pub prev: *mut uvc_format_desc,
    pub next: *mut uvc_format_desc,
    pub bDescriptorSubtype: uvc_vs_desc_subtype,
    pub bFormatIndex: u8,
    pub bNumFrameDescriptors: u8,
    pub __bindgen_anon_1: uvc_format_desc__bindgen_ty_1,
    pub __bindgen_anon_2: uvc_format_desc__bindgen_ty_2,
    pub bDefaultFrameIndex: u8,
    pub bAspectRatioX: u8,
    pub bAspectRatioY: u8,
    pub bmInterlaceFlags: u8,
    pub bCopyProtect: u8,
    pub bVariableSize: u8,
    pub frame_descs: *mut uvc_frame_desc,
    pub still_frame_desc: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct uvc_frame_desc {
    pub parent: *mut uvc_format_desc,
    pub prev: *mut uvc_frame_desc,
    pub next: *mut uvc_frame_desc,
    pub bDescriptorSubtype: uvc_vs_desc_subtype,
    pub bFrameIndex: u8,
    pub bmCapabilities: u8,
    pub wWidth: u16,
    pub wHeight: u16,
    pub dwMinBitRate: u32,
    pub dwMaxBitRate: u32,
    pub dwMaxVideoFrameBufferSize: u32,
    pub dwDefaultFrameInterval: u32,
    pub dwMinFrameInterval: u32,
    pub dwMaxFrameInterval: u32,
    pub dwFrameIntervalStep: u32,
    pub bFrameIntervalType: u8,
    pub dwBytesPerLine: u32,
    /// Zero-terminated list of discrete intervals, null in continuous mode.
    pub intervals: *mut u32,
}

#[repr(C)]
#[derive(Debug)]
pub struct uvc_device_info {
    pub config: *mut c_void,
    pub ctrl_if: uvc_control_interface,
    pub stream_ifs: *mut uvc_streaming_interface,
}

/// Leading fields of libuvc's internal `struct uvc_device_handle`.
#[repr(C)]
#[derive(Debug)]
pub struct uvc_device_handle {
    pub dev: *mut uvc_device,
    pub prev: *mut uvc_device_handle,
    pub next: *mut uvc_device_handle,
    pub usb_devh: *mut c_void,
    pub info: *mut uvc_device_info,
    pub status_xfer: *mut c_void,
    pub status_buf: [u8; 32],
    pub status_cb: *mut c_void,
    pub status_user_ptr: *mut c_void,
    pub button_cb: *mut c_void,
    pub button_user_ptr: *mut c_void,
    pub streams: *mut uvc_stream_handle,
    pub is_isight: u8,
    pub claimed: u32,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct uvc_stream_ctrl {
    pub bmHint: u16,
    pub bFormatIndex: u8,
    pub bFrameIndex: u8,
    pub dwFrameInterval: u32,
    pub wKeyFrameRate: u16,
    pub wPFrameRate: u16,
    pub wCompQuality: u16,
    pub wCompWindowSize: u16,
    pub wDelay: u16,
    pub dwMaxVideoFrameSize: u32,
    pub dwMaxPayloadTransferSize: u32,
    pub dwClockFrequency: u32,
    pub bmFramingInfo: u8,
    pub bPreferredVersion: u8,
    pub bMinVersion: u8,
    pub bMaxVersion: u8,
    pub bInterfaceNumber: u8,
}

#[cfg(feature = "libuvc")]
#[link(name = "uvc")]
extern "C" {
    pub fn uvc_open(dev: *mut uvc_device, devh: *mut *mut uvc_device_handle) -> uvc_error_t;
    pub fn uvc_close(devh: *mut uvc_device_handle);
    pub fn uvc_ref_device(dev: *mut uvc_device);
    pub fn uvc_unref_device(dev: *mut uvc_device);
    pub fn uvc_get_bus_number(dev: *mut uvc_device) -> u8;
    pub fn uvc_get_device_address(dev: *mut uvc_device) -> u8;
    pub fn uvc_get_device_descriptor(
        dev: *mut uvc_device,
        desc: *mut *mut uvc_device_descriptor,
    ) -> uvc_error_t;
    pub fn uvc_free_device_descriptor(desc: *mut uvc_device_descriptor);
    pub fn uvc_set_ae_mode(devh: *mut uvc_device_handle, mode: u8) -> uvc_error_t;
    pub fn uvc_set_ae_priority(devh: *mut uvc_device_handle, priority: u8) -> uvc_error_t;
    pub fn uvc_set_exposure_rel(devh: *mut uvc_device_handle, step: i8) -> uvc_error_t;
    pub fn uvc_set_brightness(devh: *mut uvc_device_handle, brightness: i16) -> uvc_error_t;
    pub fn uvc_claim_if(devh: *mut uvc_device_handle, idx: c_int) -> uvc_error_t;
    pub fn uvc_query_stream_ctrl(
        devh: *mut uvc_device_handle,
        ctrl: *mut uvc_stream_ctrl,
        probe: u8,
        req: uvc_req_code,
    ) -> uvc_error_t;
}
