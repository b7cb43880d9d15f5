//! Native descriptor trees, laid out the way libuvc builds them for an open handle.

use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr::{addr_of_mut, null_mut};

use uvcr::bindings;
use uvcr::descriptors::DeviceDescriptor;

use crate::topology::Topology;

/// A `uvc_device_handle` and the pointer-linked capability tree hanging off it.
///
/// Every node is a separate heap allocation owned by this struct and freed when it is dropped.
pub(crate) struct NativeTree {
    handle: *mut bindings::uvc_device_handle,
    info: *mut bindings::uvc_device_info,
    stream_ifs: Vec<*mut bindings::uvc_streaming_interface>,
    formats: Vec<*mut bindings::uvc_format_desc>,
    frames: Vec<*mut bindings::uvc_frame_desc>,
    intervals: Vec<*mut [u32]>,
}

// The tree is only mutated while being built and dropped, both of which need exclusive access.
unsafe impl Send for NativeTree {}

fn leak<T>(value: T) -> *mut T {
    Box::into_raw(Box::new(value))
}

impl NativeTree {
    pub(crate) fn build(dev: *mut bindings::uvc_device, topology: &Topology) -> Self {
        let ctrl = &topology.control_interface;
        let info = leak(bindings::uvc_device_info {
            config: null_mut(),
            ctrl_if: bindings::uvc_control_interface {
                parent: null_mut(),
                input_term_descs: null_mut(),
                selector_unit_descs: null_mut(),
                processing_unit_descs: null_mut(),
                extension_unit_descs: null_mut(),
                bcdUVC: ctrl.bcd_uvc,
                dwClockFrequency: ctrl.clock_frequency,
                bEndpointAddress: ctrl.endpoint_address,
                bInterfaceNumber: ctrl.interface_number,
            },
            stream_ifs: null_mut(),
        });

        let mut tree = NativeTree {
            handle: null_mut(),
            info,
            stream_ifs: Vec::new(),
            formats: Vec::new(),
            frames: Vec::new(),
            intervals: Vec::new(),
        };

        // SAFETY: all the pointers we write through have just been allocated by us.
        unsafe {
            (*info).ctrl_if.parent = info;

            let mut itf_slot = addr_of_mut!((*info).stream_ifs);
            let mut prev_itf = null_mut();
            for itf in &topology.stream_interfaces {
                let itf_node = leak(bindings::uvc_streaming_interface {
                    parent: info,
                    prev: prev_itf,
                    next: null_mut(),
                    bInterfaceNumber: itf.interface_number,
                    format_descs: null_mut(),
                    bEndpointAddress: itf.endpoint_address,
                    bTerminalLink: itf.terminal_link,
                    bStillCaptureMethod: itf.still_capture_method,
                });
                tree.stream_ifs.push(itf_node);
                *itf_slot = itf_node;
                itf_slot = addr_of_mut!((*itf_node).next);
                prev_itf = itf_node;

                let mut format_slot = addr_of_mut!((*itf_node).format_descs);
                let mut prev_format = null_mut();
                for format in &itf.formats {
                    let format_node = leak(bindings::uvc_format_desc {
                        parent: itf_node,
                        prev: prev_format,
                        next: null_mut(),
                        bDescriptorSubtype: format.subtype.into(),
                        bFormatIndex: format.format_index,
                        bNumFrameDescriptors: format.num_frame_descriptors,
                        __bindgen_anon_1: bindings::uvc_format_desc__bindgen_ty_1 {
                            guidFormat: format.guid,
                        },
                        __bindgen_anon_2: bindings::uvc_format_desc__bindgen_ty_2 {
                            bBitsPerPixel: format.bits_per_pixel,
                        },
                        bDefaultFrameIndex: format.default_frame_index,
                        bAspectRatioX: format.aspect_ratio_x,
                        bAspectRatioY: format.aspect_ratio_y,
                        bmInterlaceFlags: format.interlace_flags,
                        bCopyProtect: format.copy_protect,
                        bVariableSize: format.variable_size,
                        frame_descs: null_mut(),
                        still_frame_desc: null_mut(),
                    });
                    tree.formats.push(format_node);
                    *format_slot = format_node;
                    format_slot = addr_of_mut!((*format_node).next);
                    prev_format = format_node;

                    let mut frame_slot = addr_of_mut!((*format_node).frame_descs);
                    let mut prev_frame = null_mut();
                    for frame in &format.frames {
                        let intervals = if frame.intervals.is_empty() {
                            null_mut()
                        } else {
                            let mut terminated = frame.intervals.clone();
                            terminated.push(0);
                            let raw = Box::into_raw(terminated.into_boxed_slice());
                            tree.intervals.push(raw);
                            raw as *mut u32
                        };

                        let frame_node = leak(bindings::uvc_frame_desc {
                            parent: format_node,
                            prev: prev_frame,
                            next: null_mut(),
                            bDescriptorSubtype: frame.subtype.into(),
                            bFrameIndex: frame.frame_index,
                            bmCapabilities: frame.capabilities,
                            wWidth: frame.width,
                            wHeight: frame.height,
                            dwMinBitRate: frame.min_bit_rate,
                            dwMaxBitRate: frame.max_bit_rate,
                            dwMaxVideoFrameBufferSize: frame.max_video_frame_buffer_size,
                            dwDefaultFrameInterval: frame.default_frame_interval,
                            dwMinFrameInterval: frame.min_frame_interval,
                            dwMaxFrameInterval: frame.max_frame_interval,
                            dwFrameIntervalStep: frame.frame_interval_step,
                            bFrameIntervalType: frame.frame_interval_type,
                            dwBytesPerLine: frame.bytes_per_line,
                            intervals,
                        });
                        tree.frames.push(frame_node);
                        *frame_slot = frame_node;
                        frame_slot = addr_of_mut!((*frame_node).next);
                        prev_frame = frame_node;
                    }
                }
            }
        }

        tree.handle = leak(bindings::uvc_device_handle {
            dev,
            prev: null_mut(),
            next: null_mut(),
            usb_devh: null_mut(),
            info,
            status_xfer: null_mut(),
            status_buf: [0; 32],
            status_cb: null_mut(),
            status_user_ptr: null_mut(),
            button_cb: null_mut(),
            button_user_ptr: null_mut(),
            streams: null_mut(),
            is_isight: 0,
            claimed: 0,
        });

        tree
    }

    pub(crate) fn handle(&self) -> *mut bindings::uvc_device_handle {
        self.handle
    }

    /// Number of nodes of each level: stream interfaces, formats, frames.
    pub(crate) fn node_counts(&self) -> (usize, usize, usize) {
        (self.stream_ifs.len(), self.formats.len(), self.frames.len())
    }
}

impl Drop for NativeTree {
    fn drop(&mut self) {
        // SAFETY: every pointer has been obtained from `Box::into_raw` and is freed exactly once.
        unsafe {
            drop(Box::from_raw(self.handle));
            for frame in self.frames.drain(..) {
                drop(Box::from_raw(frame));
            }
            for intervals in self.intervals.drain(..) {
                drop(Box::from_raw(intervals));
            }
            for format in self.formats.drain(..) {
                drop(Box::from_raw(format));
            }
            for itf in self.stream_ifs.drain(..) {
                drop(Box::from_raw(itf));
            }
            drop(Box::from_raw(self.info));
        }
    }
}

/// Allocates a native device descriptor. Empty strings are represented by null pointers.
pub(crate) fn alloc_device_descriptor(
    desc: &DeviceDescriptor,
) -> *mut bindings::uvc_device_descriptor {
    let to_raw = |s: &str| -> *const c_char {
        match s {
            "" => std::ptr::null(),
            // Strings have been checked by `Topology::validate`.
            s => CString::new(s).map_or(std::ptr::null(), |s| s.into_raw() as *const _),
        }
    };

    leak(bindings::uvc_device_descriptor {
        idVendor: desc.vendor_id,
        idProduct: desc.product_id,
        bcdUVC: desc.bcd_uvc,
        serialNumber: to_raw(&desc.serial_number),
        manufacturer: to_raw(&desc.manufacturer),
        product: to_raw(&desc.product),
    })
}

/// Frees a descriptor allocated by [`alloc_device_descriptor`].
///
/// # Safety
///
/// `desc` must come from [`alloc_device_descriptor`] and not have been freed yet.
pub(crate) unsafe fn free_device_descriptor(desc: *mut bindings::uvc_device_descriptor) {
    let desc = Box::from_raw(desc);
    for s in [desc.serialNumber, desc.manufacturer, desc.product] {
        if !s.is_null() {
            drop(CString::from_raw(s as *mut c_char));
        }
    }
}
