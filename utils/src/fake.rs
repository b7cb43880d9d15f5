//! An in-memory native layer simulating UVC devices.
//!
//! [`FakeBackend`] builds a real pointer-linked capability tree for every handle it opens and frees
//! it when the handle is closed, so reading it after close is a genuine use-after-free. It records
//! every native call, lets tests inject failure statuses, and answers the probe/commit controls
//! the way a device would, going through the wire layout of the controls.

use std::collections::HashMap;
use std::os::raw::c_int;
use std::ptr::NonNull;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, trace};
use uvcr::backend::{Backend, RawDevice, RawHandle, RequestCode, StreamControlSelector};
use uvcr::bindings;
use uvcr::stream::wire;

use crate::topology::{Topology, TopologyError};
use crate::tree::{self, NativeTree};

/// A native call received by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Open,
    Close,
    RefDevice,
    UnrefDevice,
    DeviceDescriptor,
    FreeDeviceDescriptor,
    SetAeMode(u8),
    SetAePriority(u8),
    SetExposureRel(i8),
    SetBrightness(i16),
    ClaimInterface(u8),
    QueryStreamCtrl(StreamControlSelector, RequestCode),
}

/// How the simulated device answers a probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProbeAnswer {
    /// Keeps the proposed parameters.
    #[default]
    Accept,
    /// Replaces the frame interval.
    SetInterval(u32),
    /// Replaces the frame index.
    SetFrameIndex(u8),
    /// Replaces the format index.
    SetFormatIndex(u8),
}

/// Statuses returned instead of performing the corresponding native calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    pub open: Option<c_int>,
    pub close: Option<c_int>,
    pub descriptor: Option<c_int>,
    /// Applies to all the camera controls.
    pub control: Option<c_int>,
    pub claim: Option<c_int>,
    /// Applies to `GET_MAX` only.
    pub probe_max: Option<c_int>,
    /// Applies to `SET_CUR` and `GET_CUR` on the probe control.
    pub probe: Option<c_int>,
    pub commit: Option<c_int>,
    pub probe_answer: ProbeAnswer,
}

struct FakeDevice {
    /// Gives the device a unique address to be used as its `RawDevice`.
    _token: Box<u8>,
    topology: Topology,
    refcount: i32,
    present: bool,
}

struct OpenDevice {
    dev: usize,
    /// Freed when the handle is closed.
    _tree: NativeTree,
    /// Streaming interfaces claimed through the handle.
    claimed: Vec<u8>,
    probe: Option<Vec<u8>>,
    commit: Option<Vec<u8>>,
    streaming: bool,
}

#[derive(Default)]
struct FakeState {
    devices: HashMap<usize, FakeDevice>,
    handles: HashMap<usize, OpenDevice>,
    faults: Faults,
    calls: Vec<Call>,
    live_descriptors: usize,
}

struct ArmedGate {
    entered: Sender<u8>,
    release: Receiver<()>,
}

/// Test side of a paused traversal, see [`FakeBackend::pause_next_traversal`].
pub struct Gate {
    entered: Receiver<u8>,
    release: Sender<()>,
}

impl Gate {
    /// Blocks until a traversal reached the gate, and returns the index of the format it has just
    /// copied. Returns `None` if the gate has been dropped without being reached.
    pub fn wait_entered(&self) -> Option<u8> {
        self.entered.recv().ok()
    }

    /// Lets the paused traversal continue.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// Simulated native UVC library.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    gate: Mutex<Option<ArmedGate>>,
}

fn dev_key(dev: RawDevice) -> usize {
    dev.as_ptr() as usize
}

fn handle_key(handle: RawHandle) -> usize {
    handle.as_ptr() as usize
}

impl FakeBackend {
    pub fn new() -> Self {
        Default::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plugs a new device and returns the reference discovery would hand over for it.
    pub fn add_device(&self, topology: Topology) -> Result<RawDevice, TopologyError> {
        topology.validate()?;

        let token = Box::new(0u8);
        let dev = RawDevice::from_ptr(&*token as *const u8 as *mut bindings::uvc_device);
        self.state().devices.insert(
            dev_key(dev),
            FakeDevice {
                _token: token,
                topology,
                refcount: 1,
                present: true,
            },
        );
        debug!("Added fake device {:?}", dev);

        Ok(dev)
    }

    /// Simulates the disconnection of `dev`. Native calls targeting it fail from now on.
    pub fn unplug(&self, dev: RawDevice) {
        if let Some(device) = self.state().devices.get_mut(&dev_key(dev)) {
            device.present = false;
        }
    }

    pub fn set_faults(&self, faults: Faults) {
        self.state().faults = faults;
    }

    pub fn clear_faults(&self) {
        self.set_faults(Default::default());
    }

    /// Every native call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count_calls<P: Fn(&Call) -> bool>(&self, predicate: P) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Native reference count of `dev`, starting at 1.
    pub fn refcount(&self, dev: RawDevice) -> Option<i32> {
        self.state()
            .devices
            .get(&dev_key(dev))
            .map(|device| device.refcount)
    }

    /// Device descriptors handed out and not freed yet.
    pub fn live_descriptors(&self) -> usize {
        self.state().live_descriptors
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.state().handles.len()
    }

    /// Streaming interfaces claimed through `handle`, in claim order.
    pub fn claimed_interfaces(&self, handle: RawHandle) -> Vec<u8> {
        self.state()
            .handles
            .get(&handle_key(handle))
            .map_or_else(Vec::new, |open| open.claimed.clone())
    }

    /// Commit payload last received on `handle`.
    pub fn committed(&self, handle: RawHandle) -> Option<Vec<u8>> {
        self.state()
            .handles
            .get(&handle_key(handle))
            .and_then(|open| open.commit.clone())
    }

    /// Marks a stream as running on `handle`, as the capture code would.
    pub fn begin_stream(&self, handle: RawHandle) {
        if let Some(open) = self.state().handles.get_mut(&handle_key(handle)) {
            open.streaming = true;
        }
    }

    pub fn end_stream(&self, handle: RawHandle) {
        if let Some(open) = self.state().handles.get_mut(&handle_key(handle)) {
            open.streaming = false;
        }
    }

    /// Makes the next traversal of a capability tree block right after it has copied its first
    /// format, until the returned gate is released.
    pub fn pause_next_traversal(&self) -> Gate {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(ArmedGate {
            entered: entered_tx,
            release: release_rx,
        });

        Gate {
            entered: entered_rx,
            release: release_tx,
        }
    }

    /// Records `call` and returns the locked state, along with the status to return if `handle`
    /// is not open or its device has been unplugged.
    fn handle_call(&self, handle: RawHandle, call: Call) -> (MutexGuard<'_, FakeState>, c_int) {
        let mut state = self.state();
        state.calls.push(call);
        trace!("{:?} on {:?}", call, handle);

        let status = match state.handles.get(&handle_key(handle)) {
            None => bindings::UVC_ERROR_INVALID_PARAM,
            Some(open) => match state.devices.get(&open.dev) {
                Some(device) if device.present => bindings::UVC_SUCCESS,
                _ => bindings::UVC_ERROR_NO_DEVICE,
            },
        };

        (state, status)
    }

    fn control(&self, handle: RawHandle, call: Call) -> c_int {
        let (state, status) = self.handle_call(handle, call);
        match (status, state.faults.control) {
            (bindings::UVC_SUCCESS, Some(fault)) => fault,
            (status, _) => status,
        }
    }
}

/// Values the simulated device reports for `GET_MAX`.
fn max_probe() -> bindings::uvc_stream_ctrl {
    bindings::uvc_stream_ctrl {
        wCompQuality: 10_000,
        wDelay: 32,
        dwMaxVideoFrameSize: 1280 * 720 * 2,
        dwMaxPayloadTransferSize: 3072,
        ..Default::default()
    }
}

// SAFETY: handles point to a `NativeTree` that is only freed by `close`, and the trees and
// descriptors are built following the layout and termination rules of libuvc.
unsafe impl Backend for FakeBackend {
    fn open(&self, dev: RawDevice) -> Result<RawHandle, c_int> {
        let mut state = self.state();
        state.calls.push(Call::Open);

        if let Some(fault) = state.faults.open {
            return Err(fault);
        }

        let tree = match state.devices.get(&dev_key(dev)) {
            Some(device) if device.present => NativeTree::build(dev.as_ptr(), &device.topology),
            _ => return Err(bindings::UVC_ERROR_NO_DEVICE),
        };
        let handle = RawHandle::from_ptr(tree.handle()).ok_or(bindings::UVC_ERROR_NO_MEM)?;
        trace!(
            "Opened {:?} as {:?}, (interfaces, formats, frames) = {:?}",
            dev,
            handle,
            tree.node_counts()
        );
        state.handles.insert(
            handle_key(handle),
            OpenDevice {
                dev: dev_key(dev),
                _tree: tree,
                claimed: Vec::new(),
                probe: None,
                commit: None,
                streaming: false,
            },
        );

        Ok(handle)
    }

    fn close(&self, handle: RawHandle) -> c_int {
        let mut state = self.state();
        state.calls.push(Call::Close);

        // Dropping the tree frees it, whatever the status we report.
        match state.handles.remove(&handle_key(handle)) {
            Some(_) => state.faults.close.unwrap_or(bindings::UVC_SUCCESS),
            None => bindings::UVC_ERROR_INVALID_PARAM,
        }
    }

    fn ref_device(&self, dev: RawDevice) {
        let mut state = self.state();
        state.calls.push(Call::RefDevice);
        if let Some(device) = state.devices.get_mut(&dev_key(dev)) {
            device.refcount += 1;
        }
    }

    fn unref_device(&self, dev: RawDevice) {
        let mut state = self.state();
        state.calls.push(Call::UnrefDevice);
        if let Some(device) = state.devices.get_mut(&dev_key(dev)) {
            device.refcount -= 1;
        }
    }

    fn bus_number(&self, dev: RawDevice) -> u8 {
        self.state()
            .devices
            .get(&dev_key(dev))
            .map_or(0, |device| device.topology.bus_number)
    }

    fn device_address(&self, dev: RawDevice) -> u8 {
        self.state()
            .devices
            .get(&dev_key(dev))
            .map_or(0, |device| device.topology.device_address)
    }

    fn device_descriptor(
        &self,
        dev: RawDevice,
    ) -> Result<NonNull<bindings::uvc_device_descriptor>, c_int> {
        let mut state = self.state();
        state.calls.push(Call::DeviceDescriptor);

        if let Some(fault) = state.faults.descriptor {
            return Err(fault);
        }

        let desc = match state.devices.get(&dev_key(dev)) {
            Some(device) => tree::alloc_device_descriptor(&device.topology.descriptor),
            None => return Err(bindings::UVC_ERROR_NO_DEVICE),
        };
        state.live_descriptors += 1;

        NonNull::new(desc).ok_or(bindings::UVC_ERROR_NO_MEM)
    }

    fn free_device_descriptor(&self, desc: NonNull<bindings::uvc_device_descriptor>) {
        let mut state = self.state();
        state.calls.push(Call::FreeDeviceDescriptor);
        state.live_descriptors -= 1;
        // SAFETY: descriptors are only handed out by `device_descriptor`.
        unsafe { tree::free_device_descriptor(desc.as_ptr()) };
    }

    fn format_copied(&self, handle: RawHandle, format_index: u8) {
        let armed = self
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(gate) = armed {
            debug!("Traversal of {:?} paused after format {}", handle, format_index);
            let _ = gate.entered.send(format_index);
            let _ = gate.release.recv();
            debug!("Traversal of {:?} resumed", handle);
        }
    }

    fn has_active_streams(&self, handle: RawHandle) -> bool {
        self.state()
            .handles
            .get(&handle_key(handle))
            .map_or(false, |open| open.streaming)
    }

    fn set_ae_mode(&self, handle: RawHandle, mode: u8) -> c_int {
        self.control(handle, Call::SetAeMode(mode))
    }

    fn set_ae_priority(&self, handle: RawHandle, priority: u8) -> c_int {
        self.control(handle, Call::SetAePriority(priority))
    }

    fn set_exposure_rel(&self, handle: RawHandle, step: i8) -> c_int {
        self.control(handle, Call::SetExposureRel(step))
    }

    fn set_brightness(&self, handle: RawHandle, brightness: i16) -> c_int {
        self.control(handle, Call::SetBrightness(brightness))
    }

    fn claim_interface(&self, handle: RawHandle, interface: u8) -> c_int {
        let (mut state, status) = self.handle_call(handle, Call::ClaimInterface(interface));
        if status != bindings::UVC_SUCCESS {
            return status;
        }
        if let Some(fault) = state.faults.claim {
            return fault;
        }

        let FakeState {
            devices, handles, ..
        } = &mut *state;
        let Some(open) = handles.get_mut(&handle_key(handle)) else {
            return bindings::UVC_ERROR_INVALID_PARAM;
        };
        match devices.get(&open.dev) {
            Some(device) if device.topology.has_interface(interface) => (),
            _ => return bindings::UVC_ERROR_INVALID_PARAM,
        }
        if !open.claimed.contains(&interface) {
            open.claimed.push(interface);
        }

        bindings::UVC_SUCCESS
    }

    fn query_stream_ctrl(
        &self,
        handle: RawHandle,
        ctrl: &mut bindings::uvc_stream_ctrl,
        selector: StreamControlSelector,
        req: RequestCode,
    ) -> c_int {
        let (mut state, status) =
            self.handle_call(handle, Call::QueryStreamCtrl(selector, req));
        if status != bindings::UVC_SUCCESS {
            return status;
        }

        let faults = state.faults;
        let fault = match (selector, req) {
            (StreamControlSelector::Probe, RequestCode::GetMax) => faults.probe_max,
            (StreamControlSelector::Probe, _) => faults.probe,
            (StreamControlSelector::Commit, _) => faults.commit,
        };
        if let Some(fault) = fault {
            return fault;
        }

        let FakeState {
            devices, handles, ..
        } = &mut *state;
        let Some(open) = handles.get_mut(&handle_key(handle)) else {
            return bindings::UVC_ERROR_INVALID_PARAM;
        };
        let Some(device) = devices.get(&open.dev) else {
            return bindings::UVC_ERROR_NO_DEVICE;
        };
        let topology = &device.topology;
        let bcd_uvc = topology.control_interface.bcd_uvc;

        if !topology.has_interface(ctrl.bInterfaceNumber) {
            return bindings::UVC_ERROR_INVALID_PARAM;
        }
        // The kernel driver still owns interfaces that have not been claimed.
        if !open.claimed.contains(&ctrl.bInterfaceNumber) {
            return bindings::UVC_ERROR_BUSY;
        }

        // Every control goes through its wire layout, as it would over USB.
        let transfer = |from: &bindings::uvc_stream_ctrl, to: &mut bindings::uvc_stream_ctrl| {
            match wire::pack(from, bcd_uvc).and_then(|payload| wire::unpack(&payload, to)) {
                Ok(()) => bindings::UVC_SUCCESS,
                Err(_) => bindings::UVC_ERROR_IO,
            }
        };
        let unpack = |payload: &[u8], ctrl: &mut bindings::uvc_stream_ctrl| {
            match wire::unpack(payload, ctrl) {
                Ok(()) => bindings::UVC_SUCCESS,
                Err(_) => bindings::UVC_ERROR_IO,
            }
        };

        match (selector, req) {
            (StreamControlSelector::Probe, RequestCode::GetMax) => transfer(&max_probe(), ctrl),
            (StreamControlSelector::Probe, RequestCode::SetCur) => {
                let mut answer = bindings::uvc_stream_ctrl::default();
                let status = transfer(ctrl, &mut answer);
                if status != bindings::UVC_SUCCESS {
                    return status;
                }

                // Unknown formats or frames stall the control pipe.
                let Some(frame) =
                    topology.frame(ctrl.bInterfaceNumber, answer.bFormatIndex, answer.bFrameIndex)
                else {
                    return bindings::UVC_ERROR_PIPE;
                };
                answer.dwMaxVideoFrameSize = frame.max_video_frame_buffer_size;
                answer.dwMaxPayloadTransferSize = max_probe().dwMaxPayloadTransferSize;
                answer.dwClockFrequency = topology.control_interface.clock_frequency;

                match faults.probe_answer {
                    ProbeAnswer::Accept => (),
                    ProbeAnswer::SetInterval(interval) => answer.dwFrameInterval = interval,
                    ProbeAnswer::SetFrameIndex(index) => answer.bFrameIndex = index,
                    ProbeAnswer::SetFormatIndex(index) => answer.bFormatIndex = index,
                }

                match wire::pack(&answer, bcd_uvc) {
                    Ok(payload) => {
                        open.probe = Some(payload);
                        bindings::UVC_SUCCESS
                    }
                    Err(_) => bindings::UVC_ERROR_IO,
                }
            }
            (StreamControlSelector::Probe, RequestCode::GetCur) => match &open.probe {
                Some(payload) => unpack(payload, ctrl),
                None => bindings::UVC_ERROR_PIPE,
            },
            (StreamControlSelector::Commit, RequestCode::SetCur) => {
                match wire::pack(ctrl, bcd_uvc) {
                    Ok(payload) => {
                        open.commit = Some(payload);
                        bindings::UVC_SUCCESS
                    }
                    Err(_) => bindings::UVC_ERROR_IO,
                }
            }
            (StreamControlSelector::Commit, RequestCode::GetCur) => match &open.commit {
                Some(payload) => unpack(payload, ctrl),
                None => bindings::UVC_ERROR_PIPE,
            },
            _ => bindings::UVC_ERROR_NOT_SUPPORTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_builds_tree() {
        let backend = FakeBackend::new();
        let dev = backend.add_device(Topology::webcam()).unwrap();

        let handle = backend.open(dev).unwrap();
        assert_eq!(backend.open_handles(), 1);

        let info = unsafe { &*backend.device_info(handle) };
        assert_eq!(info.ctrl_if.bcdUVC, 0x0100);
        let itf = unsafe { &*info.stream_ifs };
        assert_eq!(itf.bInterfaceNumber, 1);
        assert!(itf.next.is_null());
        let format = unsafe { &*itf.format_descs };
        assert_eq!(format.bFormatIndex, 1);
        let mjpeg = unsafe { &*format.next };
        assert_eq!(unsafe { mjpeg.__bindgen_anon_1.fourccFormat }, *b"MJPG");
        assert!(mjpeg.next.is_null());

        assert_eq!(backend.close(handle), bindings::UVC_SUCCESS);
        assert_eq!(backend.open_handles(), 0);
        assert_eq!(backend.calls(), [Call::Open, Call::Close]);
    }

    #[test]
    fn test_unplugged_device() {
        let backend = FakeBackend::new();
        let dev = backend.add_device(Topology::webcam()).unwrap();
        let handle = backend.open(dev).unwrap();

        backend.unplug(dev);
        assert_eq!(backend.open(dev), Err(bindings::UVC_ERROR_NO_DEVICE));
        assert_eq!(
            backend.set_brightness(handle, 1),
            bindings::UVC_ERROR_NO_DEVICE
        );
        assert_eq!(backend.close(handle), bindings::UVC_SUCCESS);
    }

    #[test]
    fn test_gate() {
        let backend = std::sync::Arc::new(FakeBackend::new());
        let dev = backend.add_device(Topology::webcam()).unwrap();
        let handle = backend.open(dev).unwrap();

        let gate = backend.pause_next_traversal();
        let traversal = {
            let backend = backend.clone();
            std::thread::spawn(move || backend.format_copied(handle, 2))
        };
        assert_eq!(gate.wait_entered(), Some(2));
        gate.release();
        traversal.join().unwrap();

        // The gate only applies once.
        backend.format_copied(handle, 1);
        backend.close(handle);
    }

    #[test]
    fn test_streaming_interface_must_be_claimed() {
        let backend = FakeBackend::new();
        let dev = backend.add_device(Topology::webcam()).unwrap();
        let handle = backend.open(dev).unwrap();
        let mut ctrl = bindings::uvc_stream_ctrl {
            bInterfaceNumber: 1,
            wCompQuality: 10_000,
            ..Default::default()
        };
        let commit = |ctrl: &mut bindings::uvc_stream_ctrl, req| {
            backend.query_stream_ctrl(handle, ctrl, StreamControlSelector::Commit, req)
        };

        assert_eq!(commit(&mut ctrl, RequestCode::SetCur), bindings::UVC_ERROR_BUSY);

        assert_eq!(
            backend.claim_interface(handle, 2),
            bindings::UVC_ERROR_INVALID_PARAM
        );
        assert_eq!(backend.claim_interface(handle, 1), bindings::UVC_SUCCESS);
        assert_eq!(backend.claim_interface(handle, 1), bindings::UVC_SUCCESS);
        assert_eq!(backend.claimed_interfaces(handle), [1]);

        assert_eq!(commit(&mut ctrl, RequestCode::SetCur), bindings::UVC_SUCCESS);
        let mut current = bindings::uvc_stream_ctrl {
            bInterfaceNumber: 1,
            ..Default::default()
        };
        assert_eq!(commit(&mut current, RequestCode::GetCur), bindings::UVC_SUCCESS);
        assert_eq!(current.wCompQuality, 10_000);
        backend.close(handle);
    }
}
