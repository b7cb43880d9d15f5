//! Lifecycle of a UVC device and its open handle.
//!
//! A [`Device`] owns a native device reference and, while open, the native handle obtained from
//! it. The handle lives behind a reader-writer lock: opening and closing take the lock in write
//! mode, every other operation takes it in read mode for as long as it uses the handle or memory
//! owned by it. A device can therefore be shared between threads and closed at any time without
//! another thread observing freed native state.

use std::os::raw::c_int;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, trace, warn};

use crate::backend::{Backend, RawDevice, RawHandle};
use crate::bindings;
use crate::descriptors::DeviceDescriptor;
use crate::error::{self, Error, ErrorKind, Result};

/// Options applied to the stream negotiations of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub(crate) query_max: bool,
    pub(crate) strict_frame_interval: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            query_max: true,
            strict_frame_interval: false,
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Default::default()
    }

    /// Do not read the device's maximum probe values before proposing parameters.
    pub fn skip_max_query(self) -> Self {
        DeviceConfig {
            query_max: false,
            ..self
        }
    }

    /// Reject probe answers in which the device changed the requested frame interval.
    pub fn strict_frame_interval(self) -> Self {
        DeviceConfig {
            strict_frame_interval: true,
            ..self
        }
    }

    pub fn queries_max(&self) -> bool {
        self.query_max
    }

    pub fn is_strict_frame_interval(&self) -> bool {
        self.strict_frame_interval
    }
}

/// State protected by the device lock.
#[derive(Debug)]
pub(crate) struct HandleState {
    handle: Option<RawHandle>,
    /// Incremented every time a handle is installed.
    generation: u64,
}

/// Source of unique device identities, so stream controls cannot be used on another device.
static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// A UVC device, either closed or open.
pub struct Device<B: Backend + ?Sized> {
    backend: Arc<B>,
    dev: RawDevice,
    id: u64,
    config: DeviceConfig,
    state: RwLock<HandleState>,
}

impl<B: Backend + ?Sized> Device<B> {
    /// Wraps the device reference `dev` obtained from discovery. The device starts closed.
    pub fn new(backend: Arc<B>, dev: RawDevice, config: DeviceConfig) -> Self {
        Self::with_state(backend, dev, config, None)
    }

    /// Wraps a device reference that has already been opened into `handle`.
    ///
    /// # Safety
    ///
    /// `handle` must have been returned by `backend.open(dev)` and must not be closed or used by
    /// anything but the returned `Device` from now on.
    pub unsafe fn with_open_handle(
        backend: Arc<B>,
        dev: RawDevice,
        handle: RawHandle,
        config: DeviceConfig,
    ) -> Self {
        Self::with_state(backend, dev, config, Some(handle))
    }

    fn with_state(
        backend: Arc<B>,
        dev: RawDevice,
        config: DeviceConfig,
        handle: Option<RawHandle>,
    ) -> Self {
        Device {
            backend,
            dev,
            id: NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed),
            config,
            state: RwLock::new(HandleState {
                generation: handle.is_some() as u64,
                handle,
            }),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn raw_device(&self) -> RawDevice {
        self.dev
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    // The guarded state is always consistent, so a panic while holding the lock does not make it
    // unusable.
    fn read_state(&self) -> RwLockReadGuard<'_, HandleState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, HandleState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the device. Does nothing if it is already open.
    pub fn open(&self) -> Result<()> {
        let mut state = self.write_state();

        if state.handle.is_some() {
            return Ok(());
        }

        if self.dev.is_null() {
            return Err(Error::DeviceNotFound);
        }

        match self.backend.open(self.dev) {
            Ok(handle) => {
                state.handle = Some(handle);
                state.generation += 1;
                debug!(
                    "Opened {:?} as {:?} (generation {})",
                    self.dev, handle, state.generation
                );
                Ok(())
            }
            Err(status) => {
                let kind = ErrorKind::from_failure(status);
                debug!("Failed to open {:?}: {}", self.dev, kind);
                Err(Error::Native(kind))
            }
        }
    }

    /// Closes the device, ending any stream in progress and invalidating every stream control
    /// negotiated on the current handle. Closing a closed device does nothing.
    pub fn close(&self) {
        let mut state = self.write_state();
        teardown(&*self.backend, &mut state);
    }

    pub fn is_open(&self) -> bool {
        self.read_state().handle.is_some()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Returns `true` if the device is closed, or open without any running stream.
    pub fn is_idle(&self) -> bool {
        match self.open_handle() {
            None => true,
            Some(handle) => !handle.backend().has_active_streams(handle.raw()),
        }
    }

    /// Increments the native reference count of the device.
    pub fn ref_device(&self) {
        let _state = self.read_state();
        if !self.dev.is_null() {
            self.backend.ref_device(self.dev);
        }
    }

    /// Decrements the native reference count of the device.
    pub fn unref_device(&self) {
        let _state = self.read_state();
        if !self.dev.is_null() {
            self.backend.unref_device(self.dev);
        }
    }

    /// Number of the bus the device is attached to.
    pub fn bus_number(&self) -> Result<u8> {
        if self.dev.is_null() {
            return Err(Error::DeviceNotFound);
        }
        Ok(self.backend.bus_number(self.dev))
    }

    /// Address of the device on its bus.
    pub fn device_address(&self) -> Result<u8> {
        if self.dev.is_null() {
            return Err(Error::DeviceNotFound);
        }
        Ok(self.backend.device_address(self.dev))
    }

    /// Reads the USB device descriptor. Does not require the device to be open.
    pub fn descriptor(&self) -> Result<DeviceDescriptor> {
        if self.dev.is_null() {
            return Err(Error::DeviceNotFound);
        }

        let desc = self
            .backend
            .device_descriptor(self.dev)
            .map_err(|status| Error::Native(ErrorKind::from_failure(status)))?;
        // SAFETY: the descriptor stays valid until we free it right after copying it, and its
        // strings are null or nul-terminated as per the `Backend` contract.
        let descriptor = unsafe { DeviceDescriptor::from_native(desc.as_ref()) };
        self.backend.free_device_descriptor(desc);

        Ok(descriptor)
    }

    /// Locks the device in read mode and returns its handle, or `None` if it is closed.
    pub(crate) fn open_handle(&self) -> Option<OpenHandle<'_, B>> {
        let state = self.read_state();
        let handle = state.handle?;

        Some(OpenHandle {
            generation: state.generation,
            _state: state,
            backend: &*self.backend,
            handle,
        })
    }

    /// Runs a native control request on the open handle and translates its status.
    pub(crate) fn control<F>(&self, name: &str, request: F) -> Result<()>
    where
        F: FnOnce(&B, RawHandle) -> c_int,
    {
        let handle = self.open_handle().ok_or(Error::DeviceClosed)?;
        let status = request(handle.backend(), handle.raw());
        trace!("{} on {:?}: status {}", name, handle.raw(), status);

        error::check(status)
    }
}

fn teardown<B: Backend + ?Sized>(backend: &B, state: &mut HandleState) {
    let Some(handle) = state.handle.take() else {
        return;
    };

    if let Err(kind) = ErrorKind::check(backend.close(handle)) {
        warn!("Ignoring error while closing {:?}: {}", handle, kind);
    }
    debug!("Closed {:?} (generation {})", handle, state.generation);
}

impl<B: Backend + ?Sized> Drop for Device<B> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        teardown(&*self.backend, state);
    }
}

impl<B: Backend + ?Sized> std::fmt::Debug for Device<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("dev", &self.dev)
            .field("id", &self.id)
            .field("config", &self.config)
            .finish()
    }
}

/// A device locked in read mode with an open handle.
///
/// Native memory owned by the handle may only be borrowed through this guard, which keeps any
/// `close()` waiting until it is dropped.
pub(crate) struct OpenHandle<'a, B: Backend + ?Sized> {
    _state: RwLockReadGuard<'a, HandleState>,
    backend: &'a B,
    handle: RawHandle,
    generation: u64,
}

impl<'a, B: Backend + ?Sized> OpenHandle<'a, B> {
    pub(crate) fn backend(&self) -> &'a B {
        self.backend
    }

    pub(crate) fn raw(&self) -> RawHandle {
        self.handle
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Borrows the native capability tree of the handle for as long as the lock is held.
    pub(crate) fn info(&self) -> Option<&bindings::uvc_device_info> {
        // SAFETY: the backend keeps the tree alive until the handle is closed, which cannot happen
        // while we hold the read lock. The returned reference cannot outlive `self`.
        unsafe { self.backend.device_info(self.handle).as_ref() }
    }
}

#[cfg(test)]
mod tests {
    use super::DeviceConfig;

    #[test]
    fn test_device_config() {
        let config = DeviceConfig::new();
        assert!(config.queries_max());
        assert!(!config.is_strict_frame_interval());

        let config = DeviceConfig::new().skip_max_query().strict_frame_interval();
        assert!(!config.queries_max());
        assert!(config.is_strict_frame_interval());
    }
}
