#![allow(dead_code)]

use std::sync::Arc;

use uvcr::backend::RawDevice;
use uvcr::device::{Device, DeviceConfig};
use uvcr_utils::{FakeBackend, Topology};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A closed device backed by a fresh fake webcam.
pub fn webcam() -> (Arc<FakeBackend>, RawDevice, Device<FakeBackend>) {
    webcam_with(Topology::webcam(), DeviceConfig::new())
}

pub fn webcam_with(
    topology: Topology,
    config: DeviceConfig,
) -> (Arc<FakeBackend>, RawDevice, Device<FakeBackend>) {
    init_logger();

    let backend = Arc::new(FakeBackend::new());
    let dev = backend.add_device(topology).unwrap();
    let device = Device::new(backend.clone(), dev, config);

    (backend, dev, device)
}
