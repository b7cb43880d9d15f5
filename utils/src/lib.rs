//! Test helpers for `uvcr`: simulated devices and the native layer serving them.

mod fake;
mod topology;
mod tree;

pub use fake::{Call, FakeBackend, Faults, Gate, ProbeAnswer};
pub use topology::{Topology, TopologyError};
