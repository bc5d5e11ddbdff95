//! Snapshot publication to store observers.

pub mod bus;

pub use bus::SnapshotBus;
