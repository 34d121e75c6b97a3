//! Shared infrastructure for the mock line backend.

pub mod faults;

pub use faults::{FaultConfig, FaultScenario, Operation};
