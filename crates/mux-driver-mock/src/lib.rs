//! Mock Line Backend for gpio-mux
//!
//! This crate provides a simulated line subsystem for running the multiplexer
//! without hardware. Levels are set from code, every backend call is journaled,
//! and claim/release/read failures can be injected.
//!
//! # Fault Injection
//!
//! ```rust
//! use mux_core::LineId;
//! use mux_driver_mock::{FaultConfig, FaultScenario, MockLineBackend};
//!
//! let backend = MockLineBackend::with_faults(FaultConfig::scenario(
//!     FaultScenario::ClaimBusy { line: LineId(27) },
//! ));
//! # drop(backend);
//! ```

pub mod common;
mod mock_lines;

// Re-export common types
pub use common::{FaultConfig, FaultScenario, Operation};

pub use mock_lines::{LineEvent, MockLineBackend};
