//! # GPIO Signal Multiplexer
//!
//! This crate multiplexes several groups of digital input lines ("signals")
//! through a single byte-stream endpoint. One signal is active at a time; a
//! read on a fresh session returns the active signal's line levels as an
//! ASCII bit string (`'1'` high, `'0'` low, first line most significant) and
//! any write advances the active signal cyclically.
//!
//! ## Crate Structure
//!
//! - **`acquisition`**: claims every line of the table at startup with
//!   reverse-order rollback, and releases them at shutdown.
//! - **`selector`**: the active-signal state machine.
//! - **`sampler`**: reads a signal's lines and encodes them as a bit string.
//! - **`device`**: `MuxDevice`, the stream endpoint (open/read/write/close)
//!   holding all driver state behind one mutex.
//! - **`config`**: layered `figment` configuration (defaults, TOML, env).
//! - **`logging`**: `tracing` subscriber setup.
//! - **`hardware`**: builds the configured line backend (sysfs or mock).
//! - **`network`**: the TCP daemon and its client.
//! - **`error`**: error types and their errno mapping.
//!
//! Core data types and the line backend trait live in `mux-core`; the
//! backends live in `mux-driver-sysfs` and `mux-driver-mock`.

pub mod acquisition;
pub mod config;
pub mod device;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod network;
pub mod sampler;
pub mod selector;

pub use device::{MuxDevice, Session, StatusReport};
pub use error::{MuxError, MuxResult};
pub use mux_core::{LineBackend, LineId, Signal, SignalTable};
