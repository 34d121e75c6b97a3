//! Core types and traits for gpio-mux.
//!
//! This crate holds the pieces every other gpio-mux crate agrees on:
//!
//! - [`LineId`] / [`LineDescriptor`] - one physical input line
//! - [`Signal`] / [`SignalTable`] - named, ordered groups of lines
//! - [`LineBackend`] - the host line subsystem (claim, release, read)
//! - [`LineError`] / [`TableError`] - failures of the above
//!
//! Drivers implement [`LineBackend`]; the multiplexer itself lives in the
//! `gpio_mux` crate and never touches hardware except through that trait.

pub mod backend;
pub mod error;
pub mod line;
pub mod signal;

pub use backend::LineBackend;
pub use error::{LineError, TableError};
pub use line::{Direction, LineDescriptor, LineId};
pub use signal::{Signal, SignalTable, MAX_LINES};
