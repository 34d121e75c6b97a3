//! Error types for the multiplexer.
//!
//! Each layer has its own `thiserror` enum:
//!
//! - **`AcquisitionError`**: a line could not be claimed at startup. Fatal to
//!   startup; every line claimed in the same attempt has been rolled back.
//! - **`ReadError`**: a read on the stream endpoint failed. Reported to the
//!   caller as an errno; no state is mutated.
//! - **`SelectError`**: indexed selection out of range.
//! - **`MuxError`**: the application-level error that consolidates the above
//!   with configuration, I/O and protocol errors, so binaries can use `?`.

use mux_core::{LineDescriptor, LineError, TableError};
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type MuxResult<T> = std::result::Result<T, MuxError>;

/// A hardware line could not be claimed while bringing the device up.
#[derive(Error, Debug)]
#[error("Failed to acquire {failed_line} of signal '{signal}' ({rolled_back} lines rolled back): {cause}")]
pub struct AcquisitionError {
    /// The line whose claim failed
    pub failed_line: LineDescriptor,
    /// Signal the failed line belongs to
    pub signal: String,
    /// Number of previously claimed lines released by the rollback
    pub rolled_back: usize,
    /// Backend failure
    #[source]
    pub cause: LineError,
}

/// Failure of a stream read.
#[derive(Error, Debug)]
pub enum ReadError {
    /// Caller's buffer is smaller than the encoded sample
    #[error("Buffer too small: sample needs {needed} bytes, capacity is {capacity}")]
    NoSpace { needed: usize, capacity: usize },

    /// Transfer into the caller's buffer failed
    #[error("Failed to transfer sample into caller buffer")]
    FaultyBuffer,

    /// Sampling a line failed
    #[error("Failed to sample line: {0}")]
    Hardware(#[from] LineError),

    /// Lines are not acquired
    #[error("Device is not up")]
    NotReady,
}

impl ReadError {
    /// POSIX error number reported for this failure.
    pub fn errno(&self) -> i32 {
        match self {
            Self::NoSpace { .. } => libc::ENOSPC,
            Self::FaultyBuffer => libc::EINVAL,
            Self::Hardware(_) => libc::EIO,
            Self::NotReady => libc::ENODEV,
        }
    }
}

/// Failure of an indexed signal selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// No signal at the requested index
    #[error("Signal index {index} out of range: table has {count} signals")]
    OutOfRange { index: usize, count: usize },
}

/// Primary error type for the gpio-mux application.
#[derive(Error, Debug)]
pub enum MuxError {
    /// Configuration file or environment could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration parsed but is semantically invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Signal table rejected.
    #[error("Invalid signal table: {0}")]
    Table(#[from] TableError),

    /// Startup acquisition failed.
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// Stream read failed.
    #[error(transparent)]
    Read(#[from] ReadError),

    /// Signal selection failed.
    #[error(transparent)]
    Select(#[from] SelectError),

    /// Malformed frame on the daemon socket.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The daemon answered with an error status.
    #[error("Daemon returned {status}: {message}")]
    Remote { status: String, message: String },

    /// Status report could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error from the operating system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for MuxError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_core::LineId;

    #[test]
    fn test_read_error_errno() {
        let no_space = ReadError::NoSpace {
            needed: 4,
            capacity: 1,
        };
        assert_eq!(no_space.errno(), libc::ENOSPC);
        assert_eq!(ReadError::FaultyBuffer.errno(), libc::EINVAL);
        assert_eq!(ReadError::NotReady.errno(), libc::ENODEV);
        assert!(no_space.to_string().contains("needs 4 bytes"));
    }

    #[test]
    fn test_acquisition_error_display() {
        let err = AcquisitionError {
            failed_line: LineDescriptor::input(27, "s1.b2"),
            signal: "s1".to_string(),
            rolled_back: 2,
            cause: LineError::Busy { line: LineId(27) },
        };
        let msg = err.to_string();
        assert!(msg.contains("gpio27"));
        assert!(msg.contains("2 lines rolled back"));
    }

    #[test]
    fn test_mux_error_from_conversions() {
        let err: MuxError = ReadError::FaultyBuffer.into();
        assert!(matches!(err, MuxError::Read(ReadError::FaultyBuffer)));

        let err: MuxError = SelectError::OutOfRange { index: 5, count: 2 }.into();
        assert!(err.to_string().contains("out of range"));
    }
}
