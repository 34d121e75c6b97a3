//! Error types for line and table operations.

use crate::line::LineId;
use thiserror::Error;

/// Errors reported by a [`LineBackend`](crate::LineBackend).
#[derive(Error, Debug)]
pub enum LineError {
    /// Line does not exist on this platform
    #[error("Line {line} not found: {message}")]
    NotFound { line: LineId, message: String },

    /// Line is already reserved by someone else
    #[error("Line {line} is busy (already claimed)")]
    Busy { line: LineId },

    /// Caller may not reserve or access the line
    #[error("Permission denied for line {line}")]
    PermissionDenied { line: LineId },

    /// Operation on a line that was never claimed
    #[error("Line {line} has not been claimed")]
    NotClaimed { line: LineId },

    /// Backend reported a hardware fault
    #[error("Hardware error on line {line}: {message}")]
    Hardware { line: LineId, message: String },

    /// I/O error from the operating system
    #[error("I/O error on line {line}: {source}")]
    Io {
        line: LineId,
        #[source]
        source: std::io::Error,
    },
}

impl LineError {
    /// Line the error refers to.
    pub fn line(&self) -> LineId {
        match self {
            Self::NotFound { line, .. }
            | Self::Busy { line }
            | Self::PermissionDenied { line }
            | Self::NotClaimed { line }
            | Self::Hardware { line, .. }
            | Self::Io { line, .. } => *line,
        }
    }

    /// Map an OS error on `line` to the closest variant.
    pub fn from_io(line: LineId, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { line },
            std::io::ErrorKind::NotFound => Self::NotFound {
                line,
                message: source.to_string(),
            },
            _ if source.raw_os_error() == Some(libc::EBUSY) => Self::Busy { line },
            _ => Self::Io { line, source },
        }
    }

    /// Check if the line was already reserved.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

/// Problems with a signal table, detected before any line is claimed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Fewer than two signals declared
    #[error("Signal table needs at least 2 signals, found {found}")]
    TooFewSignals { found: usize },

    /// Signal has no lines
    #[error("Signal '{signal}' has no lines")]
    EmptySignal { signal: String },

    /// Signal has more lines than the staging buffer holds
    #[error("Signal '{signal}' has {count} lines, at most {max} are supported")]
    TooManyLines {
        signal: String,
        count: usize,
        max: usize,
    },

    /// Same line declared twice
    #[error("Line {line} appears in both '{first}' and '{second}'")]
    DuplicateLine {
        line: LineId,
        first: String,
        second: String,
    },

    /// Same signal name declared twice
    #[error("Duplicate signal name '{signal}'")]
    DuplicateSignal { signal: String },
}
