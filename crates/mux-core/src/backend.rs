//! The host line subsystem seam.

use crate::error::LineError;
use crate::line::{Direction, LineId};

/// Host-provided access to hardware lines.
///
/// The multiplexer owns no registers; it reserves, releases and samples lines
/// exclusively through this trait. Implementations must be callable from any
/// thread (`&self` receivers, internal synchronization).
///
/// # Example
///
/// ```rust,ignore
/// use mux_core::{Direction, LineBackend, LineId};
///
/// backend.claim_line(LineId(17), Direction::Input)?;
/// let high = backend.read_line(LineId(17))?;
/// backend.release_line(LineId(17))?;
/// ```
pub trait LineBackend: Send + Sync {
    /// Short name used in logs (e.g. `"sysfs"`).
    fn name(&self) -> &'static str;

    /// Reserve `line` for exclusive use in `direction`.
    fn claim_line(&self, line: LineId, direction: Direction) -> Result<(), LineError>;

    /// Give `line` back to the host.
    ///
    /// Callers treat release as infallible; an error here is only logged.
    fn release_line(&self, line: LineId) -> Result<(), LineError>;

    /// Current logic level of `line` (`true` = high).
    fn read_line(&self, line: LineId) -> Result<bool, LineError>;
}

impl<T: LineBackend + ?Sized> LineBackend for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn claim_line(&self, line: LineId, direction: Direction) -> Result<(), LineError> {
        (**self).claim_line(line, direction)
    }

    fn release_line(&self, line: LineId) -> Result<(), LineError> {
        (**self).release_line(line)
    }

    fn read_line(&self, line: LineId) -> Result<bool, LineError> {
        (**self).read_line(line)
    }
}
