//! Mock line subsystem.

use crate::common::{FaultConfig, Operation};
use mux_core::{Direction, LineBackend, LineError, LineId};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// One recorded backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// Successful claim
    Claimed(LineId),
    /// Release (recorded even when a fault was injected)
    Released(LineId),
    /// Successful read
    Read(LineId),
}

/// In-memory [`LineBackend`] with settable levels and a call journal.
///
/// Behaves like the kernel line reservation mechanism: a line can be claimed
/// once, reading or releasing an unclaimed line fails, and levels default to
/// low. Levels can be changed at any time to simulate inputs.
///
/// # Example
///
/// ```
/// use mux_core::{Direction, LineBackend, LineId};
/// use mux_driver_mock::MockLineBackend;
///
/// let backend = MockLineBackend::new();
/// backend.set_level(LineId(17), true);
/// backend.claim_line(LineId(17), Direction::Input).unwrap();
/// assert!(backend.read_line(LineId(17)).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct MockLineBackend {
    levels: RwLock<HashMap<LineId, bool>>,
    claimed: Mutex<BTreeSet<LineId>>,
    journal: Mutex<Vec<LineEvent>>,
    faults: FaultConfig,
}

impl MockLineBackend {
    /// Backend with all lines low and no faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with the given fault configuration.
    pub fn with_faults(faults: FaultConfig) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    /// Set the simulated level of `line`.
    pub fn set_level(&self, line: LineId, high: bool) {
        self.levels.write().insert(line, high);
    }

    /// Set several levels at once.
    pub fn set_levels(&self, levels: impl IntoIterator<Item = (LineId, bool)>) {
        let mut map = self.levels.write();
        for (line, high) in levels {
            map.insert(line, high);
        }
    }

    /// Lines currently claimed, sorted by id.
    pub fn claimed(&self) -> Vec<LineId> {
        self.claimed.lock().iter().copied().collect()
    }

    /// Whether `line` is currently claimed.
    pub fn is_claimed(&self, line: LineId) -> bool {
        self.claimed.lock().contains(&line)
    }

    /// Every call recorded so far, oldest first.
    pub fn journal(&self) -> Vec<LineEvent> {
        self.journal.lock().clone()
    }

    /// Only the released lines, in release order.
    pub fn releases(&self) -> Vec<LineId> {
        self.journal
            .lock()
            .iter()
            .filter_map(|e| match e {
                LineEvent::Released(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    /// Fault configuration in use.
    pub fn faults(&self) -> &FaultConfig {
        &self.faults
    }
}

impl LineBackend for MockLineBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn claim_line(&self, line: LineId, direction: Direction) -> Result<(), LineError> {
        if direction != Direction::Input {
            return Err(LineError::Hardware {
                line,
                message: "mock lines are input-only".to_string(),
            });
        }

        self.faults.check(Operation::Claim, line)?;

        let mut claimed = self.claimed.lock();
        if !claimed.insert(line) {
            return Err(LineError::Busy { line });
        }
        self.journal.lock().push(LineEvent::Claimed(line));
        debug!(line = %line, "Mock line claimed");
        Ok(())
    }

    fn release_line(&self, line: LineId) -> Result<(), LineError> {
        self.journal.lock().push(LineEvent::Released(line));

        let was_claimed = self.claimed.lock().remove(&line);
        self.faults.check(Operation::Release, line)?;
        if !was_claimed {
            return Err(LineError::NotClaimed { line });
        }
        debug!(line = %line, "Mock line released");
        Ok(())
    }

    fn read_line(&self, line: LineId) -> Result<bool, LineError> {
        if !self.claimed.lock().contains(&line) {
            return Err(LineError::NotClaimed { line });
        }
        self.faults.check(Operation::Read, line)?;

        let level = self.levels.read().get(&line).copied().unwrap_or(false);
        self.journal.lock().push(LineEvent::Read(line));
        Ok(level)
    }
}
