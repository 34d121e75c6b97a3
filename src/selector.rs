//! Active-signal state machine.
//!
//! One state per declared signal. Every write to the stream calls
//! [`SignalSelector::toggle`], which advances cyclically:
//! `active = (active + 1) % count`. [`SignalSelector::select`] jumps straight
//! to an index and is only reachable through the control API, never through a
//! stream write.

use crate::error::SelectError;

/// Index of the active signal within the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSelector {
    active: usize,
    count: usize,
}

impl SignalSelector {
    /// Selector over `count` signals, starting at index 0.
    ///
    /// `count` is at least 2 for any validated table; a zero count is
    /// clamped to 1 so the modulus stays defined.
    pub fn new(count: usize) -> Self {
        Self {
            active: 0,
            count: count.max(1),
        }
    }

    /// Currently active index.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Number of states.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Advance to the next signal and return the new index.
    pub fn toggle(&mut self) -> usize {
        self.active = (self.active + 1) % self.count;
        self.active
    }

    /// Make `index` the active signal.
    pub fn select(&mut self, index: usize) -> Result<usize, SelectError> {
        if index >= self.count {
            return Err(SelectError::OutOfRange {
                index,
                count: self.count,
            });
        }
        self.active = index;
        Ok(index)
    }
}
