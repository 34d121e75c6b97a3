//! Line acquisition and release.
//!
//! [`LineAcquisition::acquire_all`] claims every line of every signal, in
//! table order, as an input. The first failing claim aborts the attempt and
//! every line claimed so far is released in reverse claim order, across
//! signal boundaries. The acquired set therefore only ever holds all lines of
//! the table or none of them.

use crate::error::AcquisitionError;
use mux_core::{LineBackend, LineId, SignalTable};
use tracing::{debug, error, warn};

/// Set of lines currently held by the device, in claim order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineAcquisition {
    acquired: Vec<LineId>,
}

impl LineAcquisition {
    /// Nothing acquired.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once every line of the table is held.
    pub fn is_up(&self) -> bool {
        !self.acquired.is_empty()
    }

    /// Held lines in claim order.
    pub fn acquired(&self) -> &[LineId] {
        &self.acquired
    }

    /// Claim every line of `table`, rolling back on the first failure.
    ///
    /// Calling this while already up is a no-op.
    pub fn acquire_all(
        &mut self,
        table: &SignalTable,
        backend: &dyn LineBackend,
    ) -> Result<(), AcquisitionError> {
        if self.is_up() {
            debug!(lines = self.acquired.len(), "Lines already acquired");
            return Ok(());
        }

        let mut claimed: Vec<LineId> = Vec::new();

        for (signal, line) in table.all_lines() {
            match backend.claim_line(line.id, line.direction) {
                Ok(()) => {
                    debug!(signal = %signal.name, line = %line, "Claimed line");
                    claimed.push(line.id);
                }
                Err(cause) => {
                    error!(
                        signal = %signal.name,
                        line = %line,
                        error = %cause,
                        "Error requesting line"
                    );
                    let rolled_back = rollback(&claimed, backend);
                    return Err(AcquisitionError {
                        failed_line: line.clone(),
                        signal: signal.name.clone(),
                        rolled_back,
                        cause,
                    });
                }
            }
        }

        self.acquired = claimed;
        Ok(())
    }

    /// Release every held line. Never fails; idempotent.
    pub fn release_all(&mut self, backend: &dyn LineBackend) {
        if self.acquired.is_empty() {
            return;
        }
        let acquired = std::mem::take(&mut self.acquired);
        for &line in acquired.iter().rev() {
            release(line, backend);
        }
    }
}

/// Release `claimed` newest first; returns how many lines were handed back.
fn rollback(claimed: &[LineId], backend: &dyn LineBackend) -> usize {
    if !claimed.is_empty() {
        warn!(lines = claimed.len(), "Rolling back partial acquisition");
    }
    for &line in claimed.iter().rev() {
        release(line, backend);
    }
    claimed.len()
}

fn release(line: LineId, backend: &dyn LineBackend) {
    match backend.release_line(line) {
        Ok(()) => debug!(line = %line, "Released line"),
        Err(e) => warn!(line = %line, error = %e, "Failed to release line"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_core::Signal;
    use mux_driver_mock::{FaultConfig, FaultScenario, MockLineBackend};

    fn six_line_table() -> SignalTable {
        SignalTable::new(vec![
            Signal::from_ids("a", &[1, 2, 3]),
            Signal::from_ids("b", &[4, 5, 6]),
        ])
        .unwrap()
    }

    #[test]
    fn test_acquire_all_claims_in_table_order() {
        let backend = MockLineBackend::new();
        let mut acq = LineAcquisition::new();
        acq.acquire_all(&six_line_table(), &backend).unwrap();

        let expected: Vec<LineId> = (1..=6).map(LineId).collect();
        assert_eq!(acq.acquired(), expected.as_slice());
        assert_eq!(backend.claimed(), expected);
        assert!(acq.is_up());
    }

    #[test]
    fn test_failure_rolls_back_everything() {
        let backend = MockLineBackend::with_faults(FaultConfig::scenario(
            FaultScenario::ClaimBusy { line: LineId(5) },
        ));
        let mut acq = LineAcquisition::new();

        let err = acq.acquire_all(&six_line_table(), &backend).unwrap_err();

        assert_eq!(err.failed_line.id, LineId(5));
        assert_eq!(err.signal, "b");
        assert_eq!(err.rolled_back, 4);
        assert!(err.cause.is_busy());
        assert_eq!(
            backend.releases(),
            vec![LineId(4), LineId(3), LineId(2), LineId(1)]
        );
        assert!(backend.claimed().is_empty());
        assert!(!acq.is_up());
    }

    #[test]
    fn test_first_line_failure_releases_nothing() {
        let backend = MockLineBackend::with_faults(FaultConfig::scenario(
            FaultScenario::ClaimBusy { line: LineId(1) },
        ));
        let mut acq = LineAcquisition::new();
        let err = acq.acquire_all(&six_line_table(), &backend).unwrap_err();
        assert_eq!(err.rolled_back, 0);
        assert!(backend.journal().is_empty());
    }

    #[test]
    fn test_release_all_reverse_order_and_idempotent() {
        let backend = MockLineBackend::new();
        let mut acq = LineAcquisition::new();
        acq.acquire_all(&six_line_table(), &backend).unwrap();
        backend.clear_journal();

        acq.release_all(&backend);
        acq.release_all(&backend);

        let expected: Vec<LineId> = (1..=6).rev().map(LineId).collect();
        assert_eq!(backend.releases(), expected);
        assert!(acq.acquired().is_empty());
    }

    #[test]
    fn test_acquire_twice_is_noop() {
        let backend = MockLineBackend::new();
        let mut acq = LineAcquisition::new();
        acq.acquire_all(&six_line_table(), &backend).unwrap();
        acq.acquire_all(&six_line_table(), &backend).unwrap();
        assert_eq!(acq.acquired().len(), 6);
    }
}
