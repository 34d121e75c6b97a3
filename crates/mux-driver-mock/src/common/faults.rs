//! Fault injection for the mock line backend.
//!
//! Enables configurable claim/release/read failures for testing the
//! acquisition rollback and error paths of the multiplexer.

use mux_core::{LineError, LineId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Backend operation a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `claim_line`
    Claim,
    /// `release_line`
    Release,
    /// `read_line`
    Read,
}

/// A single failure scenario.
#[derive(Debug, Clone)]
pub enum FaultScenario {
    /// Every claim of `line` fails as busy
    ClaimBusy { line: LineId },
    /// Fail `operation` on `line` with a hardware error
    Hardware {
        operation: Operation,
        line: LineId,
    },
    /// Fail `operation` (any line) after `count` successful calls
    FailAfterN { operation: Operation, count: u32 },
}

/// Fault injection configuration, cheap to clone and share.
#[derive(Clone, Debug, Default)]
pub struct FaultConfig {
    scenarios: Arc<Vec<FaultScenario>>,
    /// Successful-call counters for `FailAfterN`
    counts: Arc<Mutex<HashMap<Operation, u32>>>,
}

impl FaultConfig {
    /// No faults.
    pub fn none() -> Self {
        Self::default()
    }

    /// A single scenario.
    pub fn scenario(scenario: FaultScenario) -> Self {
        Self::scenarios(vec![scenario])
    }

    /// Several scenarios, checked in order.
    pub fn scenarios(scenarios: Vec<FaultScenario>) -> Self {
        Self {
            scenarios: Arc::new(scenarios),
            counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Decide whether `operation` on `line` fails.
    pub fn check(&self, operation: Operation, line: LineId) -> Result<(), LineError> {
        let mut counts = self.counts.lock();

        for scenario in self.scenarios.iter() {
            match scenario {
                FaultScenario::ClaimBusy { line: l }
                    if operation == Operation::Claim && *l == line =>
                {
                    return Err(LineError::Busy { line });
                }
                FaultScenario::Hardware {
                    operation: op,
                    line: l,
                } if *op == operation && *l == line => {
                    return Err(LineError::Hardware {
                        line,
                        message: format!("injected {:?} fault", operation),
                    });
                }
                FaultScenario::FailAfterN {
                    operation: op,
                    count,
                } if *op == operation => {
                    let seen = counts.entry(operation).or_insert(0);
                    if *seen >= *count {
                        return Err(LineError::Hardware {
                            line,
                            message: format!("{:?} failed after {} calls", operation, count),
                        });
                    }
                    *seen += 1;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Clear `FailAfterN` counters.
    pub fn reset(&self) {
        self.counts.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_faults() {
        let config = FaultConfig::none();
        for id in 0..50 {
            assert!(config.check(Operation::Claim, LineId(id)).is_ok());
        }
    }

    #[test]
    fn test_claim_busy_only_hits_its_line() {
        let config = FaultConfig::scenario(FaultScenario::ClaimBusy { line: LineId(27) });
        assert!(config.check(Operation::Claim, LineId(17)).is_ok());
        assert!(config.check(Operation::Claim, LineId(27)).unwrap_err().is_busy());
        assert!(config.check(Operation::Read, LineId(27)).is_ok());
    }

    #[test]
    fn test_fail_after_n_and_reset() {
        let config = FaultConfig::scenario(FaultScenario::FailAfterN {
            operation: Operation::Claim,
            count: 2,
        });

        assert!(config.check(Operation::Claim, LineId(1)).is_ok());
        assert!(config.check(Operation::Claim, LineId(2)).is_ok());
        assert!(config.check(Operation::Claim, LineId(3)).is_err());

        config.reset();
        assert!(config.check(Operation::Claim, LineId(3)).is_ok());
    }

    #[test]
    fn test_hardware_fault_message() {
        let config = FaultConfig::scenario(FaultScenario::Hardware {
            operation: Operation::Read,
            line: LineId(4),
        });
        let err = config.check(Operation::Read, LineId(4)).unwrap_err();
        assert!(err.to_string().contains("injected Read fault"));
    }
}
