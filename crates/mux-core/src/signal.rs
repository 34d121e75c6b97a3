//! Signals and the signal table.
//!
//! A [`Signal`] is a named, ordered group of input lines sampled together.
//! Line order is significant: the first line is the most significant bit of
//! the encoded sample. The [`SignalTable`] is fixed configuration; it is
//! validated once and never mutated afterwards.

use crate::error::TableError;
use crate::line::{LineDescriptor, LineId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Maximum number of lines in one signal (size of the sampling staging buffer).
pub const MAX_LINES: usize = 32;

/// A named group of hardware input lines sampled as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal {
    /// Signal identifier
    pub name: String,
    /// Lines in bit order, most significant first
    pub lines: Vec<LineDescriptor>,
}

impl Signal {
    /// Signal named `name` over the given GPIO numbers, labelled `<name>.b<i>`.
    pub fn from_ids(name: impl Into<String>, ids: &[u32]) -> Self {
        let name = name.into();
        let lines = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| LineDescriptor::input(id, format!("{}.b{}", name, i)))
            .collect();
        Self { name, lines }
    }

    /// Number of lines, which is also the width of an encoded sample.
    pub fn width(&self) -> usize {
        self.lines.len()
    }

    /// Line identifiers in bit order.
    pub fn line_ids(&self) -> impl Iterator<Item = LineId> + '_ {
        self.lines.iter().map(|l| l.id)
    }
}

/// The validated, immutable set of signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SignalTable {
    signals: Vec<Signal>,
}

impl SignalTable {
    /// Build a table, rejecting anything the multiplexer cannot serve.
    ///
    /// Requirements: at least two signals, unique names, every signal has
    /// between 1 and [`MAX_LINES`] lines, and no line belongs to two signals.
    pub fn new(signals: Vec<Signal>) -> Result<Self, TableError> {
        if signals.len() < 2 {
            return Err(TableError::TooFewSignals {
                found: signals.len(),
            });
        }

        let mut names: HashSet<&str> = HashSet::new();
        let mut owners: HashMap<LineId, &str> = HashMap::new();

        for signal in &signals {
            if !names.insert(signal.name.as_str()) {
                return Err(TableError::DuplicateSignal {
                    signal: signal.name.clone(),
                });
            }
            if signal.lines.is_empty() {
                return Err(TableError::EmptySignal {
                    signal: signal.name.clone(),
                });
            }
            if signal.lines.len() > MAX_LINES {
                return Err(TableError::TooManyLines {
                    signal: signal.name.clone(),
                    count: signal.lines.len(),
                    max: MAX_LINES,
                });
            }
            for id in signal.line_ids() {
                if let Some(first) = owners.insert(id, signal.name.as_str()) {
                    return Err(TableError::DuplicateLine {
                        line: id,
                        first: first.to_string(),
                        second: signal.name.clone(),
                    });
                }
            }
        }

        Ok(Self { signals })
    }

    /// The compiled-in table: two signals of four input lines each.
    ///
    /// | signal | lines (MSB first)  |
    /// |--------|--------------------|
    /// | `s1`   | GPIO 17, 18, 27, 22 |
    /// | `s2`   | GPIO 23, 24, 25, 4  |
    pub fn builtin() -> Self {
        Self {
            signals: vec![
                Signal::from_ids("s1", &[17, 18, 27, 22]),
                Signal::from_ids("s2", &[23, 24, 25, 4]),
            ],
        }
    }

    /// Number of signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Always false for a validated table; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Signal at `index`.
    pub fn get(&self, index: usize) -> Option<&Signal> {
        self.signals.get(index)
    }

    /// All signals in declaration order.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Every line of every signal, in table order (acquisition order).
    pub fn all_lines(&self) -> impl Iterator<Item = (&Signal, &LineDescriptor)> + '_ {
        self.signals
            .iter()
            .flat_map(|s| s.lines.iter().map(move |l| (s, l)))
    }

    /// Whether `line` belongs to any signal.
    pub fn contains_line(&self, line: LineId) -> bool {
        self.all_lines().any(|(_, l)| l.id == line)
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::builtin()
    }
}
