//! Hardware line descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier of a single hardware line (a GPIO number on Linux).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub u32);

impl LineId {
    /// Raw platform number.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpio{}", self.0)
    }
}

impl From<u32> for LineId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Direction a line is claimed with.
///
/// The multiplexer only ever samples, so every descriptor it builds is
/// [`Direction::Input`]; the enum exists so backends can reject anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sampled line
    #[default]
    Input,
    /// Driven line
    Output,
}

impl Direction {
    /// Value written to a sysfs `direction` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "in",
            Direction::Output => "out",
        }
    }
}

/// One physical input line. Immutable once defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDescriptor {
    /// Hardware line identifier
    pub id: LineId,
    /// Human-readable label, used in diagnostics only
    pub label: String,
    /// Claim direction
    pub direction: Direction,
}

impl LineDescriptor {
    /// Input line with the given id and label.
    pub fn input(id: impl Into<LineId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            direction: Direction::Input,
        }
    }
}

impl fmt::Display for LineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.label)
    }
}
