//! Error types for LISA computations.

use thiserror::Error;

/// Every failure the core can report. All variants are raised before any
/// per-unit result is produced, so a failed call never yields partial output.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LisaError {
    /// Two parallel inputs disagree in length. `unit` is set when the
    /// mismatch is local to one unit's weight row.
    #[error("shape mismatch in {what}: expected {expected}, got {actual}{}", fmt_unit(.unit))]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
        unit: Option<usize>,
    },

    /// Units with an empty neighbor set, reported while `allow_zero` is off.
    #[error("units without neighbors: {units:?} (set allow_zero to assign 0)")]
    NoNeighbors { units: Vec<usize> },

    /// Units whose computation would read a missing (NaN) value.
    #[error("missing values affect units: {units:?}")]
    MissingValue { units: Vec<usize> },

    /// Bad parameters: simulation count, cutoff, unknown reducer/convention name.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The neighbor lists break the graph invariants (self loop, duplicate,
    /// out-of-range index).
    #[error("invalid neighbor graph at unit {unit}: {reason}")]
    InvalidNeighborGraph { unit: usize, reason: String },

    /// All values are identical, so the local statistic is 0/0.
    #[error("values have zero variance; local Moran's I is undefined")]
    ZeroVariance,
}

fn fmt_unit(unit: &Option<usize>) -> String {
    match unit {
        Some(u) => format!(" at unit {u}"),
        None => String::new(),
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LisaError>;
