//! LISA cluster labels under three centering conventions.
//!
//! Each convention is its own function over [`QuadrantInputs`]. They share
//! the quadrant table and the significance gate but nothing else:
//!
//! - **mean**: `x − mean(x)` against `lag − mean(lag)`
//! - **median**: `x − median(x)` against `lag − median(lag)`
//! - **pysal**: `z = x − mean(x)` against `Σ_j w_ij z_j`, i.e. the lag is
//!   referenced to `x`'s mean carried through the weights rather than to the
//!   lag vector's own mean.
//!
//! A deviation of exactly zero counts as positive.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LisaError, Result};
use crate::moments;

/// Cluster category of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterLabel {
    #[serde(rename = "High-High")]
    HighHigh,
    #[serde(rename = "Low-High")]
    LowHigh,
    #[serde(rename = "Low-Low")]
    LowLow,
    #[serde(rename = "High-Low")]
    HighLow,
    #[serde(rename = "Not-Significant")]
    NotSignificant,
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClusterLabel::HighHigh => "High-High",
            ClusterLabel::LowHigh => "Low-High",
            ClusterLabel::LowLow => "Low-Low",
            ClusterLabel::HighLow => "High-Low",
            ClusterLabel::NotSignificant => "Not-Significant",
        })
    }
}

/// Everything a classifier may look at. All slices have one entry per unit.
#[derive(Debug, Clone, Copy)]
pub struct QuadrantInputs<'a> {
    /// Observed values.
    pub values: &'a [f64],
    /// Weighted-sum lag of `values`.
    pub lag: &'a [f64],
    /// Weighted-sum lag of the mean-centered values.
    pub centered_lag: &'a [f64],
    /// Per-unit p-value; `None` means not testable.
    pub significance: &'a [Option<f64>],
    pub cutoff: f64,
}

/// Common signature of the three conventions.
pub type Classifier = fn(&QuadrantInputs<'_>) -> Vec<ClusterLabel>;

fn quadrant(dx: f64, dlag: f64) -> ClusterLabel {
    match (dx >= 0.0, dlag >= 0.0) {
        (true, true) => ClusterLabel::HighHigh,
        (false, false) => ClusterLabel::LowLow,
        (true, false) => ClusterLabel::HighLow,
        (false, true) => ClusterLabel::LowHigh,
    }
}

fn gate(label: ClusterLabel, p: Option<f64>, cutoff: f64) -> ClusterLabel {
    match p {
        Some(p) if p <= cutoff => label,
        _ => ClusterLabel::NotSignificant,
    }
}

/// Mean-centered quadrants.
pub fn classify_mean(inputs: &QuadrantInputs<'_>) -> Vec<ClusterLabel> {
    let x_centre = moments::mean(inputs.values);
    let lag_centre = moments::mean(inputs.lag);
    inputs
        .values
        .iter()
        .zip(inputs.lag)
        .zip(inputs.significance)
        .map(|((&x, &l), &p)| gate(quadrant(x - x_centre, l - lag_centre), p, inputs.cutoff))
        .collect()
}

/// Median-centered quadrants.
pub fn classify_median(inputs: &QuadrantInputs<'_>) -> Vec<ClusterLabel> {
    let x_centre = moments::median(inputs.values);
    let lag_centre = moments::median(inputs.lag);
    inputs
        .values
        .iter()
        .zip(inputs.lag)
        .zip(inputs.significance)
        .map(|((&x, &l), &p)| gate(quadrant(x - x_centre, l - lag_centre), p, inputs.cutoff))
        .collect()
}

/// Quadrants of `z` against the lag of `z`.
pub fn classify_pysal(inputs: &QuadrantInputs<'_>) -> Vec<ClusterLabel> {
    let x_mean = moments::mean(inputs.values);
    inputs
        .values
        .iter()
        .zip(inputs.centered_lag)
        .zip(inputs.significance)
        .map(|((&x, &lz), &p)| gate(quadrant(x - x_mean, lz), p, inputs.cutoff))
        .collect()
}

/// Named access to the three conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterConvention {
    Mean,
    Median,
    Pysal,
}

impl ClusterConvention {
    pub const ALL: [ClusterConvention; 3] =
        [ClusterConvention::Mean, ClusterConvention::Median, ClusterConvention::Pysal];

    pub fn classifier(self) -> Classifier {
        match self {
            ClusterConvention::Mean => classify_mean,
            ClusterConvention::Median => classify_median,
            ClusterConvention::Pysal => classify_pysal,
        }
    }
}

impl FromStr for ClusterConvention {
    type Err = LisaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(ClusterConvention::Mean),
            "median" => Ok(ClusterConvention::Median),
            "pysal" => Ok(ClusterConvention::Pysal),
            other => Err(LisaError::InvalidConfiguration(format!(
                "unknown cluster convention {other:?}"
            ))),
        }
    }
}
