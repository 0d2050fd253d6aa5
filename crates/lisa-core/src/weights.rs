//! Edge weights parallel to a [`NeighborGraph`].
//!
//! Weights are produced by an external builder; this module only validates
//! them against the graph and offers the two adjacency-only schemes
//! (binary and row-standardized) that need nothing beyond the graph itself.
use serde::{Deserialize, Serialize};

use crate::error::{LisaError, Result};
use crate::graph::NeighborGraph;

/// Tolerance for the row-standardized sum check.
const ROW_SUM_TOLERANCE: f64 = 1e-8;

/// Declared normalization policy of a weight scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightStyle {
    /// Every edge weighs 1.
    Binary,
    /// Each non-isolate row sums to 1.
    RowStandardized,
    /// Anything else (kernel, inverse distance, ...). No row constraint.
    Custom,
}

/// One weight per (unit, neighbor) edge, positionally aligned with the graph.
///
/// Deserialization runs the graph-free part of [`WeightScheme::new`]
/// (finiteness and row sums); alignment with a graph is checked when the
/// scheme is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightSchemeRaw")]
pub struct WeightScheme {
    weights: Vec<Vec<f64>>,
    style: WeightStyle,
}

#[derive(Deserialize)]
struct WeightSchemeRaw {
    weights: Vec<Vec<f64>>,
    style: WeightStyle,
}

impl TryFrom<WeightSchemeRaw> for WeightScheme {
    type Error = LisaError;

    fn try_from(raw: WeightSchemeRaw) -> Result<Self> {
        check_rows(&raw.weights, raw.style)?;
        Ok(Self { weights: raw.weights, style: raw.style })
    }
}

/// Every weight finite; every non-empty row-standardized row sums to 1.
fn check_rows(weights: &[Vec<f64>], style: WeightStyle) -> Result<()> {
    for (i, row) in weights.iter().enumerate() {
        if row.iter().any(|w| !w.is_finite()) {
            return Err(LisaError::InvalidConfiguration(format!(
                "unit {i} has a non-finite weight"
            )));
        }
        if style == WeightStyle::RowStandardized && !row.is_empty() {
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(LisaError::InvalidConfiguration(format!(
                    "row-standardized weights of unit {i} sum to {sum}"
                )));
            }
        }
    }
    Ok(())
}

impl WeightScheme {
    /// Wrap externally built weights, checking them against `nb`.
    ///
    /// Fails with `ShapeMismatch` when the number of rows or any row length
    /// disagrees with the graph, and with `InvalidConfiguration` when a
    /// row-standardized row does not sum to 1 or a weight is not finite.
    pub fn new(nb: &NeighborGraph, weights: Vec<Vec<f64>>, style: WeightStyle) -> Result<Self> {
        let scheme = Self { weights, style };
        scheme.check_against(nb)?;
        check_rows(&scheme.weights, scheme.style)?;
        Ok(scheme)
    }

    /// Every edge weighs 1.
    pub fn binary(nb: &NeighborGraph) -> Self {
        let weights = nb.iter().map(|row| vec![1.0; row.len()]).collect();
        Self { weights, style: WeightStyle::Binary }
    }

    /// Each edge of unit `i` weighs `1 / |N(i)|`; isolates get an empty row.
    pub fn row_standardized(nb: &NeighborGraph) -> Self {
        let weights = nb
            .iter()
            .map(|row| {
                let k = row.len();
                vec![1.0 / k as f64; k]
            })
            .collect();
        Self { weights, style: WeightStyle::RowStandardized }
    }

    #[inline]
    pub fn style(&self) -> WeightStyle {
        self.style
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weights of unit `i`, aligned with `nb.neighbors(i)`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.weights[i]
    }

    /// `Σ_j w_ij` for unit `i`.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.weights[i].iter().sum()
    }

    /// Confirm this scheme still lines up with `nb` (row count and lengths).
    pub(crate) fn check_against(&self, nb: &NeighborGraph) -> Result<()> {
        if self.weights.len() != nb.len() {
            return Err(LisaError::ShapeMismatch {
                what: "weight scheme rows",
                expected: nb.len(),
                actual: self.weights.len(),
                unit: None,
            });
        }
        for (i, row) in self.weights.iter().enumerate() {
            if row.len() != nb.cardinality(i) {
                return Err(LisaError::ShapeMismatch {
                    what: "weight row",
                    expected: nb.cardinality(i),
                    actual: row.len(),
                    unit: Some(i),
                });
            }
        }
        Ok(())
    }
}
