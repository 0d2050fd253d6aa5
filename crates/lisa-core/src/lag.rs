//! Spatial lag and neighbor-based imputation.
//!
//! The lag of unit `i` is a reducer applied to the values of its neighbors,
//! optionally weighted by the matching row of a [`WeightScheme`]. Missing
//! values are NaN throughout.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LisaError, Result};
use crate::graph::NeighborGraph;
use crate::moments;
use crate::weights::WeightScheme;

/// Aggregate applied to a unit's neighbor values.
///
/// `Mean` and `Sum` use the weights when a scheme is supplied; the order
/// statistics ignore them. `Custom` receives the present neighbor values and,
/// when available, their weights.
#[derive(Clone, Copy, Default)]
pub enum Reducer {
    /// `Σ w x / Σ w`, or the arithmetic mean without weights.
    #[default]
    Mean,
    /// `Σ w x`, or the plain sum without weights.
    Sum,
    Median,
    Min,
    Max,
    Custom(fn(&[f64], Option<&[f64]>) -> f64),
}

impl Reducer {
    /// Apply to non-empty, NaN-free `values`. `weights` is parallel to `values`.
    pub fn apply(&self, values: &[f64], weights: Option<&[f64]>) -> f64 {
        match self {
            Reducer::Mean => match weights {
                Some(w) => {
                    let w_sum: f64 = w.iter().sum();
                    weighted_sum(values, w) / w_sum
                }
                None => moments::mean(values),
            },
            Reducer::Sum => match weights {
                Some(w) => weighted_sum(values, w),
                None => values.iter().sum(),
            },
            Reducer::Median => moments::median(values),
            Reducer::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Reducer::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reducer::Custom(f) => f(values, weights),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Reducer::Mean => "mean",
            Reducer::Sum => "sum",
            Reducer::Median => "median",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Reducer {
    type Err = LisaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Reducer::Mean),
            "sum" => Ok(Reducer::Sum),
            "median" => Ok(Reducer::Median),
            "min" => Ok(Reducer::Min),
            "max" => Ok(Reducer::Max),
            other => Err(LisaError::InvalidConfiguration(format!("unknown reducer {other:?}"))),
        }
    }
}

fn weighted_sum(values: &[f64], weights: &[f64]) -> f64 {
    values.iter().zip(weights).map(|(v, w)| v * w).sum()
}

/// Missing-value and zero-neighbor policy for lag computations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LagPolicy {
    /// Skip missing neighbor values instead of failing.
    pub na_okay: bool,
    /// Assign 0 to isolates instead of failing.
    pub allow_zero: bool,
}

// ── Validation ───────────────────────────────────────────────────────────────

pub(crate) fn check_lengths(x: &[f64], nb: &NeighborGraph, wt: Option<&WeightScheme>) -> Result<()> {
    if x.len() != nb.len() {
        return Err(LisaError::ShapeMismatch {
            what: "value vector",
            expected: nb.len(),
            actual: x.len(),
            unit: None,
        });
    }
    if let Some(wt) = wt {
        wt.check_against(nb)?;
    }
    Ok(())
}

/// Eagerly reject every unit in `units` the policy cannot handle: isolates
/// first, then units that would read a missing neighbor value.
fn check_units(x: &[f64], nb: &NeighborGraph, units: &[usize], policy: LagPolicy) -> Result<()> {
    if !policy.allow_zero {
        let isolates: Vec<usize> =
            units.iter().copied().filter(|&i| nb.cardinality(i) == 0).collect();
        if !isolates.is_empty() {
            return Err(LisaError::NoNeighbors { units: isolates });
        }
    }
    if !policy.na_okay {
        let affected: Vec<usize> = units
            .iter()
            .copied()
            .filter(|&i| nb.neighbors(i).iter().any(|&j| x[j].is_nan()))
            .collect();
        if !affected.is_empty() {
            return Err(LisaError::MissingValue { units: affected });
        }
    }
    Ok(())
}

/// Lag of a single, already validated unit.
fn lag_at(x: &[f64], nb: &NeighborGraph, wt: Option<&WeightScheme>, reducer: &Reducer, i: usize) -> f64 {
    let neighbors = nb.neighbors(i);
    if neighbors.is_empty() {
        return 0.0;
    }

    let mut values = Vec::with_capacity(neighbors.len());
    let mut weights = wt.map(|_| Vec::with_capacity(neighbors.len()));
    for (slot, &j) in neighbors.iter().enumerate() {
        let v = x[j];
        if v.is_nan() {
            continue;
        }
        values.push(v);
        if let (Some(ws), Some(wt)) = (weights.as_mut(), wt) {
            ws.push(wt.row(i)[slot]);
        }
    }

    if values.is_empty() {
        return f64::NAN;
    }
    reducer.apply(&values, weights.as_deref())
}

// ── Public operations ────────────────────────────────────────────────────────

/// Compute the spatial lag of `x` for every unit.
///
/// Isolates yield 0 when `policy.allow_zero` is set and fail with
/// `NoNeighbors` otherwise. Missing neighbor values fail with `MissingValue`
/// unless `policy.na_okay` is set, in which case they are skipped and a unit
/// whose neighbors are all missing gets NaN.
pub fn spatial_lag(
    x: &[f64],
    nb: &NeighborGraph,
    wt: Option<&WeightScheme>,
    reducer: &Reducer,
    policy: LagPolicy,
) -> Result<Vec<f64>> {
    check_lengths(x, nb, wt)?;
    let units: Vec<usize> = (0..nb.len()).collect();
    check_units(x, nb, &units, policy)?;

    debug!(n = nb.len(), reducer = ?reducer, weighted = wt.is_some(), "computing spatial lag");
    Ok(units.into_iter().map(|i| lag_at(x, nb, wt, reducer, i)).collect())
}

/// Fill the missing entries of `x` with the unweighted neighbor aggregate.
/// Present entries are returned unchanged.
pub fn impute_missing(
    x: &[f64],
    nb: &NeighborGraph,
    reducer: &Reducer,
    policy: LagPolicy,
) -> Result<Vec<f64>> {
    impute_missing_weighted(x, nb, None, reducer, policy)
}

/// Weighted form of [`impute_missing`].
///
/// Only the missing positions are lagged and validated; an isolate or a
/// missing neighbor next to an observed unit is irrelevant because that
/// unit's lag would be discarded.
pub fn impute_missing_weighted(
    x: &[f64],
    nb: &NeighborGraph,
    wt: Option<&WeightScheme>,
    reducer: &Reducer,
    policy: LagPolicy,
) -> Result<Vec<f64>> {
    check_lengths(x, nb, wt)?;
    let missing: Vec<usize> = (0..x.len()).filter(|&i| x[i].is_nan()).collect();
    if missing.is_empty() {
        return Ok(x.to_vec());
    }
    check_units(x, nb, &missing, policy)?;

    let mut out = x.to_vec();
    for &i in &missing {
        out[i] = lag_at(x, nb, wt, reducer, i);
    }

    let unfilled = missing.iter().filter(|&&i| out[i].is_nan()).count();
    if unfilled > 0 {
        warn!(unfilled, "some missing values have no observed neighbors and stay missing");
    }
    debug!(filled = missing.len() - unfilled, "imputed missing values from neighbors");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::line_graph;
    use crate::weights::WeightStyle;
    use approx::assert_relative_eq;

    fn isolate_graph() -> NeighborGraph {
        NeighborGraph::new(vec![vec![1], vec![0], vec![]]).unwrap()
    }

    #[test]
    fn line_imputation_fills_with_neighbor_mean() {
        let nb = line_graph(5);
        let wt = WeightScheme::row_standardized(&nb);
        let x = [1.0, 2.0, f64::NAN, 4.0, 5.0];

        let out = impute_missing(&x, &nb, &Reducer::Mean, LagPolicy::default()).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        let out = impute_missing_weighted(&x, &nb, Some(&wt), &Reducer::Mean, LagPolicy::default())
            .unwrap();
        assert_eq!(out[2], 3.0);
    }

    #[test]
    fn lag_mean_on_line() {
        let nb = line_graph(5);
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let lag = spatial_lag(&x, &nb, None, &Reducer::Mean, LagPolicy::default()).unwrap();
        assert_eq!(lag, vec![2.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn weighted_mean_renormalizes_weights() {
        let nb = line_graph(3);
        let wt = WeightScheme::new(
            &nb,
            vec![vec![2.0], vec![1.0, 3.0], vec![5.0]],
            WeightStyle::Custom,
        )
        .unwrap();
        let x = [10.0, 0.0, 20.0];
        let mean = spatial_lag(&x, &nb, Some(&wt), &Reducer::Mean, LagPolicy::default()).unwrap();
        assert_relative_eq!(mean[1], (10.0 + 60.0) / 4.0);

        let sum = spatial_lag(&x, &nb, Some(&wt), &Reducer::Sum, LagPolicy::default()).unwrap();
        assert_relative_eq!(sum[1], 70.0);
        assert_relative_eq!(sum[0], 0.0);
    }

    #[test]
    fn isolate_fails_unless_allow_zero() {
        let nb = isolate_graph();
        let x = [1.0, 2.0, 3.0];
        let err = spatial_lag(&x, &nb, None, &Reducer::Mean, LagPolicy::default()).unwrap_err();
        assert_eq!(err, LisaError::NoNeighbors { units: vec![2] });

        let policy = LagPolicy { allow_zero: true, ..Default::default() };
        let lag = spatial_lag(&x, &nb, None, &Reducer::Mean, policy).unwrap();
        assert_eq!(lag, vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn missing_neighbor_fails_unless_na_okay() {
        let nb = line_graph(4);
        let x = [1.0, f64::NAN, 3.0, 5.0];
        let err = spatial_lag(&x, &nb, None, &Reducer::Mean, LagPolicy::default()).unwrap_err();
        assert_eq!(err, LisaError::MissingValue { units: vec![0, 2] });

        let policy = LagPolicy { na_okay: true, ..Default::default() };
        let lag = spatial_lag(&x, &nb, None, &Reducer::Mean, policy).unwrap();
        assert!(lag[0].is_nan(), "all neighbors of unit 0 are missing");
        assert_eq!(lag[2], 5.0);
        assert_eq!(lag[3], 3.0);
    }

    #[test]
    fn imputation_keeps_unit_missing_when_all_neighbors_missing() {
        let nb = line_graph(3);
        let x = [f64::NAN, f64::NAN, 4.0];
        let policy = LagPolicy { na_okay: true, ..Default::default() };
        let out = impute_missing(&x, &nb, &Reducer::Mean, policy).unwrap();
        assert!(out[0].is_nan());
        assert_eq!(out[1], 4.0);
        assert_eq!(out[2], 4.0);
    }

    #[test]
    fn imputation_ignores_isolates_that_are_observed() {
        let nb = isolate_graph();
        let x = [f64::NAN, 2.0, 3.0];
        let out = impute_missing(&x, &nb, &Reducer::Mean, LagPolicy::default()).unwrap();
        assert_eq!(out, vec![2.0, 2.0, 3.0]);
    }

    #[test]
    fn imputation_of_missing_isolate_respects_allow_zero() {
        let nb = isolate_graph();
        let x = [1.0, 2.0, f64::NAN];
        let err = impute_missing(&x, &nb, &Reducer::Mean, LagPolicy::default()).unwrap_err();
        assert_eq!(err, LisaError::NoNeighbors { units: vec![2] });
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let nb = line_graph(3);
        let err = spatial_lag(&[1.0, 2.0], &nb, None, &Reducer::Mean, LagPolicy::default())
            .unwrap_err();
        assert!(matches!(err, LisaError::ShapeMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn reducers_parse_by_name() {
        assert!(matches!("Median".parse::<Reducer>(), Ok(Reducer::Median)));
        assert!(matches!(" max ".parse::<Reducer>(), Ok(Reducer::Max)));
        assert!(matches!(
            "geometric".parse::<Reducer>(),
            Err(LisaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn custom_reducer_receives_present_values() {
        fn count(values: &[f64], _w: Option<&[f64]>) -> f64 {
            values.len() as f64
        }
        let nb = line_graph(3);
        let x = [f64::NAN, 1.0, 2.0];
        let policy = LagPolicy { na_okay: true, ..Default::default() };
        let lag = spatial_lag(&x, &nb, None, &Reducer::Custom(count), policy).unwrap();
        assert_eq!(lag, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn median_min_max_reducers() {
        let nb = NeighborGraph::new(vec![vec![1, 2, 3], vec![0], vec![0], vec![0]]).unwrap();
        let x = [0.0, 9.0, 1.0, 4.0];
        let p = LagPolicy::default();
        assert_eq!(spatial_lag(&x, &nb, None, &Reducer::Median, p).unwrap()[0], 4.0);
        assert_eq!(spatial_lag(&x, &nb, None, &Reducer::Min, p).unwrap()[0], 1.0);
        assert_eq!(spatial_lag(&x, &nb, None, &Reducer::Max, p).unwrap()[0], 9.0);
    }
}
