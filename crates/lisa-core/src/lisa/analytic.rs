//! Local Moran's I with randomization-theory moments (Anselin 1995).
//!
//!   ii_i   = (z_i / m2) · Σ_j w_ij z_j
//!   eii_i  = −W_i / (n − 1)
//!   var_ii = W2_i (n − b2)/(n − 1) + (W_i² − W2_i)(2 b2 − n)/((n − 1)(n − 2)) − eii²
//!
//! with `W_i = Σ_j w_ij`, `W2_i = Σ_j w_ij²` and `b2 = m4 / m2²`.
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::warn;

use crate::graph::NeighborGraph;
use crate::moments::GlobalMoments;
use crate::weights::WeightScheme;

/// Point estimate and analytic significance for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalStatistic {
    pub ii: f64,
    pub eii: Option<f64>,
    pub var_ii: Option<f64>,
    pub z_ii: Option<f64>,
    /// Two-tailed normal p-value of `z_ii`.
    pub p_ii: Option<f64>,
}

impl LocalStatistic {
    /// Isolates carry no information: the statistic is 0 and its moments are
    /// undefined.
    pub const ISOLATE: LocalStatistic = LocalStatistic {
        ii: 0.0,
        eii: None,
        var_ii: None,
        z_ii: None,
        p_ii: None,
    };
}

/// `Σ_j w_ij z_j`: the lag of the mean-centered values at unit `i`.
pub fn centered_lag(i: usize, nb: &NeighborGraph, wt: &WeightScheme, z: &[f64]) -> f64 {
    nb.neighbors(i)
        .iter()
        .zip(wt.row(i))
        .map(|(&j, &w)| w * z[j])
        .sum()
}

/// Local statistic and randomization moments of unit `i`.
///
/// Caller guarantees `g.n ≥ 3` and `g.m2 > 0`.
pub fn local_statistic(
    i: usize,
    nb: &NeighborGraph,
    wt: &WeightScheme,
    g: &GlobalMoments,
) -> LocalStatistic {
    if nb.cardinality(i) == 0 {
        return LocalStatistic::ISOLATE;
    }

    let ii = g.z[i] / g.m2 * centered_lag(i, nb, wt, &g.z);

    let n = g.n as f64;
    let w_i: f64 = wt.row(i).iter().sum();
    let w2_i: f64 = wt.row(i).iter().map(|w| w * w).sum();

    let eii = -w_i / (n - 1.0);
    let var_ii = w2_i * (n - g.b2) / (n - 1.0)
        + (w_i * w_i - w2_i) * (2.0 * g.b2 - n) / ((n - 1.0) * (n - 2.0))
        - eii * eii;

    let (z_ii, p_ii) = if var_ii > 0.0 && var_ii.is_finite() {
        let z = (ii - eii) / var_ii.sqrt();
        (Some(z), Some(two_tailed_p(z)))
    } else {
        warn!(unit = i, var_ii, "non-positive randomization variance; z and p left undefined");
        (None, None)
    };

    LocalStatistic {
        ii,
        eii: Some(eii),
        var_ii: Some(var_ii),
        z_ii,
        p_ii,
    }
}

/// `2 · P(Z > |z|)` for a standard normal `Z`.
fn two_tailed_p(z: f64) -> f64 {
    let normal = Normal::standard();
    (2.0 * normal.sf(z.abs())).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::line_graph;
    use approx::assert_relative_eq;

    #[test]
    fn statistic_on_line_matches_hand_computation() {
        // x = 1..5, mean 3, z = [-2,-1,0,1,2], m2 = 2, b2 = 1.7.
        let nb = line_graph(5);
        let wt = WeightScheme::row_standardized(&nb);
        let g = GlobalMoments::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        // Unit 0: z0 = -2, lag z = -1 → ii = (-2 / 2) · -1 = 1.
        let s0 = local_statistic(0, &nb, &wt, &g);
        assert_relative_eq!(s0.ii, 1.0);
        assert_relative_eq!(s0.eii.unwrap(), -0.25);
        // W = 1, W2 = 1: var = (5 − 1.7)/4 + 0 − 1/16 = 0.825 − 0.0625
        assert_relative_eq!(s0.var_ii.unwrap(), 0.7625, epsilon = 1e-12);
        let z = (1.0 + 0.25) / 0.7625f64.sqrt();
        assert_relative_eq!(s0.z_ii.unwrap(), z, epsilon = 1e-12);

        // Unit 1: z1 = -1, lag z = (-2 + 0)/2 = -1 → ii = 0.5.
        let s1 = local_statistic(1, &nb, &wt, &g);
        assert_relative_eq!(s1.ii, 0.5);
        // W = 1, W2 = 0.5: var = 0.5·3.3/4 + 0.5·(3.4 − 5)/12 − 0.0625
        let expected = 0.5 * 3.3 / 4.0 + 0.5 * (3.4 - 5.0) / 12.0 - 0.0625;
        assert_relative_eq!(s1.var_ii.unwrap(), expected, epsilon = 1e-12);

        // Unit 2 sits at the mean: ii = 0 exactly.
        assert_eq!(local_statistic(2, &nb, &wt, &g).ii, 0.0);
    }

    #[test]
    fn isolate_branch_is_explicit() {
        let nb = NeighborGraph::new(vec![vec![1], vec![0, 2], vec![1], vec![]]).unwrap();
        let wt = WeightScheme::row_standardized(&nb);
        let g = GlobalMoments::from_values(&[1.0, 5.0, 2.0, 8.0]);
        assert_eq!(local_statistic(3, &nb, &wt, &g), LocalStatistic::ISOLATE);
    }

    #[test]
    fn p_value_is_two_tailed() {
        assert_relative_eq!(two_tailed_p(0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(two_tailed_p(1.959963984540054), 0.05, epsilon = 1e-9);
        assert_relative_eq!(two_tailed_p(-1.959963984540054), 0.05, epsilon = 1e-9);
    }
}
