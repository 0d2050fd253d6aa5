//! Local Moran's I pipeline: analytic statistic, permutation inference and
//! cluster labels, assembled into one record per unit.

pub mod analytic;
pub mod cluster;
pub mod permutation;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LisaError, Result};
use crate::graph::NeighborGraph;
use crate::lag::{check_lengths, spatial_lag, LagPolicy, Reducer};
use crate::moments::GlobalMoments;
use crate::weights::WeightScheme;

pub use analytic::{centered_lag, local_statistic, LocalStatistic};
pub use cluster::{
    classify_mean, classify_median, classify_pysal, Classifier, ClusterConvention, ClusterLabel,
    QuadrantInputs,
};
pub use permutation::SimulationResult;

/// Which p-value gates the cluster labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceSource {
    /// `p_ii_sim`.
    #[default]
    Simulated,
    /// `p_folded_sim`.
    Folded,
    /// `p_ii`.
    Analytic,
}

/// Parameters of a `local_moran` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoranConfig {
    /// Permutations per unit, at least 1.
    pub simulations: usize,
    /// Root seed of the per-unit RNG sub-streams. `None` draws one per call.
    pub seed: Option<u64>,
    /// Accept isolates (statistic 0, everything else undefined).
    pub allow_zero: bool,
    /// Significance cutoff in `(0, 1]`.
    pub cutoff: f64,
    pub significance: SignificanceSource,
    /// Units handed to the permutation workers per batch.
    pub chunk_size: usize,
}

impl Default for MoranConfig {
    fn default() -> Self {
        Self {
            simulations: 499,
            seed: None,
            allow_zero: false,
            cutoff: 0.05,
            significance: SignificanceSource::Simulated,
            chunk_size: 4096,
        }
    }
}

impl MoranConfig {
    pub fn validate(&self) -> Result<()> {
        if self.simulations < 1 {
            return Err(LisaError::InvalidConfiguration(
                "number of simulations must be at least 1".into(),
            ));
        }
        if !(self.cutoff > 0.0 && self.cutoff <= 1.0) {
            return Err(LisaError::InvalidConfiguration(format!(
                "cutoff must lie in (0, 1], got {}",
                self.cutoff
            )));
        }
        if self.chunk_size < 1 {
            return Err(LisaError::InvalidConfiguration("chunk_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Full per-unit output of [`local_moran`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMoranRecord {
    pub ii: f64,
    pub eii: Option<f64>,
    pub var_ii: Option<f64>,
    pub z_ii: Option<f64>,
    pub p_ii: Option<f64>,
    pub p_ii_sim: Option<f64>,
    pub p_folded_sim: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    pub mean_label: ClusterLabel,
    pub median_label: ClusterLabel,
    pub pysal_label: ClusterLabel,
}

/// Compute local Moran's I for every unit.
///
/// `x` must be fully observed (impute first). Pipeline:
///   1. validation: config, shapes, missing values, isolates
///   2. global moments, computed once
///   3. analytic statistic per unit
///   4. conditional permutation per unit
///   5. three cluster conventions
pub fn local_moran(
    x: &[f64],
    nb: &NeighborGraph,
    wt: &WeightScheme,
    config: &MoranConfig,
) -> Result<Vec<LocalMoranRecord>> {
    // ── 1. Validation ────────────────────────────────────────────────────────
    config.validate()?;
    check_lengths(x, nb, Some(wt))?;
    let n = x.len();
    if n < 3 {
        return Err(LisaError::InvalidConfiguration(format!(
            "local Moran's I needs at least 3 units, got {n}"
        )));
    }
    let missing: Vec<usize> = (0..n).filter(|&i| x[i].is_nan()).collect();
    if !missing.is_empty() {
        return Err(LisaError::MissingValue { units: missing });
    }
    let isolates = nb.isolates();
    if !isolates.is_empty() && !config.allow_zero {
        return Err(LisaError::NoNeighbors { units: isolates });
    }

    // ── 2. Global moments ────────────────────────────────────────────────────
    let g = GlobalMoments::from_values(x);
    if g.m2 <= 0.0 {
        return Err(LisaError::ZeroVariance);
    }
    let seed = config.seed.unwrap_or_else(rand::random);
    debug!(n, isolates = isolates.len(), simulations = config.simulations, seed, "local Moran's I");

    // ── 3. Analytic statistic ────────────────────────────────────────────────
    let stats: Vec<LocalStatistic> = (0..n).map(|i| local_statistic(i, nb, wt, &g)).collect();

    // ── 4. Permutation inference ─────────────────────────────────────────────
    let observed: Vec<f64> = stats.iter().map(|s| s.ii).collect();
    let sims = permutation::simulate(
        nb,
        wt,
        &g,
        &observed,
        config.simulations,
        seed,
        config.chunk_size,
    )?;

    // ── 5. Cluster labels ────────────────────────────────────────────────────
    let policy = LagPolicy { na_okay: false, allow_zero: config.allow_zero };
    let lag = spatial_lag(x, nb, Some(wt), &Reducer::Sum, policy)?;
    let centered: Vec<f64> = (0..n).map(|i| centered_lag(i, nb, wt, &g.z)).collect();
    let significance: Vec<Option<f64>> = stats
        .iter()
        .zip(&sims)
        .map(|(s, r)| match config.significance {
            SignificanceSource::Simulated => r.p_ii_sim,
            SignificanceSource::Folded => r.p_folded_sim,
            SignificanceSource::Analytic => s.p_ii,
        })
        .collect();
    let inputs = QuadrantInputs {
        values: x,
        lag: &lag,
        centered_lag: &centered,
        significance: &significance,
        cutoff: config.cutoff,
    };
    let mean_labels = classify_mean(&inputs);
    let median_labels = classify_median(&inputs);
    let pysal_labels = classify_pysal(&inputs);

    let records = (0..n)
        .map(|i| LocalMoranRecord {
            ii: stats[i].ii,
            eii: stats[i].eii,
            var_ii: stats[i].var_ii,
            z_ii: stats[i].z_ii,
            p_ii: stats[i].p_ii,
            p_ii_sim: sims[i].p_ii_sim,
            p_folded_sim: sims[i].p_folded_sim,
            skewness: sims[i].skewness,
            kurtosis: sims[i].kurtosis,
            mean_label: mean_labels[i],
            median_label: median_labels[i],
            pysal_label: pysal_labels[i],
        })
        .collect();
    Ok(records)
}
