//! Local indicators of spatial association.
//!
//! Computes local Moran's I over an externally built neighbor graph and
//! weight scheme: the per-unit statistic with randomization-theory moments,
//! conditional permutation p-values, and cluster labels under the mean,
//! median and pysal conventions. The spatial lag it relies on is exposed on
//! its own, together with neighbor-based imputation of missing values.
//!
//! Missing values are `f64::NAN` on input; undefined outputs are `None`.
//!
//! ```
//! use lisa_core::{local_moran, MoranConfig, NeighborGraph, WeightScheme};
//!
//! let nb = NeighborGraph::new(vec![vec![1], vec![0, 2], vec![1, 3], vec![2]]).unwrap();
//! let wt = WeightScheme::row_standardized(&nb);
//! let cfg = MoranConfig { simulations: 99, seed: Some(1), ..Default::default() };
//! let records = local_moran(&[1.0, 2.0, 8.0, 9.0], &nb, &wt, &cfg).unwrap();
//! assert_eq!(records.len(), 4);
//! ```

pub mod error;
pub mod graph;
pub mod lag;
pub mod lisa;
mod maybe_rayon;
pub mod moments;
pub mod weights;

pub use error::{LisaError, Result};
pub use graph::NeighborGraph;
pub use lag::{impute_missing, impute_missing_weighted, spatial_lag, LagPolicy, Reducer};
pub use lisa::{
    local_moran, ClusterConvention, ClusterLabel, LocalMoranRecord, LocalStatistic, MoranConfig,
    SignificanceSource, SimulationResult,
};
pub use weights::{WeightScheme, WeightStyle};
