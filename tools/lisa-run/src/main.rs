//! Run local Moran's I on a JSON problem file.
//!
//! Input: `{ "values": [..], "neighbors": [[..], ..], "weights": [[..], ..]?,
//! "style": "row_standardized"?, "config": {..}? }`, with `null` marking a
//! missing value. Without `weights` the graph is row-standardized.
//! Output: one record per unit, as a JSON array.

use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use lisa_core::{
    impute_missing_weighted, local_moran, LagPolicy, MoranConfig, NeighborGraph, Reducer,
    WeightScheme, WeightStyle,
};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "lisa-run", about = "Local Moran's I with permutation inference")]
struct Args {
    /// Problem JSON file.
    #[arg(short, long)]
    input: PathBuf,

    /// Write records here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fill missing values from neighbors first, using this reducer
    /// (mean, sum, median, min, max).
    #[arg(long)]
    impute: Option<String>,

    /// Skip missing neighbor values during imputation.
    #[arg(long)]
    na_okay: bool,

    /// Override the seed from the problem's config.
    #[arg(long)]
    seed: Option<u64>,
}

// ── Serde helpers ─────────────────────────────────────────────────────────────

fn null_as_nan_vec<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<f64>, D::Error> {
    let v: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
}

#[derive(Deserialize)]
struct Problem {
    #[serde(deserialize_with = "null_as_nan_vec")]
    values: Vec<f64>,
    neighbors: NeighborGraph,
    weights: Option<Vec<Vec<f64>>>,
    style: Option<WeightStyle>,
    #[serde(default)]
    config: MoranConfig,
}

impl Problem {
    fn weight_scheme(&self) -> Result<WeightScheme> {
        let scheme = match &self.weights {
            Some(w) => WeightScheme::new(
                &self.neighbors,
                w.clone(),
                self.style.unwrap_or(WeightStyle::Custom),
            )?,
            None => match self.style {
                Some(WeightStyle::Binary) => WeightScheme::binary(&self.neighbors),
                Some(WeightStyle::Custom) => bail!("style \"custom\" needs explicit weights"),
                _ => WeightScheme::row_standardized(&self.neighbors),
            },
        };
        Ok(scheme)
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let mut problem: Problem = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", args.input.display()))?;
    if let Some(seed) = args.seed {
        problem.config.seed = Some(seed);
    }
    let wt = problem.weight_scheme()?;

    let values = match &args.impute {
        Some(name) => {
            let reducer: Reducer = name.parse()?;
            let policy = LagPolicy { na_okay: args.na_okay, allow_zero: problem.config.allow_zero };
            impute_missing_weighted(&problem.values, &problem.neighbors, Some(&wt), &reducer, policy)
                .context("imputing missing values")?
        }
        None => problem.values.clone(),
    };

    info!(
        units = values.len(),
        simulations = problem.config.simulations,
        style = ?wt.style(),
        "running local Moran's I"
    );
    let records = local_moran(&values, &problem.neighbors, &wt, &problem.config)
        .context("computing local Moran's I")?;

    let json = serde_json::to_string_pretty(&records)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "records written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
