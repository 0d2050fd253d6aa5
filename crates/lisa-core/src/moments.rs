//! Descriptive statistics shared by the lag, statistic and classifier stages.

/// Arithmetic mean. NaN for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median with the midpoint rule for even lengths. NaN for an empty slice.
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population skewness and excess kurtosis, `(m3 / m2^1.5, m4 / m2² − 3)`.
/// `None` when the sample is constant or has fewer than two values.
pub(crate) fn shape_moments(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mu = mean(values);
    let (mut m2, mut m3, mut m4) = (0.0f64, 0.0f64, 0.0f64);
    for &v in values {
        let d = v - mu;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;
    if m2 < 1e-300 {
        return None;
    }
    Some((m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0))
}

/// Global moments of a fully observed value vector, computed once per call
/// and handed to every per-unit computation.
#[derive(Debug, Clone)]
pub struct GlobalMoments {
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    /// Deviations `z_i = x_i − mean`.
    pub z: Vec<f64>,
    /// `Σ z² / n`.
    pub m2: f64,
    /// `Σ z⁴ / n`.
    pub m4: f64,
    /// Sample kurtosis `m4 / m2²`, used by the randomization variance.
    pub b2: f64,
}

impl GlobalMoments {
    /// Caller guarantees `x` is non-empty and NaN-free.
    pub fn from_values(x: &[f64]) -> Self {
        let n = x.len();
        let nf = n as f64;
        let mean = mean(x);
        let z: Vec<f64> = x.iter().map(|&v| v - mean).collect();
        let m2 = z.iter().map(|d| d * d).sum::<f64>() / nf;
        let m4 = z.iter().map(|d| d.powi(4)).sum::<f64>() / nf;
        let b2 = if m2 > 0.0 { m4 / (m2 * m2) } else { f64::NAN };
        Self {
            n,
            mean,
            median: median(x),
            z,
            m2,
            m4,
            b2,
        }
    }
}
