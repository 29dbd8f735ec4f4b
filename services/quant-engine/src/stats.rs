//! Statistics primitives
//!
//! Population moments (divisor `n`) throughout. Every function validates its
//! input: empty or non-finite series are `InvalidInput`, and a zero-variance
//! denominator is `NumericDegenerate`. No function returns NaN.

use crate::error::{EngineError, EngineResult};
use nalgebra::DMatrix;
use statrs::statistics::Statistics;

/// Relative spread below which a series counts as constant
const FLAT_TOLERANCE: f64 = 1e-12;

/// Reject empty series and non-finite values
pub fn validate_series(xs: &[f64], name: &str) -> EngineResult<()> {
    if xs.is_empty() {
        return Err(EngineError::invalid(format!("{name} must not be empty")));
    }
    if let Some(pos) = xs.iter().position(|x| !x.is_finite()) {
        return Err(EngineError::invalid(format!(
            "{name} contains a non-finite value at index {pos}"
        )));
    }
    Ok(())
}

fn validate_pair(xs: &[f64], ys: &[f64]) -> EngineResult<()> {
    validate_series(xs, "first series")?;
    validate_series(ys, "second series")?;
    if xs.len() != ys.len() {
        return Err(EngineError::invalid(format!(
            "series lengths differ: {} vs {}",
            xs.len(),
            ys.len()
        )));
    }
    Ok(())
}

/// True when `stddev` is negligible next to the magnitude of the data
fn is_flat(xs: &[f64], stddev: f64) -> bool {
    let scale = xs.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    stddev <= FLAT_TOLERANCE * scale
}

/// Arithmetic mean
pub fn mean(xs: &[f64]) -> EngineResult<f64> {
    validate_series(xs, "series")?;
    Ok(xs.iter().mean())
}

/// Population variance
pub fn variance(xs: &[f64]) -> EngineResult<f64> {
    validate_series(xs, "series")?;
    Ok(Statistics::<f64>::population_variance(xs.iter()).max(0.0))
}

/// Population standard deviation
pub fn stddev(xs: &[f64]) -> EngineResult<f64> {
    variance(xs).map(f64::sqrt)
}

/// Population covariance, `Σ(xᵢ−x̄)(yᵢ−ȳ)/n`
pub fn covariance(xs: &[f64], ys: &[f64]) -> EngineResult<f64> {
    validate_pair(xs, ys)?;
    Ok(raw_covariance(xs, ys))
}

fn raw_covariance(xs: &[f64], ys: &[f64]) -> f64 {
    let mx: f64 = xs.iter().mean();
    let my: f64 = ys.iter().mean();
    let sum: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    sum / xs.len() as f64
}

/// Pearson correlation, clamped to `[-1, 1]`.
///
/// A constant series on either side has no defined correlation and yields
/// `NumericDegenerate`. `correlation(xs, xs)` is exactly `1.0` for any
/// non-constant `xs`.
pub fn correlation(xs: &[f64], ys: &[f64]) -> EngineResult<f64> {
    validate_pair(xs, ys)?;
    let vx = raw_covariance(xs, xs);
    let vy = raw_covariance(ys, ys);
    if is_flat(xs, vx.sqrt()) || is_flat(ys, vy.sqrt()) {
        return Err(EngineError::degenerate(
            "correlation undefined for a constant series",
        ));
    }
    let cxy = raw_covariance(xs, ys);
    Ok((cxy / (vx * vy).sqrt()).clamp(-1.0, 1.0))
}

/// Mean and stddev of a series that must not be constant
pub(crate) fn standardization(xs: &[f64], what: &str) -> EngineResult<(f64, f64)> {
    validate_series(xs, "series")?;
    let m: f64 = xs.iter().mean();
    let sd = Statistics::<f64>::population_variance(xs.iter()).max(0.0).sqrt();
    if is_flat(xs, sd) {
        return Err(EngineError::degenerate(format!(
            "{what} undefined for a constant series"
        )));
    }
    Ok((m, sd))
}

/// Skewness: mean of cubed z-scores
pub fn skewness(xs: &[f64]) -> EngineResult<f64> {
    let (m, sd) = standardization(xs, "skewness")?;
    Ok(xs.iter().map(|x| ((x - m) / sd).powi(3)).sum::<f64>() / xs.len() as f64)
}

/// Excess kurtosis: mean of 4th-power z-scores minus 3
pub fn kurtosis(xs: &[f64]) -> EngineResult<f64> {
    let (m, sd) = standardization(xs, "kurtosis")?;
    Ok(xs.iter().map(|x| ((x - m) / sd).powi(4)).sum::<f64>() / xs.len() as f64 - 3.0)
}

/// Index used by [`percentile`]: `floor(p × n)` clamped to `[0, n−1]`
pub fn percentile_index(n: usize, p: f64) -> usize {
    let raw = (p * n as f64).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(n.saturating_sub(1))
    }
}

/// Nearest-rank percentile of an ascending series; `p` in `[0, 1]`
pub fn percentile(sorted: &[f64], p: f64) -> EngineResult<f64> {
    validate_series(sorted, "sorted series")?;
    if !(0.0..=1.0).contains(&p) {
        return Err(EngineError::invalid(format!(
            "percentile {p} outside [0, 1]"
        )));
    }
    Ok(sorted[percentile_index(sorted.len(), p)])
}

/// Sort a copy ascending
pub fn sorted(xs: &[f64]) -> Vec<f64> {
    let mut out = xs.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

fn validate_panel<S: AsRef<[f64]>>(series: &[S]) -> EngineResult<usize> {
    let first = series
        .first()
        .ok_or_else(|| EngineError::invalid("at least one series is required"))?;
    let len = first.as_ref().len();
    for (i, s) in series.iter().enumerate() {
        validate_series(s.as_ref(), &format!("series {i}"))?;
        if s.as_ref().len() != len {
            return Err(EngineError::invalid(format!(
                "series {i} has length {}, expected {len}",
                s.as_ref().len()
            )));
        }
    }
    Ok(series.len())
}

/// Pairwise population covariance matrix
pub fn covariance_matrix<S: AsRef<[f64]>>(series: &[S]) -> EngineResult<DMatrix<f64>> {
    let n = validate_panel(series)?;
    let mut cov = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let c = raw_covariance(series[i].as_ref(), series[j].as_ref());
            cov[(i, j)] = c;
            cov[(j, i)] = c;
        }
    }
    Ok(cov)
}

/// Pairwise correlation matrix with a unit diagonal
pub fn correlation_matrix<S: AsRef<[f64]>>(series: &[S]) -> EngineResult<DMatrix<f64>> {
    let n = validate_panel(series)?;
    let mut corr = DMatrix::identity(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let c = correlation(series[i].as_ref(), series[j].as_ref())?;
            corr[(i, j)] = c;
            corr[(j, i)] = c;
        }
    }
    Ok(corr)
}
