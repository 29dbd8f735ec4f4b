//! Risk metrics over a periodic return series

use crate::config::RiskConfig;
use crate::error::{EngineError, EngineResult};
use crate::stats;
use crate::types::{RiskAdjustedRatios, RiskReport, RiskRequest};
use tracing::debug;

/// Compute the full risk report for a request
pub fn compute(request: &RiskRequest, config: &RiskConfig) -> EngineResult<RiskReport> {
    let returns = request.returns.as_slice();
    stats::validate_series(returns, "returns")?;

    let confidence = request.confidence.unwrap_or(config.default_confidence);
    let (value_at_risk, conditional_value_at_risk) = tail_risk(returns, confidence)?;

    let mean = stats::mean(returns)?;
    let volatility = stats::stddev(returns)?;

    let beta = request
        .benchmark
        .as_deref()
        .map(|benchmark| beta(returns, benchmark))
        .transpose()?;

    let ratios = request
        .risk_free_rate
        .map(|rf| risk_adjusted_ratios(returns, rf))
        .transpose()?;

    let report = RiskReport {
        mean,
        volatility,
        value_at_risk,
        conditional_value_at_risk,
        max_drawdown: max_drawdown(returns)?,
        beta,
        skewness: stats::skewness(returns)?,
        kurtosis: stats::kurtosis(returns)?,
        ratios,
    };

    debug!(
        n = returns.len(),
        confidence,
        var = report.value_at_risk,
        cvar = report.conditional_value_at_risk,
        max_drawdown = report.max_drawdown,
        "Risk metrics computed"
    );
    Ok(report)
}

/// Historical VaR and CVaR as positive magnitudes.
///
/// VaR is the sorted return at `floor(confidence × n)`. CVaR is the mean of
/// the returns strictly below that index, falling back to VaR when that tail
/// is empty.
pub fn tail_risk(returns: &[f64], confidence: f64) -> EngineResult<(f64, f64)> {
    stats::validate_series(returns, "returns")?;
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(EngineError::invalid(format!(
            "confidence {confidence} outside (0, 1)"
        )));
    }

    let sorted = stats::sorted(returns);
    let index = stats::percentile_index(sorted.len(), confidence);
    let var = sorted[index].abs();
    let cvar = if index == 0 {
        var
    } else {
        stats::mean(&sorted[..index])?.abs()
    };
    Ok((var, cvar))
}

/// Largest peak-to-trough decline of the compounded value path starting at 1
pub fn max_drawdown(returns: &[f64]) -> EngineResult<f64> {
    stats::validate_series(returns, "returns")?;

    let mut value = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for r in returns {
        value *= 1.0 + r;
        peak = peak.max(value);
        worst = worst.max((peak - value) / peak);
    }
    Ok(worst)
}

/// Sensitivity to a benchmark: `cov(r, b) / var(b)`
pub fn beta(returns: &[f64], benchmark: &[f64]) -> EngineResult<f64> {
    if returns.len() != benchmark.len() {
        return Err(EngineError::invalid(format!(
            "benchmark length {} does not match returns length {}",
            benchmark.len(),
            returns.len()
        )));
    }
    let covariance = stats::covariance(returns, benchmark)?;
    let (_, benchmark_sd) = stats::standardization(benchmark, "beta")?;
    Ok(covariance / (benchmark_sd * benchmark_sd))
}

/// Per-period Sharpe and Sortino ratios against `risk_free_rate`
pub fn risk_adjusted_ratios(returns: &[f64], risk_free_rate: f64) -> EngineResult<RiskAdjustedRatios> {
    if !risk_free_rate.is_finite() {
        return Err(EngineError::invalid("riskFreeRate must be finite"));
    }
    let (mean, volatility) = stats::standardization(returns, "Sharpe ratio")?;
    let excess = mean - risk_free_rate;

    // Downside deviation over the whole sample, counting only shortfalls
    let shortfall: f64 = returns
        .iter()
        .map(|r| (r - risk_free_rate).min(0.0).powi(2))
        .sum();
    let downside_deviation = (shortfall / returns.len() as f64).sqrt();
    let sortino_ratio = (downside_deviation > 0.0).then(|| excess / downside_deviation);

    Ok(RiskAdjustedRatios {
        sharpe_ratio: excess / volatility,
        sortino_ratio,
    })
}
