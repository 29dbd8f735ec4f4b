//! Engine configuration

use services_common::{ServiceError, ServiceResult, WorkerConfig, load_layered};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment prefix for overrides, e.g. `QUANT_ENGINE__MONTE_CARLO__SEED=7`
pub const ENV_PREFIX: &str = "QUANT_ENGINE";

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub optimization: OptimizationConfig,
    pub risk: RiskConfig,
    pub monte_carlo: MonteCarloConfig,
    pub indicators: IndicatorConfig,
    pub worker: WorkerConfig,
}

/// Efficient-frontier sweep and solver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Number of target-return grid points on the frontier
    pub frontier_points: usize,
    /// Lower end of the target-return band
    pub min_target_return: f64,
    /// Upper end of the target-return band
    pub max_target_return: f64,
    /// Single-asset weight cap when the request gives none
    pub default_max_weight: f64,
    /// Risk-free rate when the request gives none
    pub default_risk_free_rate: f64,
    /// Periods per year used to annualize derived asset statistics
    pub annualization_factor: f64,
    /// Projected-gradient iteration limit per frontier point
    pub max_iterations: usize,
    /// Convergence threshold on the weight update norm
    pub tolerance: f64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            frontier_points: 50,
            min_target_return: 0.05,
            max_target_return: 0.20,
            default_max_weight: 0.4,
            default_risk_free_rate: 0.02,
            annualization_factor: 252.0,
            max_iterations: 500,
            tolerance: 1e-10,
        }
    }
}

/// Risk metric settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Tail probability for VaR/CVaR when the request gives none
    pub default_confidence: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            default_confidence: 0.05,
        }
    }
}

/// Monte Carlo settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Maximum raw paths returned in a result; a request `maxPaths` may only lower it
    pub max_returned_paths: usize,
    /// Largest accepted `simulations`
    pub max_simulations: usize,
    /// Largest accepted `timeHorizon`
    pub max_time_horizon: usize,
    /// Fixed RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            max_returned_paths: 1000,
            max_simulations: 1_000_000,
            max_time_horizon: 10_000,
            seed: None,
        }
    }
}

/// Default indicator periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_period: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub stochastic_period: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub atr_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_period: 20,
            ema_period: 20,
            rsi_period: 14,
            stochastic_period: 14,
            bollinger_period: 20,
            bollinger_k: 2.0,
            atr_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl EngineConfig {
    /// Load from defaults, an optional file and `QUANT_ENGINE__*` variables
    pub fn load(file: Option<&Path>) -> ServiceResult<Self> {
        let config: Self = load_layered(file, ENV_PREFIX)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no request could run with
    pub fn validate(&self) -> ServiceResult<()> {
        let opt = &self.optimization;
        if opt.frontier_points < 2 {
            return Err(invalid("optimization.frontier_points must be at least 2"));
        }
        if !(opt.min_target_return.is_finite() && opt.max_target_return.is_finite())
            || opt.min_target_return > opt.max_target_return
        {
            return Err(invalid(
                "optimization.min_target_return must not exceed max_target_return",
            ));
        }
        if !(opt.default_max_weight > 0.0 && opt.default_max_weight <= 1.0) {
            return Err(invalid("optimization.default_max_weight must lie in (0, 1]"));
        }
        if !opt.default_risk_free_rate.is_finite() {
            return Err(invalid("optimization.default_risk_free_rate must be finite"));
        }
        if !(opt.annualization_factor > 0.0 && opt.annualization_factor.is_finite()) {
            return Err(invalid("optimization.annualization_factor must be positive"));
        }
        if opt.max_iterations == 0 || !(opt.tolerance > 0.0) {
            return Err(invalid(
                "optimization.max_iterations and tolerance must be positive",
            ));
        }

        let confidence = self.risk.default_confidence;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(invalid("risk.default_confidence must lie in (0, 1)"));
        }

        let mc = &self.monte_carlo;
        if mc.max_returned_paths == 0 || mc.max_simulations == 0 || mc.max_time_horizon == 0 {
            return Err(invalid(
                "monte_carlo.max_returned_paths, max_simulations and max_time_horizon must be at least 1",
            ));
        }

        let ind = &self.indicators;
        let periods = [
            ind.sma_period,
            ind.ema_period,
            ind.rsi_period,
            ind.stochastic_period,
            ind.bollinger_period,
            ind.atr_period,
            ind.macd_fast,
            ind.macd_slow,
            ind.macd_signal,
        ];
        if periods.contains(&0) {
            return Err(invalid("indicator periods must be at least 1"));
        }
        if !(ind.bollinger_k >= 0.0 && ind.bollinger_k.is_finite()) {
            return Err(invalid("indicators.bollinger_k must be non-negative"));
        }

        self.worker.validate()
    }
}

fn invalid(message: &str) -> ServiceError {
    ServiceError::Config(message.to_string())
}
