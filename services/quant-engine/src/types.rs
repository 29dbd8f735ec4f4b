//! Request payloads and result value objects
//!
//! Every type here is built fresh for one request and dropped with its
//! response. Wire names are camelCase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One asset offered to the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub symbol: String,
    pub returns: Vec<f64>,
    /// Annualized expected return; derived from `returns` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<f64>,
    /// Annualized standard deviation; derived from `returns` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
}

impl AssetDescriptor {
    /// Descriptor whose statistics are derived from its returns
    pub fn new(symbol: impl Into<String>, returns: Vec<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            returns,
            expected_return: None,
            volatility: None,
        }
    }

    /// Descriptor with caller-supplied annualized statistics
    pub fn with_stats(mut self, expected_return: f64, volatility: f64) -> Self {
        self.expected_return = Some(expected_return);
        self.volatility = Some(volatility);
        self
    }
}

/// `PORTFOLIO_OPTIMIZATION` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    pub assets: Vec<AssetDescriptor>,
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    #[serde(default)]
    pub target_return: Option<f64>,
    #[serde(default)]
    pub max_weight: Option<f64>,
    #[serde(default)]
    pub frontier_points: Option<usize>,
    #[serde(default)]
    pub min_target_return: Option<f64>,
    #[serde(default)]
    pub max_target_return: Option<f64>,
}

impl OptimizationRequest {
    pub fn new(assets: Vec<AssetDescriptor>) -> Self {
        Self {
            assets,
            risk_free_rate: None,
            target_return: None,
            max_weight: None,
            frontier_points: None,
            min_target_return: None,
            max_target_return: None,
        }
    }
}

/// A point on the efficient frontier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPoint {
    /// Weights in asset order, summing to one
    pub weights: Vec<f64>,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
}

/// Optimizer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub optimal: PortfolioPoint,
    pub efficient_frontier: Vec<PortfolioPoint>,
    pub diversification_ratio: f64,
    pub minimum_variance: PortfolioPoint,
    pub symbols: Vec<String>,
    pub correlation_matrix: Vec<Vec<f64>>,
    pub covariance_matrix: Vec<Vec<f64>>,
}

/// `RISK_METRICS` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRequest {
    pub returns: Vec<f64>,
    #[serde(default)]
    pub benchmark: Option<Vec<f64>>,
    /// Tail probability, e.g. 0.05
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Per-period risk-free rate; enables the Sharpe and Sortino fields
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
}

/// Risk-adjusted ratios, reported only when a risk-free rate is supplied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAdjustedRatios {
    pub sharpe_ratio: f64,
    /// `None` when no return falls below the risk-free rate
    pub sortino_ratio: Option<f64>,
}

/// Risk metrics over one return series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub mean: f64,
    pub volatility: f64,
    pub value_at_risk: f64,
    pub conditional_value_at_risk: f64,
    pub max_drawdown: f64,
    /// `None` without a benchmark
    pub beta: Option<f64>,
    pub skewness: f64,
    pub kurtosis: f64,
    #[serde(flatten)]
    pub ratios: Option<RiskAdjustedRatios>,
}

/// `MONTE_CARLO` payload
///
/// Counts are signed so that non-positive values reach validation instead of
/// failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloRequest {
    pub initial_value: f64,
    /// Per-step drift
    pub expected_return: f64,
    /// Per-step standard deviation
    pub volatility: f64,
    pub time_horizon: i64,
    pub simulations: i64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub max_paths: Option<i64>,
}

/// Percentiles of the final-value distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

/// Monte Carlo output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub mean_final_value: f64,
    pub mean_return: f64,
    pub percentiles: Percentiles,
    pub probability_of_loss: f64,
    pub simulation_count: usize,
    /// At most the configured cap; each of length `timeHorizon + 1`
    pub paths: Vec<Vec<f64>>,
}

/// `TECHNICAL_INDICATORS` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRequest {
    pub prices: Vec<f64>,
    #[serde(default)]
    pub volumes: Option<Vec<f64>>,
    #[serde(default)]
    pub highs: Option<Vec<f64>>,
    #[serde(default)]
    pub lows: Option<Vec<f64>>,
    /// Indicator families to compute; all of them when absent
    #[serde(default)]
    pub indicators: Option<Vec<IndicatorKind>>,
    #[serde(default)]
    pub sma_period: Option<usize>,
    #[serde(default)]
    pub ema_period: Option<usize>,
    #[serde(default)]
    pub rsi_period: Option<usize>,
    #[serde(default)]
    pub stochastic_period: Option<usize>,
    #[serde(default)]
    pub bollinger_period: Option<usize>,
    #[serde(default)]
    pub bollinger_k: Option<f64>,
    #[serde(default)]
    pub atr_period: Option<usize>,
}

/// Indicator families that can be requested by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    Stochastic,
    Bollinger,
    Atr,
    Obv,
    Vwap,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 9] = [
        Self::Sma,
        Self::Ema,
        Self::Rsi,
        Self::Macd,
        Self::Stochastic,
        Self::Bollinger,
        Self::Atr,
        Self::Obv,
        Self::Vwap,
    ];
}

/// Indicator name to output series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSet(BTreeMap<String, Vec<f64>>);

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, series: Vec<f64>) {
        self.0.insert(name.to_string(), series);
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
