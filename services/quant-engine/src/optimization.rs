//! Mean-variance portfolio optimization
//!
//! Every frontier point is the long-only minimum-variance portfolio for a
//! target return, found by projected gradient descent on `wᵀΣw`. The
//! projection alternates (Dykstra) between the affine set
//! `{Σw = 1, μᵀw = target}` and the box `[0, maxWeight]`; a closing exact
//! projection onto the capped simplex keeps the weights summing to one and
//! inside their bounds regardless of how far the solver got.

use crate::config::OptimizationConfig;
use crate::error::{EngineError, EngineResult};
use crate::stats;
use crate::types::{OptimizationRequest, OptimizationResult, PortfolioPoint};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

const DYKSTRA_MAX_ITERATIONS: usize = 200;
const DYKSTRA_TOLERANCE: f64 = 1e-12;
const BISECTION_STEPS: usize = 200;
/// Slack allowed on `n × maxWeight ≥ 1`
const FEASIBILITY_SLACK: f64 = 1e-9;

/// Portfolio optimizer
#[derive(Debug, Clone)]
pub struct PortfolioOptimizer {
    config: OptimizationConfig,
}

/// Validated inputs of one optimization
struct Problem {
    symbols: Vec<String>,
    /// Annualized expected returns
    mu: DVector<f64>,
    /// Annualized volatilities
    vols: DVector<f64>,
    correlation: DMatrix<f64>,
    covariance: DMatrix<f64>,
    max_weight: f64,
    risk_free_rate: f64,
    /// Gradient step, `1 / (2 tr Σ)`
    step: f64,
}

impl PortfolioOptimizer {
    /// Create new optimizer
    pub fn new(config: OptimizationConfig) -> Self {
        Self { config }
    }

    /// Build the efficient frontier and select the optimal portfolio
    pub fn optimize(&self, request: &OptimizationRequest) -> EngineResult<OptimizationResult> {
        let problem = self.build_problem(request)?;
        let n = problem.mu.len();

        let points = request.frontier_points.unwrap_or(self.config.frontier_points);
        let band_low = request.min_target_return.unwrap_or(self.config.min_target_return);
        let band_high = request.max_target_return.unwrap_or(self.config.max_target_return);
        if points < 2 {
            return Err(EngineError::invalid("frontierPoints must be at least 2"));
        }
        if !(band_low.is_finite() && band_high.is_finite()) || band_low > band_high {
            return Err(EngineError::invalid(
                "minTargetReturn must not exceed maxTargetReturn",
            ));
        }

        let (reachable_low, reachable_high) = attainable_range(problem.mu.as_slice(), problem.max_weight);
        debug!(
            assets = n,
            reachable_low, reachable_high, band_low, band_high, "Sweeping efficient frontier"
        );

        let mut weights = project_capped_simplex(&DVector::from_element(n, 1.0 / n as f64), problem.max_weight);
        let mut frontier = Vec::with_capacity(points);
        for k in 0..points {
            let grid = band_low + (band_high - band_low) * k as f64 / (points - 1) as f64;
            let target = grid.clamp(reachable_low, reachable_high);
            weights = self.solve(&problem, &weights, Some(target));
            frontier.push(problem.point(&weights)?);
        }

        let min_variance_weights = self.solve(&problem, &weights, None);
        let minimum_variance = problem.point(&min_variance_weights)?;

        let optimal = match request.target_return {
            Some(target) => {
                if !target.is_finite() {
                    return Err(EngineError::invalid("targetReturn must be finite"));
                }
                frontier.iter().min_by(|a, b| {
                    (a.expected_return - target)
                        .abs()
                        .total_cmp(&(b.expected_return - target).abs())
                })
            }
            None => frontier
                .iter()
                .max_by(|a, b| a.sharpe_ratio.total_cmp(&b.sharpe_ratio)),
        }
        .cloned()
        .ok_or_else(|| EngineError::invalid("efficient frontier is empty"))?;

        let diversification_ratio = problem.diversification_ratio(&optimal);
        debug!(
            expected_return = optimal.expected_return,
            volatility = optimal.volatility,
            sharpe = optimal.sharpe_ratio,
            diversification_ratio,
            "Optimal portfolio selected"
        );

        Ok(OptimizationResult {
            optimal,
            efficient_frontier: frontier,
            diversification_ratio,
            minimum_variance,
            correlation_matrix: to_rows(&problem.correlation),
            covariance_matrix: to_rows(&problem.covariance),
            symbols: problem.symbols,
        })
    }

    fn build_problem(&self, request: &OptimizationRequest) -> EngineResult<Problem> {
        let assets = &request.assets;
        if assets.len() < 2 {
            return Err(EngineError::invalid(format!(
                "at least 2 assets are required, got {}",
                assets.len()
            )));
        }

        let length = assets[0].returns.len();
        for asset in assets {
            stats::validate_series(&asset.returns, &format!("returns of {}", asset.symbol))?;
            if asset.returns.len() != length {
                return Err(EngineError::invalid(format!(
                    "returns of {} have length {}, expected {length}",
                    asset.symbol,
                    asset.returns.len()
                )));
            }
        }

        let factor = self.config.annualization_factor;
        let mut mu = Vec::with_capacity(assets.len());
        let mut vols = Vec::with_capacity(assets.len());
        for asset in assets {
            let expected_return = match asset.expected_return {
                Some(r) => r,
                None => stats::mean(&asset.returns)? * factor,
            };
            let volatility = match asset.volatility {
                Some(v) => v,
                None => stats::stddev(&asset.returns)? * factor.sqrt(),
            };
            if !expected_return.is_finite() || !(volatility.is_finite() && volatility >= 0.0) {
                return Err(EngineError::invalid(format!(
                    "{} needs a finite expected return and non-negative volatility",
                    asset.symbol
                )));
            }
            mu.push(expected_return);
            vols.push(volatility);
        }

        let series: Vec<&[f64]> = assets.iter().map(|a| a.returns.as_slice()).collect();
        let correlation = stats::correlation_matrix(&series)?;
        let vols = DVector::from_vec(vols);
        let covariance = DMatrix::from_fn(assets.len(), assets.len(), |i, j| {
            let (a, b) = (i.min(j), i.max(j));
            correlation[(a, b)] * vols[a] * vols[b]
        });

        let max_weight = request.max_weight.unwrap_or(self.config.default_max_weight);
        if !(max_weight > 0.0 && max_weight <= 1.0) {
            return Err(EngineError::invalid(format!(
                "maxWeight {max_weight} outside (0, 1]"
            )));
        }
        if (assets.len() as f64) * max_weight < 1.0 - FEASIBILITY_SLACK {
            return Err(EngineError::invalid(format!(
                "maxWeight {max_weight} cannot fully invest {} assets",
                assets.len()
            )));
        }

        let risk_free_rate = request.risk_free_rate.unwrap_or(self.config.default_risk_free_rate);
        if !risk_free_rate.is_finite() {
            return Err(EngineError::invalid("riskFreeRate must be finite"));
        }

        let trace = covariance.trace();
        let step = if trace > 0.0 { 1.0 / (2.0 * trace) } else { 1.0 };

        Ok(Problem {
            symbols: assets.iter().map(|a| a.symbol.clone()).collect(),
            mu: DVector::from_vec(mu),
            vols,
            correlation,
            covariance,
            max_weight,
            risk_free_rate,
            step,
        })
    }

    /// Projected gradient descent from `start`; `None` drops the return constraint
    fn solve(&self, problem: &Problem, start: &DVector<f64>, target: Option<f64>) -> DVector<f64> {
        let project = |z: &DVector<f64>| match target {
            Some(t) => problem.project_feasible(z, t),
            None => project_capped_simplex(z, problem.max_weight),
        };

        let mut w = project(start);
        for iteration in 0..self.config.max_iterations {
            let gradient = &problem.covariance * &w * 2.0;
            let next = project(&(&w - gradient * problem.step));
            let delta = (&next - &w).norm();
            w = next;
            if delta < self.config.tolerance {
                trace!(iteration, ?target, "Projected gradient converged");
                break;
            }
        }

        project_capped_simplex(&w, problem.max_weight)
    }
}

impl Problem {
    /// Dykstra alternation between the budget/return plane and the box
    fn project_feasible(&self, z: &DVector<f64>, target: f64) -> DVector<f64> {
        let n = z.len();
        let mut x = z.clone();
        let mut p = DVector::zeros(n);
        let mut q = DVector::zeros(n);

        for _ in 0..DYKSTRA_MAX_ITERATIONS {
            let y = project_affine(&(&x + &p), &self.mu, target);
            p = &x + &p - &y;
            let next = project_box(&(&y + &q), self.max_weight);
            q = &y + &q - &next;
            let delta = (&next - &x).norm();
            x = next;
            if delta < DYKSTRA_TOLERANCE {
                break;
            }
        }
        x
    }

    fn point(&self, weights: &DVector<f64>) -> EngineResult<PortfolioPoint> {
        let expected_return = self.mu.dot(weights);
        let volatility = weights.dot(&(&self.covariance * weights)).max(0.0).sqrt();
        if volatility <= 0.0 {
            return Err(EngineError::degenerate(
                "portfolio volatility is zero, Sharpe ratio undefined",
            ));
        }
        Ok(PortfolioPoint {
            weights: weights.iter().copied().collect(),
            expected_return,
            volatility,
            sharpe_ratio: (expected_return - self.risk_free_rate) / volatility,
        })
    }

    /// `Σ wᵢσᵢ / σₚ`
    fn diversification_ratio(&self, point: &PortfolioPoint) -> f64 {
        let weighted: f64 = point.weights.iter().zip(self.vols.iter()).map(|(w, v)| w * v).sum();
        weighted / point.volatility
    }
}

/// Lowest and highest expected return reachable with weights in `[0, cap]`
/// summing to one, by greedily filling the worst or best assets first
fn attainable_range(mu: &[f64], cap: f64) -> (f64, f64) {
    let mut order: Vec<usize> = (0..mu.len()).collect();
    order.sort_by(|&a, &b| mu[a].total_cmp(&mu[b]));

    let low = greedy_return(mu, cap, order.iter());
    let high = greedy_return(mu, cap, order.iter().rev());
    (low.min(high), high.max(low))
}

fn greedy_return<'a>(mu: &[f64], cap: f64, indices: impl Iterator<Item = &'a usize>) -> f64 {
    let mut remaining = 1.0_f64;
    let mut total = 0.0;
    for &i in indices {
        if remaining <= 0.0 {
            break;
        }
        let w = cap.min(remaining);
        total += w * mu[i];
        remaining -= w;
    }
    total
}

/// Projection onto `{w : Σw = 1, μᵀw = target}`.
///
/// Falls back to the budget plane alone when `μ` is (nearly) parallel to the
/// ones vector.
fn project_affine(z: &DVector<f64>, mu: &DVector<f64>, target: f64) -> DVector<f64> {
    let n = z.len() as f64;
    let sum_mu = mu.sum();
    let sum_mu_sq = mu.dot(mu);
    let r_budget = z.sum() - 1.0;
    let r_return = mu.dot(z) - target;

    // Gram matrix of the two constraint rows: [[n, Σμ], [Σμ, Σμ²]]
    let det = n * sum_mu_sq - sum_mu * sum_mu;
    if det <= 1e-12 * n * sum_mu_sq.max(f64::MIN_POSITIVE) {
        return z.map(|v| v - r_budget / n);
    }

    let lambda_budget = (sum_mu_sq * r_budget - sum_mu * r_return) / det;
    let lambda_return = (n * r_return - sum_mu * r_budget) / det;
    DVector::from_iterator(
        z.len(),
        z.iter().zip(mu.iter()).map(|(v, m)| v - lambda_budget - lambda_return * m),
    )
}

fn project_box(z: &DVector<f64>, cap: f64) -> DVector<f64> {
    z.map(|v| v.clamp(0.0, cap))
}

/// Exact projection onto `{w : Σw = 1, 0 ≤ wᵢ ≤ cap}` by bisection on the
/// shift `τ` in `wᵢ = clamp(zᵢ − τ, 0, cap)`. Requires `n × cap ≥ 1`.
pub(crate) fn project_capped_simplex(z: &DVector<f64>, cap: f64) -> DVector<f64> {
    let total = |tau: f64| z.iter().map(|v| (v - tau).clamp(0.0, cap)).sum::<f64>();

    let mut lo = z.iter().copied().fold(f64::INFINITY, f64::min) - cap;
    let mut hi = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if total(mid) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let tau = 0.5 * (lo + hi);
    z.map(|v| (v - tau).clamp(0.0, cap))
}

fn to_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}
