//! Monte Carlo path simulation

use crate::config::MonteCarloConfig;
use crate::error::{EngineError, EngineResult};
use crate::stats;
use crate::types::{MonteCarloRequest, Percentiles, SimulationResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::debug;

/// Simulates compounded value paths driven by Box–Muller normal shocks
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
}

impl MonteCarloSimulator {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    /// Run every simulation; statistics cover all of them, `paths` only the
    /// first `maxPaths`.
    ///
    /// Counts above the configured limits are rejected before anything is
    /// allocated.
    pub fn simulate(&self, request: &MonteCarloRequest) -> EngineResult<SimulationResult> {
        let simulations = bounded_count(request.simulations, "simulations", self.config.max_simulations)?;
        let horizon = bounded_count(request.time_horizon, "timeHorizon", self.config.max_time_horizon)?;
        let initial = request.initial_value;
        if !(initial.is_finite() && initial > 0.0) {
            return Err(EngineError::invalid("initialValue must be positive and finite"));
        }
        if !request.expected_return.is_finite() {
            return Err(EngineError::invalid("expectedReturn must be finite"));
        }
        if !(request.volatility.is_finite() && request.volatility >= 0.0) {
            return Err(EngineError::invalid("volatility must be non-negative and finite"));
        }
        let max_paths = match request.max_paths {
            Some(cap) => bounded_count(cap, "maxPaths", self.config.max_returned_paths)?,
            None => self.config.max_returned_paths,
        };

        let seed = request.seed.or(self.config.seed);
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let kept = simulations.min(max_paths);
        let mut paths = Vec::with_capacity(kept);
        let mut finals = Vec::with_capacity(simulations);
        for run in 0..simulations {
            let keep = run < kept;
            let mut path = Vec::with_capacity(if keep { horizon + 1 } else { 0 });
            let mut value = initial;
            if keep {
                path.push(value);
            }
            for _ in 0..horizon {
                let z = box_muller(&mut rng);
                value *= 1.0 + (z * request.volatility + request.expected_return);
                if keep {
                    path.push(value);
                }
            }
            finals.push(value);
            if keep {
                paths.push(path);
            }
        }

        if let Some(pos) = finals.iter().position(|v| !v.is_finite()) {
            return Err(EngineError::invalid(format!(
                "simulation {pos} diverged to a non-finite value"
            )));
        }

        let mean_final_value = stats::mean(&finals)?;
        let losses = finals.iter().filter(|&&v| v < initial).count();
        let sorted = stats::sorted(&finals);
        let percentiles = Percentiles {
            p5: stats::percentile(&sorted, 0.05)?,
            p25: stats::percentile(&sorted, 0.25)?,
            p50: stats::percentile(&sorted, 0.50)?,
            p75: stats::percentile(&sorted, 0.75)?,
            p95: stats::percentile(&sorted, 0.95)?,
        };

        debug!(
            simulations,
            horizon,
            seeded = seed.is_some(),
            mean_final_value,
            returned_paths = paths.len(),
            "Monte Carlo simulation finished"
        );

        Ok(SimulationResult {
            mean_final_value,
            mean_return: mean_final_value / initial - 1.0,
            percentiles,
            probability_of_loss: losses as f64 / simulations as f64,
            simulation_count: simulations,
            paths,
        })
    }
}

/// `value` as a count in `[1, limit]`
fn bounded_count(value: i64, name: &str, limit: usize) -> EngineResult<usize> {
    if value <= 0 {
        return Err(EngineError::invalid(format!("{name} must be positive, got {value}")));
    }
    match usize::try_from(value) {
        Ok(count) if count <= limit => Ok(count),
        _ => Err(EngineError::invalid(format!(
            "{name} {value} exceeds the limit of {limit}"
        ))),
    }
}

/// One standard-normal draw, `z = √(−2 ln u₁) cos(2π u₂)`
pub fn box_muller<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // gen() is in [0, 1); flipping it keeps ln(u1) finite
    let u1 = 1.0 - rng.r#gen::<f64>();
    let u2 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
