//! Test data factories

use quant_engine::{AssetDescriptor, EngineConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Factory for deterministic price and return series
pub struct TestDataFactory;

impl TestDataFactory {
    /// Linearly rising prices
    pub fn trending_prices(n: usize, start: f64, step: f64) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    /// Prices oscillating around `base`
    pub fn oscillating_prices(n: usize, base: f64, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| base + amplitude * (i as f64 * 0.7).sin())
            .collect()
    }

    /// Seeded uniform returns in [-0.03, 0.03)
    pub fn noisy_returns(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-0.03..0.03)).collect()
    }

    /// Seeded returns with a drift added to every period
    pub fn drifting_returns(n: usize, seed: u64, drift: f64) -> Vec<f64> {
        Self::noisy_returns(n, seed)
            .into_iter()
            .map(|r| r + drift)
            .collect()
    }

    /// Three assets with distinct drifts and derived statistics
    pub fn three_assets() -> Vec<AssetDescriptor> {
        vec![
            AssetDescriptor::new("BOND", Self::drifting_returns(120, 1, 0.0002)),
            AssetDescriptor::new("EQUITY", Self::drifting_returns(120, 2, 0.0006)),
            AssetDescriptor::new("CREDIT", Self::drifting_returns(120, 3, 0.0004)),
        ]
    }

    /// Four assets with supplied annualized statistics
    pub fn four_assets_with_stats() -> Vec<AssetDescriptor> {
        [
            ("A", 0.06, 0.10, 11),
            ("B", 0.09, 0.15, 12),
            ("C", 0.12, 0.20, 13),
            ("D", 0.15, 0.28, 14),
        ]
        .into_iter()
        .map(|(symbol, er, vol, seed)| {
            AssetDescriptor::new(symbol, Self::noisy_returns(60, seed)).with_stats(er, vol)
        })
        .collect()
    }
}

/// Engine configuration with a fixed Monte Carlo seed
pub fn seeded_config(seed: u64) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.monte_carlo.seed = Some(seed);
    config
}
