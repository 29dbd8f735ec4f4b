//! Quantitative calculation engine
//!
//! Pure numerical modules (statistics, risk metrics, technical indicators,
//! mean-variance optimization, Monte Carlo simulation) behind a single
//! message router, meant to run on an isolated worker via
//! [`services_common::Worker`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod indicators;
pub mod monte_carlo;
pub mod optimization;
pub mod risk;
pub mod stats;
pub mod types;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use handlers::{QuantRequest, QuantRouter, RequestType};
pub use monte_carlo::MonteCarloSimulator;
pub use optimization::PortfolioOptimizer;
pub use types::*;
