//! Unit tests for the calculation modules

pub mod monte_carlo_tests;
pub mod risk_tests;
