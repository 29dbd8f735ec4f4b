//! Risk metric tests

use crate::test_utils::TestDataFactory;
use approx::assert_relative_eq;
use quant_engine::config::RiskConfig;
use quant_engine::risk::{self, beta, max_drawdown, tail_risk};
use quant_engine::{EngineError, RiskRequest};
use rstest::*;

#[fixture]
fn config() -> RiskConfig {
    RiskConfig::default()
}

#[fixture]
fn twenty_returns() -> Vec<f64> {
    vec![
        -0.05, -0.04, 0.01, 0.02, -0.01, 0.03, 0.00, 0.015, -0.02, 0.01,
        0.005, -0.005, 0.02, 0.01, -0.03, 0.025, 0.01, 0.0, -0.015, 0.02,
    ]
}

fn request(returns: Vec<f64>) -> RiskRequest {
    RiskRequest {
        returns,
        benchmark: None,
        confidence: None,
        risk_free_rate: None,
    }
}

mod tail_risk_tests {
    use super::*;

    #[rstest]
    fn test_var_and_cvar_at_five_percent(twenty_returns: Vec<f64>) {
        // floor(0.05 × 20) = 1: VaR is the second-worst return, CVaR the worst
        let (var, cvar) = tail_risk(&twenty_returns, 0.05).unwrap();
        assert_relative_eq!(var, 0.04);
        assert_relative_eq!(cvar, 0.05);
        assert!(cvar >= var);
    }

    #[rstest]
    fn test_empty_tail_falls_back_to_var() {
        let (var, cvar) = tail_risk(&[-0.02, 0.01, 0.03], 0.05).unwrap();
        assert_relative_eq!(var, 0.02);
        assert_relative_eq!(cvar, var);
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    #[case(-0.1)]
    fn test_confidence_outside_unit_interval(twenty_returns: Vec<f64>, #[case] confidence: f64) {
        assert!(matches!(
            tail_risk(&twenty_returns, confidence),
            Err(EngineError::InvalidInput(_))
        ));
    }
}

mod drawdown_tests {
    use super::*;

    #[rstest]
    fn test_drawdown_on_compounded_path() {
        // 1.0 → 1.1 → 0.88 → 0.968: peak 1.1, trough 0.88
        let dd = max_drawdown(&[0.10, -0.20, 0.10]).unwrap();
        assert_relative_eq!(dd, 0.2, epsilon = 1e-12);
    }

    #[rstest]
    fn test_early_loss_measured_from_initial_value() {
        let dd = max_drawdown(&[-0.10, 0.05]).unwrap();
        assert_relative_eq!(dd, 0.10, epsilon = 1e-12);
    }

    #[rstest]
    fn test_monotone_gains_have_no_drawdown() {
        assert_eq!(max_drawdown(&[0.01, 0.02, 0.03]).unwrap(), 0.0);
    }
}

mod beta_tests {
    use super::*;

    #[rstest]
    fn test_scaled_benchmark_beta() {
        let benchmark = TestDataFactory::noisy_returns(40, 9);
        let returns: Vec<f64> = benchmark.iter().map(|b| 1.5 * b).collect();
        assert_relative_eq!(beta(&returns, &benchmark).unwrap(), 1.5, epsilon = 1e-12);
    }

    #[rstest]
    fn test_flat_benchmark_is_degenerate() {
        let returns = TestDataFactory::noisy_returns(5, 9);
        assert!(matches!(
            beta(&returns, &[0.01; 5]),
            Err(EngineError::NumericDegenerate(_))
        ));
    }

    #[rstest]
    fn test_benchmark_length_mismatch() {
        assert!(matches!(
            beta(&[0.01, 0.02, 0.03], &[0.01, 0.02]),
            Err(EngineError::InvalidInput(_))
        ));
    }
}

mod report_tests {
    use super::*;

    #[rstest]
    fn test_report_without_benchmark(config: RiskConfig, twenty_returns: Vec<f64>) {
        let report = risk::compute(&request(twenty_returns.clone()), &config).unwrap();
        assert!(report.beta.is_none());
        assert!(report.ratios.is_none());
        assert_relative_eq!(report.value_at_risk, 0.04);
        assert!(report.volatility > 0.0);
        assert!(report.max_drawdown > 0.0);

        let encoded = serde_json::to_value(&report).unwrap();
        assert!(encoded["beta"].is_null());
        assert!(encoded.get("sharpeRatio").is_none());
        assert!(encoded.get("conditionalValueAtRisk").is_some());
    }

    #[rstest]
    fn test_report_with_benchmark_and_rate(config: RiskConfig, twenty_returns: Vec<f64>) {
        let mut req = request(twenty_returns.clone());
        req.benchmark = Some(twenty_returns);
        req.risk_free_rate = Some(0.0);
        let report = risk::compute(&req, &config).unwrap();

        assert_relative_eq!(report.beta.unwrap(), 1.0, epsilon = 1e-12);
        let ratios = report.ratios.unwrap();
        assert_relative_eq!(ratios.sharpe_ratio, report.mean / report.volatility, epsilon = 1e-12);
        assert!(ratios.sortino_ratio.is_some());

        let encoded = serde_json::to_value(&report).unwrap();
        assert!(encoded["sharpeRatio"].is_number());
        assert!(encoded["sortinoRatio"].is_number());
    }

    #[rstest]
    fn test_no_downside_gives_null_sortino(config: RiskConfig) {
        let mut req = request(vec![0.01, 0.02, 0.03, 0.015]);
        req.risk_free_rate = Some(0.0);
        let report = risk::compute(&req, &config).unwrap();
        assert_eq!(report.ratios.unwrap().sortino_ratio, None);
    }

    #[rstest]
    fn test_empty_returns_rejected(config: RiskConfig) {
        assert!(matches!(
            risk::compute(&request(Vec::new()), &config),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[rstest]
    fn test_request_confidence_overrides_default(config: RiskConfig, twenty_returns: Vec<f64>) {
        let mut req = request(twenty_returns);
        req.confidence = Some(0.25);
        let report = risk::compute(&req, &config).unwrap();
        // floor(0.25 × 20) = 5: sorted[5] = -0.01
        assert_relative_eq!(report.value_at_risk, 0.01);
    }

    #[rstest]
    #[case(vec![0.0; 12])]
    #[case(vec![0.004; 30])]
    #[case(vec![0.02])]
    fn test_constant_series_report_is_degenerate(config: RiskConfig, #[case] returns: Vec<f64>) {
        assert!(matches!(
            risk::compute(&request(returns.clone()), &config),
            Err(EngineError::NumericDegenerate(_))
        ));
        // The path and tail metrics stay available on their own
        assert!(tail_risk(&returns, 0.05).is_ok());
        assert_eq!(max_drawdown(&returns).unwrap(), 0.0);
    }
}
