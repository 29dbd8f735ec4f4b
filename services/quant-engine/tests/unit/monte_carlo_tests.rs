//! Monte Carlo simulator tests

use quant_engine::config::MonteCarloConfig;
use quant_engine::{EngineError, MonteCarloRequest, MonteCarloSimulator};
use rstest::*;

#[fixture]
fn simulator() -> MonteCarloSimulator {
    MonteCarloSimulator::new(MonteCarloConfig {
        seed: Some(42),
        ..MonteCarloConfig::default()
    })
}

fn request(simulations: i64, time_horizon: i64, volatility: f64) -> MonteCarloRequest {
    MonteCarloRequest {
        initial_value: 10_000.0,
        expected_return: 0.0005,
        volatility,
        time_horizon,
        simulations,
        seed: None,
        max_paths: None,
    }
}

mod simulation_tests {
    use super::*;

    #[rstest]
    fn test_zero_volatility_leaves_value_unchanged(simulator: MonteCarloSimulator) {
        let mut req = request(100, 10, 0.0);
        req.expected_return = 0.0;
        let result = simulator.simulate(&req).unwrap();

        assert_eq!(result.paths.len(), 100);
        for path in &result.paths {
            assert_eq!(path.len(), 11);
            assert_eq!(*path.last().unwrap(), 10_000.0);
        }
        assert_eq!(result.mean_final_value, 10_000.0);
        assert_eq!(result.mean_return, 0.0);
        assert_eq!(result.probability_of_loss, 0.0);
    }

    #[rstest]
    fn test_paths_start_at_initial_value(simulator: MonteCarloSimulator) {
        let result = simulator.simulate(&request(50, 20, 0.01)).unwrap();
        assert!(result.paths.iter().all(|p| p[0] == 10_000.0 && p.len() == 21));
    }

    #[rstest]
    fn test_percentiles_are_ordered(simulator: MonteCarloSimulator) {
        let result = simulator.simulate(&request(2000, 30, 0.02)).unwrap();
        let p = result.percentiles;
        assert!(p.p5 <= p.p25 && p.p25 <= p.p50 && p.p50 <= p.p75 && p.p75 <= p.p95);
        assert!(p.p5 < 10_000.0 && p.p95 > 10_000.0);
        assert!((0.0..=1.0).contains(&result.probability_of_loss));
        assert_eq!(result.simulation_count, 2000);
    }

    #[rstest]
    fn test_path_cap_keeps_full_statistics() {
        let simulator = MonteCarloSimulator::new(MonteCarloConfig {
            max_returned_paths: 10,
            seed: Some(7),
            ..MonteCarloConfig::default()
        });
        let result = simulator.simulate(&request(500, 5, 0.01)).unwrap();
        assert_eq!(result.paths.len(), 10);
        assert_eq!(result.simulation_count, 500);

        let mut req = request(500, 5, 0.01);
        req.max_paths = Some(3);
        assert_eq!(simulator.simulate(&req).unwrap().paths.len(), 3);
    }

    #[rstest]
    fn test_seed_reproducibility(simulator: MonteCarloSimulator) {
        let first = simulator.simulate(&request(100, 12, 0.02)).unwrap();
        let second = simulator.simulate(&request(100, 12, 0.02)).unwrap();
        assert_eq!(first, second);

        let mut req = request(100, 12, 0.02);
        req.seed = Some(99);
        assert_ne!(simulator.simulate(&req).unwrap().paths, first.paths);
    }
}

mod validation_tests {
    use super::*;

    #[rstest]
    #[case(0, 10)]
    #[case(-5, 10)]
    #[case(10, 0)]
    #[case(10, -1)]
    fn test_non_positive_counts_rejected(
        simulator: MonteCarloSimulator,
        #[case] simulations: i64,
        #[case] time_horizon: i64,
    ) {
        assert!(matches!(
            simulator.simulate(&request(simulations, time_horizon, 0.01)),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[rstest]
    fn test_bad_initial_value_rejected(simulator: MonteCarloSimulator) {
        let mut req = request(10, 10, 0.01);
        req.initial_value = 0.0;
        assert!(simulator.simulate(&req).is_err());
        req.initial_value = f64::NAN;
        assert!(simulator.simulate(&req).is_err());
    }

    #[rstest]
    fn test_negative_volatility_rejected(simulator: MonteCarloSimulator) {
        assert!(simulator.simulate(&request(10, 10, -0.1)).is_err());
    }

    #[rstest]
    #[case(4_000_000_000_000_000, 10)]
    #[case(i64::MAX, 10)]
    #[case(10, 4_000_000_000_000_000)]
    fn test_oversized_counts_rejected_before_allocating(
        simulator: MonteCarloSimulator,
        #[case] simulations: i64,
        #[case] time_horizon: i64,
    ) {
        let err = simulator
            .simulate(&request(simulations, time_horizon, 0.01))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(ref msg) if msg.contains("exceeds the limit")));
    }

    #[rstest]
    fn test_configured_limits_are_inclusive() {
        let simulator = MonteCarloSimulator::new(MonteCarloConfig {
            max_simulations: 20,
            max_time_horizon: 5,
            seed: Some(3),
            ..MonteCarloConfig::default()
        });
        assert_eq!(simulator.simulate(&request(20, 5, 0.01)).unwrap().simulation_count, 20);
        assert!(simulator.simulate(&request(21, 5, 0.01)).is_err());
        assert!(simulator.simulate(&request(20, 6, 0.01)).is_err());
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(1001)]
    fn test_max_paths_outside_configured_cap_rejected(simulator: MonteCarloSimulator, #[case] max_paths: i64) {
        let mut req = request(10, 5, 0.01);
        req.max_paths = Some(max_paths);
        assert!(matches!(simulator.simulate(&req), Err(EngineError::InvalidInput(_))));
    }
}
