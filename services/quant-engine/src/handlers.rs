//! Typed request union and the engine's message router

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::monte_carlo::MonteCarloSimulator;
use crate::optimization::PortfolioOptimizer;
use crate::types::{IndicatorRequest, MonteCarloRequest, OptimizationRequest, RiskRequest};
use crate::{indicators, risk};
use serde::Serialize;
use serde_json::Value;
use services_common::{MessageRouter, RequestEnvelope, ResponseEnvelope};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Request type tags served by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    PortfolioOptimization,
    RiskMetrics,
    MonteCarlo,
    TechnicalIndicators,
}

impl RequestType {
    pub const ALL: [RequestType; 4] = [
        Self::PortfolioOptimization,
        Self::RiskMetrics,
        Self::MonteCarlo,
        Self::TechnicalIndicators,
    ];

    /// Wire tag
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PortfolioOptimization => "PORTFOLIO_OPTIMIZATION",
            Self::RiskMetrics => "RISK_METRICS",
            Self::MonteCarlo => "MONTE_CARLO",
            Self::TechnicalIndicators => "TECHNICAL_INDICATORS",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EngineError::UnknownRequestType(s.to_string()))
    }
}

/// A decoded request, one variant per operation
#[derive(Debug, Clone, PartialEq)]
pub enum QuantRequest {
    PortfolioOptimization(OptimizationRequest),
    RiskMetrics(RiskRequest),
    MonteCarlo(MonteCarloRequest),
    TechnicalIndicators(IndicatorRequest),
}

impl QuantRequest {
    /// Decode the payload of a request whose tag is `kind`
    pub fn decode(kind: &str, data: Value) -> EngineResult<Self> {
        let request = match kind.parse::<RequestType>()? {
            RequestType::PortfolioOptimization => {
                Self::PortfolioOptimization(serde_json::from_value(data)?)
            }
            RequestType::RiskMetrics => Self::RiskMetrics(serde_json::from_value(data)?),
            RequestType::MonteCarlo => Self::MonteCarlo(serde_json::from_value(data)?),
            RequestType::TechnicalIndicators => {
                Self::TechnicalIndicators(serde_json::from_value(data)?)
            }
        };
        Ok(request)
    }

    pub fn request_type(&self) -> RequestType {
        match self {
            Self::PortfolioOptimization(_) => RequestType::PortfolioOptimization,
            Self::RiskMetrics(_) => RequestType::RiskMetrics,
            Self::MonteCarlo(_) => RequestType::MonteCarlo,
            Self::TechnicalIndicators(_) => RequestType::TechnicalIndicators,
        }
    }
}

/// Routes engine requests to the calculation modules.
///
/// Built once per worker; holds only immutable configuration.
#[derive(Debug, Clone)]
pub struct QuantRouter {
    config: EngineConfig,
    optimizer: PortfolioOptimizer,
    simulator: MonteCarloSimulator,
}

impl QuantRouter {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            optimizer: PortfolioOptimizer::new(config.optimization.clone()),
            simulator: MonteCarloSimulator::new(config.monte_carlo.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a decoded request and serialize its result
    pub fn handle(&self, request: &QuantRequest) -> EngineResult<Value> {
        match request {
            QuantRequest::PortfolioOptimization(req) => to_value(&self.optimizer.optimize(req)?),
            QuantRequest::RiskMetrics(req) => to_value(&risk::compute(req, &self.config.risk)?),
            QuantRequest::MonteCarlo(req) => to_value(&self.simulator.simulate(req)?),
            QuantRequest::TechnicalIndicators(req) => {
                to_value(&indicators::compute(req, &self.config.indicators)?)
            }
        }
    }

    /// Decode, run and wrap one envelope; never fails
    pub fn dispatch(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        let RequestEnvelope { id, kind, data } = envelope;
        let outcome = QuantRequest::decode(&kind, data).and_then(|request| {
            debug!(request_type = %request.request_type(), "Handling request");
            self.handle(&request)
        });

        match outcome {
            Ok(data) => ResponseEnvelope::success(id, data),
            Err(err) => ResponseEnvelope::error(id, err.to_string()),
        }
    }
}

impl MessageRouter for QuantRouter {
    fn route(&self, request: RequestEnvelope) -> ResponseEnvelope {
        self.dispatch(request)
    }

    fn name(&self) -> &str {
        "quant-engine"
    }

    fn serves(&self, kind: &str) -> bool {
        kind.parse::<RequestType>().is_ok()
    }
}

fn to_value<T: Serialize>(result: &T) -> EngineResult<Value> {
    Ok(serde_json::to_value(result)?)
}
