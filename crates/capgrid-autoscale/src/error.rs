//! Decision-cycle error types.

use capgrid_aggregate::AggregatorError;
use capgrid_capacity::CapacityError;
use capgrid_core::{ConfigError, ForecasterId};
use capgrid_policy::PolicyError;
use thiserror::Error;

/// Errors that abandon a decision cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    #[error("forecast of `{forecaster}` could not be converted: {source}")]
    Capacity {
        forecaster: ForecasterId,
        #[source]
        source: CapacityError,
    },

    #[error(transparent)]
    Aggregation(#[from] AggregatorError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type DecisionResult<T> = Result<T, DecisionError>;

/// A forecaster could not produce a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("forecaster `{forecaster}` failed: {reason}")]
pub struct ForecastError {
    pub forecaster: ForecasterId,
    pub reason: String,
}

impl ForecastError {
    pub fn new(forecaster: impl Into<ForecasterId>, reason: impl Into<String>) -> Self {
        Self {
            forecaster: forecaster.into(),
            reason: reason.into(),
        }
    }
}
