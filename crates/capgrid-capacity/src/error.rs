//! Capacity conversion error types.

use capgrid_core::ConfigError;
use thiserror::Error;

/// Errors that can occur while converting capacity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapacityError {
    #[error("unrecognized metric: {0}")]
    UnrecognizedMetric(String),

    #[error("no compute-unit capacity configured for metric `{0}`")]
    UnmappedMetric(String),

    #[error("capacity for metric `{metric}` must be non-negative, got {capacity}")]
    NegativeCapacity { metric: String, capacity: f64 },

    #[error("capacity mapper used before it was configured")]
    NotConfigured,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type CapacityResult<T> = Result<T, CapacityError>;
