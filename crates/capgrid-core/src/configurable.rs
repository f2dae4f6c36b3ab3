//! The validate/configure contract shared by every configurable
//! pipeline component.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while validating or applying configuration.
///
/// A configuration error always leaves the component's previous
/// configuration in place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid aggregation expression `{expression}`: {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("capacity mapping is missing a metric name")]
    MissingMetric,

    #[error("capacity rate for metric `{metric}` must be positive, got {rate}")]
    InvalidCapacityRate { metric: String, rate: f64 },

    #[error("metric `{0}` is already mapped")]
    DuplicateMapping(String),

    #[error("machine delta tolerance must be a non-negative number, got {0}")]
    InvalidTolerance(f64),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),
}

/// A component whose behaviour is driven by a replaceable configuration.
///
/// `configure` must run the same checks as `validate` before touching any
/// state, and replaces the whole configuration at once.
///
/// Until the first successful `configure`, a component's working
/// operations fail with its `NotConfigured` error. One exception holds
/// for pass-through operations: an absent input yields an absent output
/// whether or not the component is configured, since no configuration
/// is consulted. Anything present still fails fast.
pub trait Configurable {
    type Config: Clone;

    /// Check a configuration without applying it.
    fn validate(&self, config: &Self::Config) -> ConfigResult<()>;

    /// Validate and atomically install a new configuration.
    fn configure(&self, config: Self::Config) -> ConfigResult<()>;

    /// The active configuration, if one has been installed.
    fn configuration(&self) -> Option<Self::Config>;
}
