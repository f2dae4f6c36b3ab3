//! capgrid-core — shared data model and configuration for the capgrid
//! decision pipeline.
//!
//! Every other capgrid crate speaks in terms of the types defined here:
//! a [`Forecast`] produced by a forecaster, the [`PoolSize`] snapshot of
//! the managed pool, and the configuration sections that drive the
//! capacity mapper, aggregator, and scaling policy enforcer.

pub mod config;
pub mod configurable;
pub mod duration;
pub mod types;

pub use config::{AggregatorConfig, CapacityMappingEntry, CapgridConfig, ScalingPoliciesConfig};
pub use configurable::{ConfigError, ConfigResult, Configurable};
pub use duration::{format_duration, parse_duration};
pub use types::*;
