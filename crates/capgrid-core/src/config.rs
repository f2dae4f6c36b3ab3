//! capgrid.toml configuration parser.
//!
//! ```toml
//! [aggregator]
//! expression = "max(predictions)"
//!
//! [[capacity]]
//! metric = "rps"
//! amount_per_compute_unit = 250.0
//!
//! [scaling_policies]
//! machine_delta_tolerance = 1.0
//! overprovisioning_grace_period = "10m"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::configurable::{ConfigError, ConfigResult};

/// Full configuration of one autoscaler instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapgridConfig {
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub capacity: Vec<CapacityMappingEntry>,
    #[serde(default, alias = "scalingPolicies")]
    pub scaling_policies: ScalingPoliciesConfig,
}

/// Scripted combination of all forecasts of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub expression: String,
}

impl AggregatorConfig {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

/// Capacity supplied by one compute unit for a given metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityMappingEntry {
    #[serde(default)]
    pub metric: String,
    #[serde(alias = "amountPerComputeUnit")]
    pub amount_per_compute_unit: f64,
}

impl CapacityMappingEntry {
    pub fn new(metric: impl Into<String>, amount_per_compute_unit: f64) -> Self {
        Self {
            metric: metric.into(),
            amount_per_compute_unit,
        }
    }

    /// Metric must be named and its rate strictly positive.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.metric.trim().is_empty() {
            return Err(ConfigError::MissingMetric);
        }
        // `!(x > 0)` also rejects NaN.
        if !(self.amount_per_compute_unit > 0.0) || self.amount_per_compute_unit.is_infinite() {
            return Err(ConfigError::InvalidCapacityRate {
                metric: self.metric.clone(),
                rate: self.amount_per_compute_unit,
            });
        }
        Ok(())
    }
}

/// Damping applied to the aggregate before it becomes a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingPoliciesConfig {
    #[serde(default, alias = "machineDeltaTolerance")]
    pub machine_delta_tolerance: f64,
    #[serde(
        default,
        alias = "overprovisioningGracePeriod",
        with = "crate::duration::serde_str"
    )]
    pub overprovisioning_grace_period: Duration,
}

impl Default for ScalingPoliciesConfig {
    fn default() -> Self {
        Self {
            machine_delta_tolerance: 0.0,
            overprovisioning_grace_period: Duration::ZERO,
        }
    }
}

impl ScalingPoliciesConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let tolerance = self.machine_delta_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }
        Ok(())
    }
}

impl CapgridConfig {
    /// Load from a TOML file, or JSON when the extension is `.json`.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
