//! Domain types shared across the decision pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a forecaster. Used as the binding name of its
/// prediction inside the aggregation expression.
pub type ForecasterId = String;

/// The scale a forecast value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastUnit {
    /// The monitored metric's native scale (e.g. requests/sec).
    Metric,
    /// An equivalent count of homogeneous pool members.
    ComputeUnits,
}

/// A single predicted capacity value.
///
/// Forecasts are immutable: conversions produce a new value through
/// [`Forecast::with_value`] and leave the original untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    value: f64,
    unit: ForecastUnit,
    metric: String,
    timestamp: DateTime<Utc>,
}

impl Forecast {
    /// A forecast expressed in the metric's native units.
    pub fn metric(metric: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            unit: ForecastUnit::Metric,
            metric: metric.into(),
            timestamp,
        }
    }

    /// A forecast already expressed in compute units.
    pub fn compute_units(metric: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            unit: ForecastUnit::ComputeUnits,
            metric: metric.into(),
            timestamp,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> ForecastUnit {
        self.unit
    }

    pub fn metric_name(&self) -> &str {
        &self.metric
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_compute_units(&self) -> bool {
        self.unit == ForecastUnit::ComputeUnits
    }

    /// Copy of this forecast with a new value and unit. Metric name and
    /// timestamp are carried over.
    pub fn with_value(&self, value: f64, unit: ForecastUnit) -> Self {
        Self {
            value,
            unit,
            metric: self.metric.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Current state of the managed pool, as reported by the pool backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSize {
    /// Size the pool has been asked to reach.
    pub desired: u32,
    /// Members currently running.
    pub active: u32,
}

impl PoolSize {
    pub fn new(desired: u32, active: u32) -> Self {
        Self { desired, active }
    }
}
