//! Boundaries the decision cycle consumes: forecasters and the pool size.

use std::sync::RwLock;

use capgrid_core::{Forecast, ForecastUnit, PoolSize};
use chrono::{DateTime, Utc};

use crate::error::ForecastError;

/// Produces a capacity forecast for one decision cycle.
///
/// `id()` must be stable; it names the forecaster's binding in the
/// aggregation expression.
pub trait Forecaster: Send + Sync {
    fn id(&self) -> &str;

    fn predict(
        &self,
        pool: Option<PoolSize>,
        decision_time: DateTime<Utc>,
    ) -> Result<Option<Forecast>, ForecastError>;
}

/// Supplies the current pool size once per cycle.
pub trait PoolSizeSource: Send + Sync {
    fn pool_size(&self) -> Option<PoolSize>;
}

/// A forecaster that always predicts the same value, stamped with the
/// decision time.
#[derive(Debug, Clone)]
pub struct StaticForecaster {
    id: String,
    metric: String,
    unit: ForecastUnit,
    value: Option<f64>,
}

impl StaticForecaster {
    /// Predicts `value` in units of `metric`.
    pub fn metric(id: impl Into<String>, metric: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            metric: metric.into(),
            unit: ForecastUnit::Metric,
            value: Some(value),
        }
    }

    /// Predicts `value` compute units.
    pub fn compute_units(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            metric: String::new(),
            unit: ForecastUnit::ComputeUnits,
            value: Some(value),
        }
    }

    /// Never has a prediction.
    pub fn absent(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metric: String::new(),
            unit: ForecastUnit::ComputeUnits,
            value: None,
        }
    }
}

impl Forecaster for StaticForecaster {
    fn id(&self) -> &str {
        &self.id
    }

    fn predict(
        &self,
        _pool: Option<PoolSize>,
        decision_time: DateTime<Utc>,
    ) -> Result<Option<Forecast>, ForecastError> {
        Ok(self.value.map(|value| match self.unit {
            ForecastUnit::Metric => Forecast::metric(self.metric.clone(), value, decision_time),
            ForecastUnit::ComputeUnits => {
                Forecast::compute_units(self.metric.clone(), value, decision_time)
            }
        }))
    }
}

/// Pool size updated by whoever observes the pool.
#[derive(Debug, Default)]
pub struct SharedPoolSize {
    current: RwLock<Option<PoolSize>>,
}

impl SharedPoolSize {
    pub fn new(pool: Option<PoolSize>) -> Self {
        Self {
            current: RwLock::new(pool),
        }
    }

    pub fn set(&self, pool: PoolSize) {
        *self.current.write().expect("pool size lock") = Some(pool);
    }

    pub fn clear(&self) {
        *self.current.write().expect("pool size lock") = None;
    }
}

impl PoolSizeSource for SharedPoolSize {
    fn pool_size(&self) -> Option<PoolSize> {
        *self.current.read().expect("pool size lock")
    }
}
