//! Aggregator — evaluates the configured expression over all forecasts of
//! a decision cycle.
//!
//! The evaluation context is rebuilt from scratch on every call:
//!
//! ```text
//! <forecaster id> = { forecaster: "<id>", prediction: <value> }   (one per forecaster)
//! input           = { timestamp: <decision time, epoch ms>,
//!                     predictions: [ <each forecaster record> ] }
//! predictions     = [ <each prediction value> ]
//! ```
//!
//! `input.predictions` and `predictions` follow forecaster id order.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use capgrid_core::{AggregatorConfig, ConfigError, ConfigResult, Configurable, Forecast, ForecasterId};
use capgrid_expr::{Bindings, NumericEvaluator, ScriptEngine, Value};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{AggregatorError, AggregatorResult};

/// Name of the binding holding the decision time and all predictions.
pub const INPUT_BINDING: &str = "input";
/// Name of the binding holding the bare prediction values.
pub const PREDICTIONS_BINDING: &str = "predictions";

/// Combines per-forecaster forecasts into one aggregate number.
#[derive(Debug)]
pub struct Aggregator<E = ScriptEngine> {
    engine: E,
    config: RwLock<Option<Arc<AggregatorConfig>>>,
}

impl Aggregator<ScriptEngine> {
    pub fn new() -> Self {
        Self::with_engine(ScriptEngine::new())
    }
}

impl Default for Aggregator<ScriptEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: NumericEvaluator> Aggregator<E> {
    /// An unconfigured aggregator backed by `engine`.
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            config: RwLock::new(None),
        }
    }

    /// Aggregate one forecast per forecaster.
    ///
    /// Returns `Ok(None)` when there is nothing to aggregate or when any
    /// forecaster produced no forecast.
    pub fn aggregate(
        &self,
        forecasts: &BTreeMap<ForecasterId, Option<Forecast>>,
        decision_time: DateTime<Utc>,
    ) -> AggregatorResult<Option<f64>> {
        let config = self
            .config
            .read()
            .expect("aggregator config lock")
            .clone()
            .ok_or(AggregatorError::NotConfigured)?;

        if forecasts.is_empty() {
            debug!("no forecasts to aggregate");
            return Ok(None);
        }

        let mut present = Vec::with_capacity(forecasts.len());
        for (id, forecast) in forecasts {
            match forecast {
                Some(f) => present.push((id, f)),
                None => {
                    debug!(forecaster = %id, "forecast missing, skipping aggregation");
                    return Ok(None);
                }
            }
        }

        let bindings = build_bindings(&present, decision_time);
        let aggregate = self
            .engine
            .evaluate(&config.expression, &bindings)
            .map_err(|source| AggregatorError::Evaluation {
                expression: config.expression.clone(),
                source,
            })?;

        debug!(
            forecasters = present.len(),
            aggregate,
            "aggregated forecasts"
        );
        Ok(Some(aggregate))
    }
}

fn build_bindings(present: &[(&ForecasterId, &Forecast)], decision_time: DateTime<Utc>) -> Bindings {
    let mut bindings = Bindings::with_capacity(present.len() + 2);
    let mut records = Vec::with_capacity(present.len());
    let mut values = Vec::with_capacity(present.len());

    for (id, forecast) in present {
        let record = Value::record([
            ("forecaster", Value::from(id.as_str())),
            ("prediction", Value::Number(forecast.value())),
        ]);
        bindings.insert((*id).clone(), record.clone());
        records.push(record);
        values.push(Value::Number(forecast.value()));
    }

    for reserved in [INPUT_BINDING, PREDICTIONS_BINDING] {
        if bindings.contains_key(reserved) {
            warn!(forecaster = reserved, "forecaster id shadowed by reserved binding");
        }
    }

    bindings.insert(
        INPUT_BINDING.to_string(),
        Value::record([
            ("timestamp", Value::Number(decision_time.timestamp_millis() as f64)),
            ("predictions", Value::Array(records)),
        ]),
    );
    bindings.insert(PREDICTIONS_BINDING.to_string(), Value::Array(values));
    bindings
}

impl<E: NumericEvaluator> Configurable for Aggregator<E> {
    type Config = AggregatorConfig;

    fn validate(&self, config: &Self::Config) -> ConfigResult<()> {
        self.engine
            .check(&config.expression)
            .map_err(|e| ConfigError::InvalidExpression {
                expression: config.expression.clone(),
                reason: e.to_string(),
            })
    }

    fn configure(&self, config: Self::Config) -> ConfigResult<()> {
        self.validate(&config)?;
        debug!(expression = %config.expression, "aggregator configured");
        *self.config.write().expect("aggregator config lock") = Some(Arc::new(config));
        Ok(())
    }

    fn configuration(&self) -> Option<Self::Config> {
        self.config
            .read()
            .expect("aggregator config lock")
            .as_deref()
            .cloned()
    }
}
