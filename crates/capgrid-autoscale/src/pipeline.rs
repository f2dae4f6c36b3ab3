//! Decision pipeline — capacity mapping, aggregation and scaling policies
//! composed into one synchronous decision.

use std::collections::BTreeMap;

use capgrid_aggregate::Aggregator;
use capgrid_capacity::CapacityMapper;
use capgrid_core::{CapgridConfig, ConfigResult, Configurable, Forecast, ForecasterId, PoolSize};
use capgrid_policy::ScalingPolicyEnforcer;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{DecisionError, DecisionResult};

/// The three configurable stages of a decision cycle.
#[derive(Debug, Default)]
pub struct DecisionPipeline {
    mapper: CapacityMapper,
    aggregator: Aggregator,
    enforcer: ScalingPolicyEnforcer,
}

impl DecisionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pipeline configured from `config`.
    pub fn from_config(config: CapgridConfig) -> ConfigResult<Self> {
        let pipeline = Self::new();
        pipeline.apply_config(config)?;
        Ok(pipeline)
    }

    pub fn mapper(&self) -> &CapacityMapper {
        &self.mapper
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn enforcer(&self) -> &ScalingPolicyEnforcer {
        &self.enforcer
    }

    /// Run one decision.
    ///
    /// `Ok(None)` means no resize this cycle. The enforcer runs even when
    /// there is no aggregate, so stateful policies see the gap.
    /// `decision_time` is the only notion of "now" the policies use.
    pub fn decide(
        &self,
        forecasts: &BTreeMap<ForecasterId, Option<Forecast>>,
        pool: Option<PoolSize>,
        decision_time: DateTime<Utc>,
    ) -> DecisionResult<Option<f64>> {
        let mut converted = BTreeMap::new();
        for (id, forecast) in forecasts {
            let units = self
                .mapper
                .to_compute_units(forecast.as_ref())
                .map_err(|source| DecisionError::Capacity {
                    forecaster: id.clone(),
                    source,
                })?;
            converted.insert(id.clone(), units);
        }

        let aggregate = self.aggregator.aggregate(&converted, decision_time)?;
        let decision = self.enforcer.apply(pool, aggregate, decision_time)?;

        debug!(
            forecasters = forecasts.len(),
            aggregate = ?aggregate,
            decision = ?decision,
            "decision computed"
        );
        Ok(decision)
    }

    /// Check every section of `config` without touching the live stages.
    pub fn validate_config(&self, config: &CapgridConfig) -> ConfigResult<()> {
        self.mapper.validate(&config.capacity)?;
        self.aggregator.validate(&config.aggregator)?;
        self.enforcer.validate(&config.scaling_policies)?;
        Ok(())
    }

    /// Reconfigure all stages. Nothing changes unless every section is
    /// valid.
    pub fn apply_config(&self, config: CapgridConfig) -> ConfigResult<()> {
        self.validate_config(&config)?;

        let CapgridConfig {
            aggregator,
            capacity,
            scaling_policies,
        } = config;
        let mappings = capacity.len();
        self.mapper.configure(capacity)?;
        self.aggregator.configure(aggregator)?;
        self.enforcer.configure(scaling_policies)?;

        info!(
            mappings,
            policies = ?self.enforcer.policy_names(),
            "decision pipeline configured"
        );
        Ok(())
    }

    /// The active configuration, if every stage has been configured.
    pub fn configuration(&self) -> Option<CapgridConfig> {
        Some(CapgridConfig {
            aggregator: self.aggregator.configuration()?,
            capacity: self.mapper.configuration()?,
            scaling_policies: self.enforcer.configuration()?,
        })
    }
}
