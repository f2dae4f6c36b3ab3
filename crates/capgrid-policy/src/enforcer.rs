//! Scaling policy enforcer — builds the policy chain from configuration.

use std::sync::{Arc, RwLock};

use capgrid_core::{ConfigResult, Configurable, PoolSize, ScalingPoliciesConfig, format_duration};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::chain::PolicyChain;
use crate::error::{PolicyError, PolicyResult};
use crate::grace::OverprovisioningGracePeriodPolicy;
use crate::policy::ScalingPolicy;
use crate::tolerance::DeltaTolerancePolicy;

/// A configuration together with the chain built from it.
#[derive(Debug)]
struct ActiveChain {
    config: ScalingPoliciesConfig,
    chain: PolicyChain,
}

/// Applies the configured chain of scaling policies.
///
/// Reconfiguring builds a brand-new chain, so stateful policies start
/// over from their initial state.
#[derive(Debug, Default)]
pub struct ScalingPolicyEnforcer {
    active: RwLock<Option<Arc<ActiveChain>>>,
}

impl ScalingPolicyEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the candidate through the chain at decision time `now`.
    pub fn apply(
        &self,
        pool: Option<PoolSize>,
        candidate: Option<f64>,
        now: DateTime<Utc>,
    ) -> PolicyResult<Option<f64>> {
        let active = self
            .active
            .read()
            .expect("policy chain lock")
            .clone()
            .ok_or(PolicyError::NotConfigured)?;
        Ok(active.chain.apply(pool, candidate, now))
    }

    /// Names of the active policies, in application order.
    pub fn policy_names(&self) -> Vec<String> {
        self.active
            .read()
            .expect("policy chain lock")
            .as_ref()
            .map(|a| a.chain.names().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn build_chain(config: &ScalingPoliciesConfig) -> PolicyChain {
        let mut policies: Vec<Box<dyn ScalingPolicy>> = Vec::new();
        // Tolerance first: the grace period only sees candidates that
        // survived tolerance filtering.
        if config.machine_delta_tolerance > 0.0 {
            policies.push(Box::new(DeltaTolerancePolicy::new(
                config.machine_delta_tolerance,
            )));
        }
        if !config.overprovisioning_grace_period.is_zero() {
            policies.push(Box::new(OverprovisioningGracePeriodPolicy::new(
                config.overprovisioning_grace_period,
            )));
        }
        PolicyChain::new(policies)
    }
}

impl Configurable for ScalingPolicyEnforcer {
    type Config = ScalingPoliciesConfig;

    fn validate(&self, config: &Self::Config) -> ConfigResult<()> {
        config.validate()
    }

    fn configure(&self, config: Self::Config) -> ConfigResult<()> {
        self.validate(&config)?;
        let chain = Self::build_chain(&config);
        info!(
            tolerance = config.machine_delta_tolerance,
            grace_period = %format_duration(config.overprovisioning_grace_period),
            policies = ?chain.names(),
            "scaling policies configured"
        );
        *self.active.write().expect("policy chain lock") = Some(Arc::new(ActiveChain { config, chain }));
        Ok(())
    }

    fn configuration(&self) -> Option<Self::Config> {
        self.active
            .read()
            .expect("policy chain lock")
            .as_ref()
            .map(|a| a.config.clone())
    }
}
