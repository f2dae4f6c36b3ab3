//! Delta-tolerance policy — treats small changes as noise.

use capgrid_core::PoolSize;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::policy::ScalingPolicy;

/// Suppresses candidates within `tolerance` of the pool's desired size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaTolerancePolicy {
    tolerance: f64,
}

impl DeltaTolerancePolicy {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl ScalingPolicy for DeltaTolerancePolicy {
    fn name(&self) -> &str {
        "delta-tolerance"
    }

    fn apply(
        &self,
        pool: Option<PoolSize>,
        candidate: Option<f64>,
        _now: DateTime<Utc>,
    ) -> Option<f64> {
        let candidate = candidate?;
        let Some(pool) = pool else {
            warn!(candidate, "pool size unavailable, delta tolerance not applied");
            return Some(candidate);
        };

        let desired = f64::from(pool.desired);
        let delta = desired - candidate;
        if delta.abs() <= self.tolerance {
            debug!(
                desired,
                candidate,
                tolerance = self.tolerance,
                "change within tolerance, keeping desired size"
            );
            return Some(desired);
        }
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: Option<PoolSize> = Some(PoolSize {
        desired: 10,
        active: 10,
    });

    fn apply(
        policy: &DeltaTolerancePolicy,
        pool: Option<PoolSize>,
        candidate: Option<f64>,
    ) -> Option<f64> {
        policy.apply(pool, candidate, Utc::now())
    }

    #[test]
    fn small_change_is_suppressed() {
        let policy = DeltaTolerancePolicy::new(2.0);
        assert_eq!(apply(&policy, POOL, Some(11.0)), Some(10.0));
        assert_eq!(apply(&policy, POOL, Some(8.0)), Some(10.0));
    }

    #[test]
    fn large_change_passes_through() {
        let policy = DeltaTolerancePolicy::new(2.0);
        assert_eq!(apply(&policy, POOL, Some(13.0)), Some(13.0));
        assert_eq!(apply(&policy, POOL, Some(7.5)), Some(7.5));
    }

    #[test]
    fn absent_candidate_stays_absent() {
        let policy = DeltaTolerancePolicy::new(2.0);
        assert_eq!(apply(&policy, POOL, None), None);
        assert_eq!(apply(&policy, None, None), None);
    }

    #[test]
    fn missing_pool_passes_candidate_through() {
        let policy = DeltaTolerancePolicy::new(2.0);
        assert_eq!(apply(&policy, None, Some(11.0)), Some(11.0));
    }
}
