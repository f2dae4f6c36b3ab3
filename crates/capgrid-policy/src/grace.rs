//! Overprovisioning grace-period policy — a scale-down is only honored
//! once scale-down candidates have persisted for the grace period.
//!
//! ```text
//!            scale-down                   scale-down, elapsed >= grace
//! NotTracking ─────────▶ Tracking{since} ─────────────────────────────▶ pass through
//!      ▲      (suppress)      │    ▲       (clock keeps running)
//!      │                      │    └── scale-down, elapsed < grace (suppress)
//!      └── not a scale-down / no candidate
//! ```
//!
//! Once the grace period has elapsed the tracker is left armed with its
//! original start time, so every following consecutive scale-down passes
//! straight through until a non-scale-down candidate resets it.

use std::sync::Mutex;
use std::time::Duration;

use capgrid_core::PoolSize;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::policy::ScalingPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraceState {
    #[default]
    NotTracking,
    Tracking {
        since: DateTime<Utc>,
    },
}

/// One step of the grace-period state machine for a present candidate.
///
/// Returns the next state and whether the candidate passes through (as
/// opposed to the desired size being kept).
pub fn transition(
    state: GraceState,
    is_scale_down: bool,
    now: DateTime<Utc>,
    grace_period: Duration,
) -> (GraceState, bool) {
    if !is_scale_down {
        return (GraceState::NotTracking, true);
    }
    match state {
        GraceState::NotTracking => (GraceState::Tracking { since: now }, false),
        GraceState::Tracking { since } => {
            let elapsed = now - since;
            // A grace period too large for chrono never elapses.
            let elapsed_enough =
                TimeDelta::from_std(grace_period).is_ok_and(|grace| elapsed >= grace);
            (state, elapsed_enough)
        }
    }
}

/// Holds back scale-downs until they persist for `grace_period`, measured
/// in decision time.
#[derive(Debug)]
pub struct OverprovisioningGracePeriodPolicy {
    grace_period: Duration,
    state: Mutex<GraceState>,
}

impl OverprovisioningGracePeriodPolicy {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            grace_period,
            state: Mutex::new(GraceState::NotTracking),
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn state(&self) -> GraceState {
        *self.state.lock().expect("grace state lock")
    }
}

impl ScalingPolicy for OverprovisioningGracePeriodPolicy {
    fn name(&self) -> &str {
        "overprovisioning-grace-period"
    }

    fn apply(
        &self,
        pool: Option<PoolSize>,
        candidate: Option<f64>,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        let mut state = self.state.lock().expect("grace state lock");

        let Some(candidate) = candidate else {
            *state = GraceState::NotTracking;
            return None;
        };
        let Some(pool) = pool else {
            return Some(candidate);
        };

        let desired = f64::from(pool.desired);
        let is_scale_down = candidate.ceil() < desired;
        let (next, pass_through) = transition(*state, is_scale_down, now, self.grace_period);

        if is_scale_down {
            match (*state, next) {
                (GraceState::NotTracking, GraceState::Tracking { .. }) => {
                    debug!(desired, candidate, "scale-down seen, grace period started");
                }
                (_, GraceState::Tracking { since }) if pass_through => {
                    debug!(desired, candidate, %since, "grace period elapsed, allowing scale-down");
                }
                _ => debug!(desired, candidate, "scale-down held back by grace period"),
            }
        }
        *state = next;

        if pass_through {
            Some(candidate)
        } else {
            Some(desired)
        }
    }
}
