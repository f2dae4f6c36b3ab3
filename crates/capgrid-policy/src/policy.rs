//! The scaling policy seam.

use std::fmt;

use capgrid_core::PoolSize;
use chrono::{DateTime, Utc};

/// A damping or guard transform applied to a candidate decision.
///
/// `pool` is the current pool snapshot, absent when the pool backend could
/// not be reached. An absent candidate means "no decision" and policies
/// must keep it absent. `now` is the decision time of the cycle; stateful
/// policies measure elapsed time against it and nothing else.
pub trait ScalingPolicy: Send + Sync + fmt::Debug {
    /// Name of the policy for logging and identification.
    fn name(&self) -> &str;

    /// Return the (possibly damped) decision.
    fn apply(
        &self,
        pool: Option<PoolSize>,
        candidate: Option<f64>,
        now: DateTime<Utc>,
    ) -> Option<f64>;
}
