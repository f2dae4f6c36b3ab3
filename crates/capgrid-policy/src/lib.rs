//! capgrid-policy — damping applied to the aggregate before it becomes a
//! resize decision.
//!
//! # Components
//!
//! - **`policy`** — the `ScalingPolicy` trait
//! - **`tolerance`** — `DeltaTolerancePolicy`, ignores changes too small to act on
//! - **`grace`** — `OverprovisioningGracePeriodPolicy`, holds back scale-downs
//!   until they have persisted for the grace period
//! - **`chain`** — `PolicyChain`, ordered composition
//! - **`enforcer`** — `ScalingPolicyEnforcer`, builds the chain from
//!   [`ScalingPoliciesConfig`](capgrid_core::ScalingPoliciesConfig)
//!
//! Tolerance always runs before the grace period, so small fluctuations
//! never arm or disarm the grace-period tracker. Policies measure time
//! only by the decision time they are handed.

pub mod chain;
pub mod enforcer;
pub mod error;
pub mod grace;
pub mod policy;
pub mod tolerance;

pub use chain::PolicyChain;
pub use enforcer::ScalingPolicyEnforcer;
pub use error::{PolicyError, PolicyResult};
pub use grace::{GraceState, OverprovisioningGracePeriodPolicy};
pub use policy::ScalingPolicy;
pub use tolerance::DeltaTolerancePolicy;
