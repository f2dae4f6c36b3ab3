//! Ordered composition of scaling policies.

use capgrid_core::PoolSize;
use chrono::{DateTime, Utc};

use crate::policy::ScalingPolicy;

/// Threads a candidate through each policy in turn. Every policy sees the
/// same pool snapshot and decision time.
#[derive(Debug, Default)]
pub struct PolicyChain {
    policies: Vec<Box<dyn ScalingPolicy>>,
}

impl PolicyChain {
    pub fn new(policies: Vec<Box<dyn ScalingPolicy>>) -> Self {
        Self { policies }
    }

    /// Names of the policies, in application order.
    pub fn names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl ScalingPolicy for PolicyChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn apply(
        &self,
        pool: Option<PoolSize>,
        candidate: Option<f64>,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        self.policies
            .iter()
            .fold(candidate, |candidate, policy| policy.apply(pool, candidate, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adds a constant, to observe ordering.
    #[derive(Debug)]
    struct Offset(f64);

    impl ScalingPolicy for Offset {
        fn name(&self) -> &str {
            "offset"
        }

        fn apply(
            &self,
            _pool: Option<PoolSize>,
            candidate: Option<f64>,
            _now: DateTime<Utc>,
        ) -> Option<f64> {
            candidate.map(|c| c + self.0)
        }
    }

    /// Doubles, to observe ordering.
    #[derive(Debug)]
    struct Double;

    impl ScalingPolicy for Double {
        fn name(&self) -> &str {
            "double"
        }

        fn apply(
            &self,
            _pool: Option<PoolSize>,
            candidate: Option<f64>,
            _now: DateTime<Utc>,
        ) -> Option<f64> {
            candidate.map(|c| c * 2.0)
        }
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = PolicyChain::default();
        assert_eq!(chain.apply(None, Some(4.0), Utc::now()), Some(4.0));
        assert_eq!(chain.apply(None, None, Utc::now()), None);
    }

    #[test]
    fn policies_apply_in_order() {
        let chain = PolicyChain::new(vec![Box::new(Offset(1.0)), Box::new(Double)]);
        assert_eq!(chain.apply(None, Some(3.0), Utc::now()), Some(8.0));
        assert_eq!(chain.names(), vec!["offset", "double"]);

        let reversed = PolicyChain::new(vec![Box::new(Double), Box::new(Offset(1.0))]);
        assert_eq!(reversed.apply(None, Some(3.0), Utc::now()), Some(7.0));
    }
}
