//! Policy error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("scaling policy enforcer used before it was configured")]
    NotConfigured,
}

pub type PolicyResult<T> = Result<T, PolicyError>;
