//! Aggregator error types.

use capgrid_expr::EvalError;
use thiserror::Error;

/// Errors raised by [`Aggregator::aggregate`](crate::Aggregator::aggregate).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregatorError {
    #[error("aggregator used before it was configured")]
    NotConfigured,

    #[error("aggregation expression `{expression}` failed: {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: EvalError,
    },
}

pub type AggregatorResult<T> = Result<T, AggregatorError>;
