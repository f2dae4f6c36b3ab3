//! capgrid-aggregate — combines one forecast per forecaster into a single
//! compute-unit number using a configured expression.
//!
//! Aggregation is all-or-nothing: if any forecaster has no forecast for
//! the cycle the expression is not run at all.

pub mod aggregator;
pub mod error;

pub use aggregator::{Aggregator, INPUT_BINDING, PREDICTIONS_BINDING};
pub use error::{AggregatorError, AggregatorResult};
