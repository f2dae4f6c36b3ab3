//! capgrid-autoscale — one decision cycle, end to end.
//!
//! # Decision cycle
//!
//! ```text
//! for each forecaster:
//!     forecast = forecaster.predict(pool, now)      // error → absent
//!     forecast = capacity_mapper.to_compute_units(forecast)
//! aggregate = aggregator.aggregate(forecasts, now)  // any absent → absent
//! decision  = enforcer.apply(pool, aggregate, now)  // tolerance, then grace period
//!
//! decision absent or ceil(decision) == pool.desired  → NoChange
//! otherwise                                          → ScaleTo(ceil(decision))
//! ```
//!
//! [`DecisionPipeline`] is the synchronous core. [`Autoscaler`] drives it
//! periodically and hands `ScaleTo` decisions to a resize callback.

pub mod clock;
pub mod error;
pub mod forecaster;
pub mod pipeline;
pub mod scaler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DecisionError, DecisionResult, ForecastError};
pub use forecaster::{Forecaster, PoolSizeSource, SharedPoolSize, StaticForecaster};
pub use pipeline::DecisionPipeline;
pub use scaler::{Autoscaler, ScaleCallback, ScaleDecision};
