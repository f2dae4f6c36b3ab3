//! capgrid-capacity — converts forecasts from metric units into compute
//! units.
//!
//! # Components
//!
//! - **`table`** — `CapacityTranslationTable`, metric → capacity supplied
//!   by one compute unit, swapped as an immutable snapshot on every change
//! - **`mapper`** — `CapacityMapper`, the configurable converter for a
//!   whole [`Forecast`](capgrid_core::Forecast); its entries and table are
//!   one snapshot

pub mod error;
pub mod mapper;
pub mod table;

pub use error::{CapacityError, CapacityResult};
pub use mapper::CapacityMapper;
pub use table::{CapacityTable, CapacityTranslationTable};
