//! Capacity translation table — metric → capacity of one compute unit.
//!
//! The table is shared between the decision cycle and whoever reconfigures
//! it. Every change builds a fresh [`CapacityTable`] and swaps the `Arc`
//! under the write lock, so a reader holding a snapshot never observes a
//! half-replaced table.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use capgrid_core::{CapacityMappingEntry, ConfigError, ConfigResult};
use tracing::debug;

use crate::error::{CapacityError, CapacityResult};

/// An immutable set of capacity mappings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityTable {
    rates: HashMap<String, f64>,
}

impl CapacityTable {
    /// Build a table, rejecting invalid entries and duplicate metrics.
    pub fn from_entries(entries: &[CapacityMappingEntry]) -> ConfigResult<Self> {
        let mut rates = HashMap::with_capacity(entries.len());
        for entry in entries {
            entry.validate()?;
            if rates
                .insert(entry.metric.clone(), entry.amount_per_compute_unit)
                .is_some()
            {
                return Err(ConfigError::DuplicateMapping(entry.metric.clone()));
            }
        }
        Ok(Self { rates })
    }

    /// Capacity supplied by one compute unit for `metric`.
    pub fn compute_unit_capacity(&self, metric: &str) -> CapacityResult<f64> {
        self.rates
            .get(metric)
            .copied()
            .ok_or_else(|| CapacityError::UnrecognizedMetric(metric.to_string()))
    }

    /// How many compute units supply `capacity` of `metric`.
    pub fn to_compute_units(&self, metric: &str, capacity: f64) -> CapacityResult<f64> {
        let rate = self.compute_unit_capacity(metric)?;
        // `!(x >= 0)` also rejects NaN.
        if !(capacity >= 0.0) {
            return Err(CapacityError::NegativeCapacity {
                metric: metric.to_string(),
                capacity,
            });
        }
        Ok(capacity / rate)
    }

    pub fn contains_mapping(&self, metric: &str) -> bool {
        self.rates.contains_key(metric)
    }

    pub fn metrics(&self) -> BTreeSet<String> {
        self.rates.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Shared, atomically replaceable capacity table.
#[derive(Debug, Default)]
pub struct CapacityTranslationTable {
    current: RwLock<Arc<CapacityTable>>,
}

impl CapacityTranslationTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active table. Use this when several lookups must agree.
    pub fn snapshot(&self) -> Arc<CapacityTable> {
        self.current.read().expect("capacity table lock").clone()
    }

    pub fn to_compute_units(&self, metric: &str, capacity: f64) -> CapacityResult<f64> {
        self.snapshot().to_compute_units(metric, capacity)
    }

    pub fn compute_unit_capacity(&self, metric: &str) -> CapacityResult<f64> {
        self.snapshot().compute_unit_capacity(metric)
    }

    pub fn contains_mapping(&self, metric: &str) -> bool {
        self.snapshot().contains_mapping(metric)
    }

    pub fn metrics(&self) -> BTreeSet<String> {
        self.snapshot().metrics()
    }

    /// Replace every mapping. Nothing changes if any entry is invalid.
    pub fn set_mappings(&self, entries: &[CapacityMappingEntry]) -> CapacityResult<()> {
        let table = CapacityTable::from_entries(entries)?;
        self.replace(table);
        Ok(())
    }

    /// Install an already-validated table.
    fn replace(&self, table: CapacityTable) {
        debug!(mappings = table.len(), "replacing capacity mappings");
        *self.current.write().expect("capacity table lock") = Arc::new(table);
    }

    /// Add one mapping. An already-mapped metric is never overwritten.
    pub fn add_mapping(&self, metric: &str, amount_per_compute_unit: f64) -> CapacityResult<()> {
        let entry = CapacityMappingEntry::new(metric, amount_per_compute_unit);
        entry.validate()?;

        let mut current = self.current.write().expect("capacity table lock");
        if current.contains_mapping(metric) {
            return Err(ConfigError::DuplicateMapping(metric.to_string()).into());
        }
        let mut next = CapacityTable::clone(&current);
        next.rates.insert(entry.metric, entry.amount_per_compute_unit);
        *current = Arc::new(next);
        debug!(%metric, amount_per_compute_unit, "added capacity mapping");
        Ok(())
    }

    /// Remove every mapping.
    pub fn clear(&self) {
        *self.current.write().expect("capacity table lock") = Arc::new(CapacityTable::default());
    }
}
