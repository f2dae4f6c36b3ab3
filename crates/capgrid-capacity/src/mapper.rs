//! Capacity mapper — converts forecasts into compute units.

use std::sync::{Arc, RwLock};

use capgrid_core::{
    CapacityMappingEntry, ConfigResult, Configurable, Forecast, ForecastUnit,
};
use tracing::debug;

use crate::error::{CapacityError, CapacityResult};
use crate::table::CapacityTable;

/// The configured entries together with the table built from them.
#[derive(Debug)]
struct ActiveMappings {
    entries: Vec<CapacityMappingEntry>,
    table: Arc<CapacityTable>,
}

/// Configurable capacity conversion.
///
/// Entries and table are swapped in as one snapshot, so a reader never
/// sees one without the other.
#[derive(Debug, Default)]
pub struct CapacityMapper {
    active: RwLock<Option<Arc<ActiveMappings>>>,
}

impl CapacityMapper {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> Option<Arc<ActiveMappings>> {
        self.active.read().expect("capacity mapper lock").clone()
    }

    /// Read-only view of the active table, if configured.
    pub fn table(&self) -> Option<Arc<CapacityTable>> {
        self.active().map(|active| active.table.clone())
    }

    /// Convert a forecast to compute units.
    ///
    /// An absent forecast stays absent, even before the mapper is
    /// configured: there is nothing to convert. A present forecast on an
    /// unconfigured mapper fails with [`CapacityError::NotConfigured`].
    /// Compute-unit forecasts are returned as is. A metric with no
    /// configured rate fails with [`CapacityError::UnmappedMetric`].
    pub fn to_compute_units(&self, forecast: Option<&Forecast>) -> CapacityResult<Option<Forecast>> {
        let Some(forecast) = forecast else {
            return Ok(None);
        };
        let active = self.active().ok_or(CapacityError::NotConfigured)?;
        if forecast.is_compute_units() {
            return Ok(Some(forecast.clone()));
        }
        convert(&active.table, forecast).map(Some)
    }
}

fn convert(table: &CapacityTable, forecast: &Forecast) -> CapacityResult<Forecast> {
    let metric = forecast.metric_name();
    let units = table
        .to_compute_units(metric, forecast.value())
        .map_err(|e| match e {
            CapacityError::UnrecognizedMetric(m) => CapacityError::UnmappedMetric(m),
            other => other,
        })?;
    debug!(
        %metric,
        capacity = forecast.value(),
        compute_units = units,
        "converted forecast to compute units"
    );
    Ok(forecast.with_value(units, ForecastUnit::ComputeUnits))
}

impl Configurable for CapacityMapper {
    type Config = Vec<CapacityMappingEntry>;

    fn validate(&self, config: &Self::Config) -> ConfigResult<()> {
        CapacityTable::from_entries(config).map(|_| ())
    }

    fn configure(&self, config: Self::Config) -> ConfigResult<()> {
        let table = Arc::new(CapacityTable::from_entries(&config)?);
        debug!(mappings = table.len(), "capacity mappings configured");
        *self.active.write().expect("capacity mapper lock") = Some(Arc::new(ActiveMappings {
            entries: config,
            table,
        }));
        Ok(())
    }

    fn configuration(&self) -> Option<Self::Config> {
        self.active().map(|active| active.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use capgrid_core::ConfigError;
    use chrono::{DateTime, Utc};

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn configured(entries: &[(&str, f64)]) -> CapacityMapper {
        let mapper = CapacityMapper::new();
        mapper
            .configure(
                entries
                    .iter()
                    .map(|(m, r)| CapacityMappingEntry::new(*m, *r))
                    .collect(),
            )
            .unwrap();
        mapper
    }

    #[test]
    fn absent_forecast_stays_absent() {
        let mapper = CapacityMapper::new();
        assert_eq!(mapper.to_compute_units(None).unwrap(), None);
        assert!(mapper.table().is_none());
    }

    #[test]
    fn compute_unit_forecast_is_identity() {
        let mapper = configured(&[]);
        let forecast = Forecast::compute_units("rps", 7.0, ts());
        assert_eq!(
            mapper.to_compute_units(Some(&forecast)).unwrap(),
            Some(forecast)
        );
    }

    #[test]
    fn converts_metric_forecast() {
        let mapper = configured(&[("rps", 10.0)]);
        let forecast = Forecast::metric("rps", 25.0, ts());

        let converted = mapper.to_compute_units(Some(&forecast)).unwrap().unwrap();
        assert_eq!(converted.value(), 2.5);
        assert_eq!(converted.unit(), ForecastUnit::ComputeUnits);
        assert_eq!(converted.metric_name(), "rps");
        // The input is untouched.
        assert_eq!(forecast.value(), 25.0);
        assert_eq!(forecast.unit(), ForecastUnit::Metric);
    }

    #[test]
    fn unmapped_metric_fails() {
        let mapper = configured(&[("rps", 10.0)]);
        let forecast = Forecast::metric("latency", 3.0, ts());
        assert_eq!(
            mapper.to_compute_units(Some(&forecast)),
            Err(CapacityError::UnmappedMetric("latency".into()))
        );
    }

    #[test]
    fn unconfigured_mapper_fails_fast() {
        let mapper = CapacityMapper::new();
        let forecast = Forecast::metric("rps", 3.0, ts());
        assert_eq!(
            mapper.to_compute_units(Some(&forecast)),
            Err(CapacityError::NotConfigured)
        );
        assert_eq!(mapper.configuration(), None);
    }

    #[test]
    fn invalid_configuration_keeps_previous() {
        let mapper = configured(&[("rps", 10.0)]);

        let err = mapper
            .configure(vec![CapacityMappingEntry::new("rps", -5.0)])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCapacityRate { .. }));

        assert_eq!(
            mapper.configuration(),
            Some(vec![CapacityMappingEntry::new("rps", 10.0)])
        );
        assert_eq!(
            mapper.table().unwrap().compute_unit_capacity("rps").unwrap(),
            10.0
        );
    }

    #[test]
    fn configuration_and_table_change_together() {
        let mapper = configured(&[("rps", 10.0)]);
        let before = mapper.table().unwrap();

        mapper
            .configure(vec![
                CapacityMappingEntry::new("cpu", 0.5),
                CapacityMappingEntry::new("connections", 100.0),
            ])
            .unwrap();

        let configured: BTreeSet<String> = mapper
            .configuration()
            .unwrap()
            .into_iter()
            .map(|entry| entry.metric)
            .collect();
        assert_eq!(mapper.table().unwrap().metrics(), configured);
        // A snapshot taken earlier is unaffected.
        assert!(before.contains_mapping("rps"));
        assert!(!before.contains_mapping("cpu"));
    }

    #[test]
    fn reconfigure_replaces_all_mappings() {
        let mapper = configured(&[("rps", 10.0)]);
        mapper
            .configure(vec![CapacityMappingEntry::new("cpu", 0.5)])
            .unwrap();

        let forecast = Forecast::metric("rps", 25.0, ts());
        assert_eq!(
            mapper.to_compute_units(Some(&forecast)),
            Err(CapacityError::UnmappedMetric("rps".into()))
        );
    }
}
