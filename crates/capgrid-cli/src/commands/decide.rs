use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use capgrid_autoscale::{DecisionPipeline, ScaleDecision};
use capgrid_core::{CapgridConfig, Forecast, ForecastUnit, ForecasterId, PoolSize};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// One entry of the forecasts file.
#[derive(Debug, Deserialize)]
struct ForecastInput {
    value: f64,
    #[serde(default)]
    metric: String,
    #[serde(default)]
    unit: Option<ForecastUnit>,
}

pub fn decide(
    config_path: &str,
    forecasts_path: &str,
    desired: Option<u32>,
    active: Option<u32>,
) -> anyhow::Result<()> {
    let config = CapgridConfig::from_file(Path::new(config_path))
        .with_context(|| format!("failed to load {config_path}"))?;
    let content = std::fs::read_to_string(forecasts_path)
        .with_context(|| format!("failed to read {forecasts_path}"))?;

    let now = Utc::now();
    let forecasts = parse_forecasts(&content, now)
        .with_context(|| format!("invalid forecasts in {forecasts_path}"))?;
    let pool = desired.map(|desired| PoolSize::new(desired, active.unwrap_or(desired)));

    let report = run_decision(config, &forecasts, pool, now)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_forecasts(
    content: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<BTreeMap<ForecasterId, Option<Forecast>>> {
    let raw: BTreeMap<ForecasterId, Option<ForecastInput>> = serde_json::from_str(content)?;
    Ok(raw
        .into_iter()
        .map(|(id, input)| {
            let forecast = input.map(|f| match f.unit.unwrap_or(ForecastUnit::Metric) {
                ForecastUnit::Metric => Forecast::metric(f.metric, f.value, now),
                ForecastUnit::ComputeUnits => Forecast::compute_units(f.metric, f.value, now),
            });
            (id, forecast)
        })
        .collect())
}

fn run_decision(
    config: CapgridConfig,
    forecasts: &BTreeMap<ForecasterId, Option<Forecast>>,
    pool: Option<PoolSize>,
    now: DateTime<Utc>,
) -> anyhow::Result<serde_json::Value> {
    let pipeline = DecisionPipeline::from_config(config).context("invalid configuration")?;
    let decision = pipeline.decide(forecasts, pool, now)?;
    let target = match ScaleDecision::from_decision(decision, pool) {
        ScaleDecision::ScaleTo(n) => Some(n),
        ScaleDecision::NoChange => None,
    };
    info!(
        forecasters = forecasts.len(),
        decision = ?decision,
        scale_to = ?target,
        "decision computed"
    );

    Ok(json!({
        "decision_time": now.to_rfc3339(),
        "forecasters": forecasts.len(),
        "pool": pool,
        "decision": decision,
        "scale_to": target,
    }))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use capgrid_core::AggregatorConfig;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn parses_metric_compute_unit_and_missing_forecasts() {
        let forecasts = parse_forecasts(
            r#"{
                "reactive": {"metric": "rps", "value": 250},
                "floor": {"unit": "compute_units", "value": 2},
                "seasonal": null
            }"#,
            now(),
        )
        .unwrap();

        assert_eq!(forecasts.len(), 3);
        let reactive = forecasts["reactive"].as_ref().unwrap();
        assert_eq!(reactive.metric_name(), "rps");
        assert!(!reactive.is_compute_units());
        assert!(forecasts["floor"].as_ref().unwrap().is_compute_units());
        assert!(forecasts["seasonal"].is_none());
    }

    #[test]
    fn rejects_malformed_forecasts() {
        assert!(parse_forecasts(r#"{"reactive": {"metric": "rps"}}"#, now()).is_err());
        assert!(parse_forecasts("[1, 2]", now()).is_err());
    }

    #[test]
    fn decision_report() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[aggregator]
expression = "max(predictions)"

[[capacity]]
metric = "rps"
amount_per_compute_unit = 100.0
"#
        )
        .unwrap();
        let config = CapgridConfig::from_file(file.path()).unwrap();
        let forecasts = parse_forecasts(
            r#"{"reactive": {"metric": "rps", "value": 250}}"#,
            now(),
        )
        .unwrap();

        let report = run_decision(config, &forecasts, Some(PoolSize::new(1, 1)), now()).unwrap();
        assert_eq!(report["decision"], json!(2.5));
        assert_eq!(report["scale_to"], json!(3));
        assert_eq!(report["pool"]["desired"], json!(1));
    }

    #[test]
    fn unchanged_pool_reports_no_target() {
        let config = CapgridConfig {
            aggregator: AggregatorConfig::new("sum(predictions)"),
            capacity: Vec::new(),
            scaling_policies: Default::default(),
        };
        let forecasts = parse_forecasts(
            r#"{"floor": {"unit": "compute_units", "value": 4}}"#,
            now(),
        )
        .unwrap();

        let report = run_decision(config, &forecasts, Some(PoolSize::new(4, 4)), now()).unwrap();
        assert_eq!(report["decision"], json!(4.0));
        assert_eq!(report["scale_to"], serde_json::Value::Null);
    }
}
