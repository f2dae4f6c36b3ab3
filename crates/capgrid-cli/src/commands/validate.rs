use std::path::Path;

use anyhow::Context;
use capgrid_autoscale::DecisionPipeline;
use capgrid_core::{CapgridConfig, format_duration};
use tracing::info;

pub fn validate(path: &str) -> anyhow::Result<()> {
    let config = check(Path::new(path))?;
    info!(
        path,
        mappings = config.capacity.len(),
        "configuration valid"
    );

    println!("✓ {path} is valid");
    println!("  expression: {}", config.aggregator.expression);
    println!("  capacity mappings: {}", config.capacity.len());
    println!(
        "  delta tolerance: {}",
        config.scaling_policies.machine_delta_tolerance
    );
    println!(
        "  grace period: {}",
        format_duration(config.scaling_policies.overprovisioning_grace_period)
    );
    Ok(())
}

/// Load `path` and run every component's validation against it.
fn check(path: &Path) -> anyhow::Result<CapgridConfig> {
    let config = CapgridConfig::from_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    DecisionPipeline::new()
        .validate_config(&config)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn valid_config_passes() {
        let file = config_file(
            r#"
[aggregator]
expression = "max(predictions)"

[[capacity]]
metric = "rps"
amount_per_compute_unit = 100.0

[scaling_policies]
machine_delta_tolerance = 1.0
overprovisioning_grace_period = "10m"
"#,
        );
        let config = check(file.path()).unwrap();
        assert_eq!(config.capacity.len(), 1);
        assert!(validate(file.path().to_str().unwrap()).is_ok());
    }

    #[test]
    fn duplicate_mapping_is_reported() {
        let file = config_file(
            r#"
[aggregator]
expression = "sum(predictions)"

[[capacity]]
metric = "rps"
amount_per_compute_unit = 100.0

[[capacity]]
metric = "rps"
amount_per_compute_unit = 50.0
"#,
        );
        let err = check(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("already mapped"));
    }

    #[test]
    fn bad_expression_is_reported() {
        let file = config_file(
            r#"
[aggregator]
expression = "max(predictions"
"#,
        );
        let err = check(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid aggregation expression"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = check(Path::new("/nonexistent/capgrid.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to load"));
    }
}
