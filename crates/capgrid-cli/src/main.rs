use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "capgrid",
    about = "capgrid — forecast-driven pool autoscaling decisions",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a configuration file without applying it
    Validate {
        /// Path to capgrid.toml (or .json)
        #[arg(short, long, default_value = "capgrid.toml")]
        config: String,
    },
    /// Run one decision cycle over forecasts read from a JSON file.
    ///
    /// The file maps forecaster ids to forecasts, for example
    /// {"reactive": {"metric": "rps", "value": 250}, "floor": {"unit": "compute_units", "value": 2}}.
    /// A null forecast means the forecaster had no prediction.
    Decide {
        /// Path to capgrid.toml (or .json)
        #[arg(short, long, default_value = "capgrid.toml")]
        config: String,
        /// Path to the forecasts JSON file
        #[arg(short, long)]
        forecasts: String,
        /// Current desired pool size
        #[arg(long)]
        desired: Option<u32>,
        /// Current active pool size (defaults to --desired)
        #[arg(long, requires = "desired")]
        active: Option<u32>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,capgrid=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => commands::validate::validate(&config),
        Commands::Decide {
            config,
            forecasts,
            desired,
            active,
        } => commands::decide::decide(&config, &forecasts, desired, active),
    }
}
