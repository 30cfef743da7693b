mod config;

use clap::{Parser, Subcommand};
use config::{CommonConfig, Config, ConfigError};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "vitals", about = "Vitals telemetry gateway")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the dashboard API and relay sensor readings to analytics
    Gateway {
        #[arg(long)]
        config_file_path: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("missing `{0}` section in config file")]
    MissingSection(&'static str),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Gateway(#[from] telemetry_gateway::errors::GatewayError),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("vitals: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        CliCommand::Gateway { config_file_path } => {
            let config = Config::from_file(&config_file_path)?;
            let _sentry = init_observability(&config.common)?;

            let gateway_config = config
                .gateway
                .ok_or(CliError::MissingSection("gateway"))?;

            tracing::info!(config = %config_file_path.display(), "Starting gateway");
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(telemetry_gateway::run(gateway_config))?;
            Ok(())
        }
    }
}

/// Installs logging, error reporting and metrics. The returned guard flushes
/// pending Sentry events when dropped.
fn init_observability(
    common: &CommonConfig,
) -> Result<Option<sentry::ClientInitGuard>, CliError> {
    let sentry_guard = common.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(
            sentry_guard
                .as_ref()
                .map(|_| sentry::integrations::tracing::layer()),
        )
        .init();

    if let Some(metrics_config) = &common.metrics {
        let recorder = StatsdBuilder::from(&metrics_config.statsd_host, metrics_config.statsd_port)
            .build(Some("vitals"))
            .map_err(|e| CliError::Metrics(e.to_string()))?;
        metrics::set_global_recorder(recorder)
            .map_err(|e| CliError::Metrics(e.to_string()))?;
        tracing::info!(
            host = %metrics_config.statsd_host,
            port = metrics_config.statsd_port,
            "Reporting metrics to statsd"
        );
    }

    Ok(sentry_guard)
}
