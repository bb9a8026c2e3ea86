//! TopExporter - MongoDB top statistics exporter for Prometheus

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topexporter::{
    config::{CliOverrides, ConfigManager},
    metrics::MetricsManager,
    FileStatsSource, MetricsRegistry, ShutdownCoordinator,
};

/// CLI arguments for TopExporter
#[derive(Parser, Debug)]
#[command(name = "topexporter")]
#[command(about = "Prometheus exporter for MongoDB per-collection top statistics")]
#[command(version)]
#[command(long_about = "
Prometheus exporter for MongoDB per-collection top statistics.

Every scrape of /metrics re-reads the snapshot file, a JSON capture of the
`top` admin command reply, and publishes <namespace>_top_time_seconds_total
and <namespace>_top_count_total labelled by type, database and collection.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables (used for settings the file leaves out)
4. Built-in defaults

Environment variables:
  TOPEXPORTER_BIND_ADDR         - Bind address (e.g., 127.0.0.1:9216)
  TOPEXPORTER_SHUTDOWN_TIMEOUT  - Shutdown timeout (e.g., 10s)
  TOPEXPORTER_NAMESPACE         - Metric name prefix
  TOPEXPORTER_SNAPSHOT_PATH     - Path of the top statistics JSON file
  TOPEXPORTER_LOG_LEVEL         - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", help = "Path to configuration file")]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 127.0.0.1:9216)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Snapshot file (overrides config file)
    #[arg(short, long, help = "Path of the top statistics JSON file")]
    pub snapshot: Option<PathBuf>,

    /// Metric namespace prefix (overrides config file)
    #[arg(short, long, help = "Metric name prefix")]
    pub namespace: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,

    /// Print one scrape to stdout and exit
    #[arg(long, help = "Print the current metrics once and exit")]
    pub once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = ConfigManager::load(&args.config)?;

    config.merge_with_cli_args(&CliOverrides {
        bind: args.bind.clone(),
        port: args.port,
        namespace: args.namespace.clone(),
        snapshot_path: args.snapshot.clone(),
        log_level: if args.verbose {
            Some("debug".to_string())
        } else {
            args.log_level.clone()
        },
    });

    config
        .validate()
        .context("Final configuration validation failed")?;

    init_tracing(&config.logging.level)?;

    info!("Starting TopExporter v{}", env!("CARGO_PKG_VERSION"));

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Metric namespace: {}", config.exporter.namespace);
        info!("  Bind address: {}", config.server.bind_addr);
        info!("  Shutdown timeout: {:?}", config.server.shutdown_timeout);
        match &config.source.snapshot_path {
            Some(path) => info!("  Snapshot file: {}", path.display()),
            None => info!("  Snapshot file: not configured"),
        }
        return Ok(());
    }

    let snapshot_path = config
        .source
        .snapshot_path
        .clone()
        .context("No snapshot file configured; set source.snapshot_path or pass --snapshot")?;

    let registry = Arc::new(MetricsRegistry::new(&config.exporter.namespace)?);
    registry.register_source(Arc::new(FileStatsSource::new(snapshot_path)))?;

    for descriptor in registry.describe() {
        info!(
            metric = %descriptor.name,
            labels = ?descriptor.label_names,
            "Describing metric family"
        );
    }

    if args.once {
        print!("{}", registry.export_prometheus());
        return Ok(());
    }

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);

    let mut metrics_manager = MetricsManager::new(registry, config.server.clone());
    metrics_manager.start(&shutdown_coordinator);

    info!("Press Ctrl+C or send SIGTERM/SIGINT to shutdown gracefully");

    if let Err(e) = shutdown_coordinator.listen_for_signals().await {
        error!("Error setting up signal handlers: {}", e);
        shutdown_coordinator.trigger();
    }

    metrics_manager.stop(&shutdown_coordinator).await;
    info!("Exporter shutdown complete");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
