//! CDH Exporter Binary Entry Point
//!
//! This binary serves Cloudera Manager health and timeseries data as
//! Prometheus metrics. Core functionality is provided by the `cdh_exporter`
//! library crate.

use clap::Parser;
use cdh_exporter::{
    collector::{CollectorRegistry, HealthCollector, TimeseriesCollector},
    config::{AppConfig, LogConfig, LogFormat, parse_duration},
    server::{AppState, create_router},
    upstream::{HttpTransport, Transport},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// CDH Exporter - Cloudera Manager metrics for Prometheus
#[derive(Parser, Debug)]
#[command(name = "cdh_exporter", version, about, long_about = None)]
struct Cli {
    /// Path to an optional YAML configuration file
    #[arg(short, long, env = "CDH_EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on for telemetry
    #[arg(long = "web.listen-address", env = "CDH_EXPORTER_LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", env = "CDH_EXPORTER_TELEMETRY_PATH")]
    telemetry_path: Option<String>,

    /// Cloudera Manager API address (host:port)
    #[arg(long = "cdh.address", env = "CDH_ADDRESS")]
    address: Option<String>,

    /// Service component to monitor (repeatable or comma separated)
    #[arg(long = "cdh.component", env = "CDH_COMPONENTS", value_delimiter = ',')]
    components: Vec<String>,

    /// Pre-encoded Authorization header value
    #[arg(long = "user.account", env = "CDH_CREDENTIAL", hide_env_values = true)]
    credential: Option<String>,

    /// Cloudera Manager API version
    #[arg(long = "api.version", env = "CDH_API_VERSION")]
    api_version: Option<String>,

    /// Cluster to monitor
    #[arg(long = "cluster.name", env = "CDH_CLUSTER_NAME")]
    cluster_name: Option<String>,

    /// Timeout of a single upstream request (e.g. 30s)
    #[arg(long = "cdh.request-timeout", value_parser = parse_duration)]
    request_timeout: Option<Duration>,

    /// Longest wait for a collector's previous scrape to finish (e.g. 60s)
    #[arg(long = "cdh.scrape-timeout", value_parser = parse_duration)]
    scrape_timeout: Option<Duration>,

    /// Upstream fetches in flight within one health pass
    #[arg(long = "cdh.max-concurrent-fetches")]
    max_concurrent_fetches: Option<usize>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long = "log.level", env = "CDH_EXPORTER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (text or json)
    #[arg(long = "log.format")]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Apply CLI/env overrides (CLI > ENV > config file).
    fn apply(self, config: &mut AppConfig) {
        if let Some(listen_address) = self.listen_address {
            config.server.listen_address = listen_address;
        }
        if let Some(telemetry_path) = self.telemetry_path {
            config.server.telemetry_path = telemetry_path;
        }
        if let Some(address) = self.address {
            config.upstream.address = address;
        }
        if !self.components.is_empty() {
            config.upstream.set_components(&self.components);
        }
        if let Some(credential) = self.credential {
            config.upstream.credential = credential;
        }
        if let Some(api_version) = self.api_version {
            config.upstream.api_version = api_version;
        }
        if let Some(cluster_name) = self.cluster_name {
            config.upstream.cluster_name = cluster_name;
        }
        if let Some(timeout) = self.request_timeout {
            config.upstream.request_timeout = timeout;
        }
        if let Some(timeout) = self.scrape_timeout {
            config.upstream.scrape_timeout = timeout;
        }
        if let Some(limit) = self.max_concurrent_fetches {
            config.upstream.max_concurrent_fetches = limit;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(format) = self.log_format {
            config.log.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file, if any
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let config_path = cli.config.clone();
    cli.apply(&mut config);

    init_tracing(&config.log);
    tracing::info!("CDH Exporter - Cloudera Manager metrics for Prometheus");
    if let Some(path) = config_path {
        tracing::info!(path = %path.display(), "Loaded configuration file");
    }

    config.validate()?;
    let addr = config.server.socket_addr()?;

    tracing::info!(
        address = %config.upstream.address,
        api_version = %config.upstream.api_version,
        cluster = %config.upstream.cluster_name,
        components = ?config.upstream.components,
        "Upstream configured"
    );

    // Build upstream transport and collectors
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
        &config.upstream.credential(),
        config.upstream.request_timeout,
    )?);

    let mut registry = CollectorRegistry::new(&config.upstream.namespace)?;
    registry.register(HealthCollector::new(
        &config.upstream,
        Arc::clone(&transport),
    )?);
    registry.register(TimeseriesCollector::discover(&config.upstream, transport).await?);

    // Create web server state
    let app_state = AppState {
        registry: Arc::new(registry),
        telemetry_path: config.server.telemetry_path.clone(),
    };

    // Build Axum router
    let app = create_router(app_state);

    tracing::info!(
        "Web server listening on: http://{}{}",
        addr,
        config.server.telemetry_path
    );
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing; `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&log.level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cdh_exporter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_component_flag_is_repeatable() {
        let cli = parse(&["--cdh.component", "hdfs", "--cdh.component", "yarn"]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.upstream.components, vec!["hdfs", "yarn"]);
    }

    #[test]
    fn test_component_flag_accepts_comma_list() {
        let cli = parse(&["--cdh.component", "hdfs,yarn", "--cdh.component", "impala"]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.upstream.components, vec!["hdfs", "yarn", "impala"]);
    }

    #[test]
    fn test_overrides_keep_file_values_when_absent() {
        let cli = parse(&[
            "--user.account",
            "Basic YWRtaW46YWRtaW4=",
            "--cdh.scrape-timeout",
            "90s",
            "--log.format",
            "json",
        ]);
        let mut config = AppConfig::default();
        config.upstream.components = vec!["hbase".to_string()];
        cli.apply(&mut config);

        assert_eq!(config.upstream.components, vec!["hbase"]);
        assert_eq!(config.upstream.credential, "Basic YWRtaW46YWRtaW4=");
        assert_eq!(config.upstream.scrape_timeout, Duration::from_secs(90));
        assert_eq!(config.log.format, LogFormat::Json);
    }
}
