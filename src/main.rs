//! Tee proxy.
//!
//! Sends every inbound request to the target backend and returns its
//! response; a full copy of the request is replayed against the
//! alternative backend in the background and its responses are only logged.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                  TEE PROXY                   │
//!   Client Request    │  ┌─────────┐   ┌───────────┐                 │
//!   ──────────────────┼─▶│  http   │──▶│ duplicate │──┐              │
//!                     │  │ server  │   │  request  │  │              │
//!                     │  └─────────┘   └───────────┘  │              │
//!                     │                     │         ▼              │
//!                     │                     │   ┌───────────┐        │     Alternative
//!                     │                     │   │  shadow   │────────┼───▶ (logged only,
//!                     │                     │   │dispatcher │ retry  │      5xx retried)
//!                     │                     ▼   └───────────┘        │
//!   Client Response   │              ┌────────────┐                  │
//!   ◀─────────────────┼──────────────│  rewrite + │◀─────────────────┼──── Target
//!                     │              │  timeout   │                  │
//!                     │              └────────────┘                  │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use url::Url;

use tee_proxy::config::{load_config, validate_config, ConfigError, TeeConfig};
use tee_proxy::lifecycle::{signals, Shutdown};
use tee_proxy::observability::{logging, metrics};
use tee_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "tee-proxy")]
#[command(about = "Reverse proxy that mirrors traffic to a shadow backend", long_about = None)]
struct Cli {
    /// TOML configuration file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to accept requests on, e.g. 0.0.0.0:8888, localhost:8888 or :8888.
    #[arg(short, long)]
    listen: Option<String>,

    /// Where production traffic goes, e.g. http://localhost:8080/production.
    #[arg(short = 'a', long)]
    target: Option<Url>,

    /// Where testing traffic goes; responses are skipped.
    #[arg(short = 'b', long)]
    alternative: Option<Url>,

    /// Attempts per shadow request (at least 1).
    #[arg(long)]
    retries: Option<u32>,

    /// Delay between shadow attempts in milliseconds.
    #[arg(long)]
    retry_interval_ms: Option<u64>,

    /// Round-trip deadline in milliseconds; 0 disables it.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log level when not verbose (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut TeeConfig) {
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(target) = self.target {
            config.hosts.target = target;
        }
        if let Some(alternative) = self.alternative {
            config.hosts.alternative = alternative;
        }
        if let Some(retries) = self.retries {
            config.retries.max_attempts = retries;
        }
        if let Some(interval) = self.retry_interval_ms {
            config.retries.interval_ms = interval;
        }
        if let Some(timeout) = self.timeout_ms {
            config.timeouts.round_trip_ms = timeout;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if self.verbose {
            config.observability.verbose = true;
        }
        if let Some(address) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = address;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TeeConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability);

    tracing::info!("tee-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        target = %config.hosts.target,
        alternative = %config.hosts.alternative,
        max_attempts = config.retries.max_attempts,
        retry_interval_ms = config.retries.interval_ms,
        round_trip_ms = config.timeouts.round_trip_ms,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(config.listener.bind_target()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    if config.observability.metrics_enabled {
        // Already validated.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(signals::trigger_on_signal(shutdown));

    let server = HttpServer::new(config);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
