//! Diagnosis gateway server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (axum, request id, trace, timeout, body limit)
//!                  │
//!                  ▼
//!               pipeline
//!                  │  auth ─▶ rate_limit ─▶ intake ─▶ generator ─▶ safety
//!                  ▼
//!               response (diagnoses + safety + risk + disclaimer)
//!
//!     config watcher ──▶ rebuilt pipeline swapped in (arc-swap)
//!     SIGTERM/SIGINT ──▶ graceful shutdown
//! ```
//!
//! Usage: `diagnosis-gateway [CONFIG_PATH]` (default `config/gateway.toml`,
//! or `GATEWAY_CONFIG`).

use std::path::PathBuf;

use tokio::net::TcpListener;

use diagnosis_gateway::config::load_config;
use diagnosis_gateway::config::watcher::ConfigWatcher;
use diagnosis_gateway::http::{build_generator, GatewayServer};
use diagnosis_gateway::lifecycle::signals::spawn_signal_handler;
use diagnosis_gateway::lifecycle::Shutdown;
use diagnosis_gateway::observability::{logging, metrics};

const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GATEWAY_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = load_config(&config_path)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        environment = %config.environment,
        bind_address = %config.listener.bind_address,
        quota = config.rate_limit.requests,
        window_secs = config.rate_limit.window_secs,
        "diagnosis-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let generator = build_generator(&config.generator)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let (watcher, config_updates) = ConfigWatcher::new(&config_path);
    // Dropping the watcher stops reload events, so it lives until exit.
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(&shutdown);

    GatewayServer::new(config, generator)
        .run(listener, config_updates, &shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
