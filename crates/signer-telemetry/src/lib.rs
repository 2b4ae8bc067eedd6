//! # Signer Telemetry
//!
//! Observability plumbing for the signer downtime exporter.
//!
//! ## Components
//!
//! - **Logging**: `tracing` subscriber, plain or JSON, filtered by level
//! - **Metrics**: exporter-owned Prometheus registry with the `celochain_*` families
//! - **Server**: `/metrics` and `/health` over HTTP
//!
//! ## Usage
//!
//! ```rust,ignore
//! use signer_telemetry::{init_logging, serve_metrics, ExporterMetrics, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//!
//! let metrics = Arc::new(ExporterMetrics::new()?);
//! tokio::spawn(serve_metrics(config.metrics_addr(), metrics.clone()));
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SIGNER_WATCH_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `SIGNER_WATCH_JSON_LOGS` | `false` | JSON formatted logs |
//! | `PROMETHEUS_PORT` | `8000` | Metrics listen port |

mod config;
mod logging;
mod metrics;
mod server;

pub use config::{TelemetryConfig, DEFAULT_METRICS_PORT};
pub use logging::init_logging;
pub use metrics::ExporterMetrics;
pub use server::{bind_metrics, metrics_router, serve_metrics, serve_on};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Metrics server error: {0}")]
    Server(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<prometheus::Error> for TelemetryError {
    fn from(err: prometheus::Error) -> Self {
        TelemetryError::MetricsInit(err.to_string())
    }
}
