//! Telemetry configuration from environment variables.

use crate::TelemetryError;
use std::env;
use std::net::{Ipv4Addr, SocketAddr};

pub const DEFAULT_METRICS_PORT: u16 = 8000;

/// Configuration for logging and the metrics endpoint.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Prometheus metrics port
    pub metrics_port: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "celo-signer-watch".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// - `SIGNER_WATCH_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `SIGNER_WATCH_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `PROMETHEUS_PORT`: Metrics port (default: 8000)
    pub fn from_env() -> Result<Self, TelemetryError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TelemetryError> {
        let defaults = Self::default();

        let metrics_port = match lookup("PROMETHEUS_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                TelemetryError::Config(format!("PROMETHEUS_PORT is not a port number: {raw}"))
            })?,
            None => defaults.metrics_port,
        };

        Ok(Self {
            service_name: defaults.service_name,
            log_level: lookup("SIGNER_WATCH_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("SIGNER_WATCH_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.json_logs),
            metrics_port,
        })
    }

    /// Listen address for the metrics server, all interfaces.
    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.metrics_port))
    }
}
