//! Exporter configuration from environment variables.

use signer_monitor::adapters::{CeloRpcConfig, DEFAULT_EPOCH_SIZE};
use signer_monitor::domain::{DEFAULT_BLOCK_TIME_SECS, DEFAULT_SLOW_RESET_DELAY};
use signer_monitor::{Address, MonitorConfig};
use signer_telemetry::TelemetryConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const SIGNER_ADDRESS_VAR: &str = "VALIDATOR_SIGNER_ADDRESS";
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{SIGNER_ADDRESS_VAR} is not set")]
    MissingSignerAddress,

    #[error("Invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the exporter binary needs to start.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub signer: Address,
    pub rpc_url: String,
    pub slow_reset_delay: u64,
    pub poll_interval: Duration,
    pub block_time_secs: u64,
    pub epoch_size: u64,
    pub rpc_timeout: Duration,
    pub telemetry: TelemetryConfig,
}

impl ExporterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_signer = lookup(SIGNER_ADDRESS_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingSignerAddress)?;
        let signer = Address::from_str(raw_signer.trim()).map_err(|e| ConfigError::Invalid {
            var: SIGNER_ADDRESS_VAR,
            value: raw_signer.clone(),
            reason: e.to_string(),
        })?;

        let telemetry = TelemetryConfig::from_lookup(&lookup).map_err(|e| ConfigError::Invalid {
            var: "PROMETHEUS_PORT",
            value: lookup("PROMETHEUS_PORT").unwrap_or_default(),
            reason: e.to_string(),
        })?;

        let epoch_size = parse_or(&lookup, "EPOCH_SIZE", DEFAULT_EPOCH_SIZE)?;
        if epoch_size == 0 {
            return Err(ConfigError::Invalid {
                var: "EPOCH_SIZE",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let poll_ms = parse_or(&lookup, "POLL_INTERVAL_MS", 1_000u64)?;
        if poll_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "POLL_INTERVAL_MS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            signer,
            rpc_url: lookup("CELO_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            slow_reset_delay: parse_or(&lookup, "SLOW_RESET_DELAY", DEFAULT_SLOW_RESET_DELAY)?,
            poll_interval: Duration::from_millis(poll_ms),
            block_time_secs: parse_or(&lookup, "BLOCK_TIME_SECS", DEFAULT_BLOCK_TIME_SECS)?,
            epoch_size,
            rpc_timeout: Duration::from_millis(parse_or(&lookup, "RPC_TIMEOUT_MS", 5_000u64)?),
            telemetry,
        })
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            signer: self.signer,
            slow_reset_delay: self.slow_reset_delay,
            block_time_secs: self.block_time_secs,
            poll_interval: self.poll_interval,
            call_timeout: self.rpc_timeout,
            exporter_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn rpc_config(&self) -> CeloRpcConfig {
        CeloRpcConfig {
            url: self.rpc_url.clone(),
            epoch_size: self.epoch_size,
            request_timeout: self.rpc_timeout,
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
