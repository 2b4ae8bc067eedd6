//! Prometheus metrics for the signer downtime exporter.
//!
//! All families are labeled by `signer`, the monitored validator address.
//! Names match the `celochain_*` dashboards already in use.
//!
//! ## Metric Types
//!
//! - **Counter**: `celochain_downtime_blocks_total`
//! - **Gauge**: consecutive misses (fast, slow), latest block, epoch, countdown
//! - **Info**: client and exporter versions, always 1

use crate::TelemetryError;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

const SIGNER_LABEL: &[&str] = &["signer"];
const INFO_LABELS: &[&str] = &["signer", "version"];

/// Metric families plus the registry that exposes them.
///
/// Each instance owns its registry so several exporters (or tests) can live
/// in one process.
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,

    /// Total blocks the signer missed
    pub downtime_blocks: IntCounterVec,

    /// Current run of consecutive misses
    pub downtime_consecutive: IntGaugeVec,

    /// Misses accumulated until enough blocks are signed again
    pub downtime_consecutive_slow: IntGaugeVec,

    /// Latest block number reported by the node
    pub latest_block_number: IntGaugeVec,

    /// Current epoch number
    pub epoch_current: IntGaugeVec,

    /// Blocks until the last block of the epoch
    pub epoch_countdown_blocks: IntGaugeVec,

    /// Estimated seconds until the last block of the epoch
    pub epoch_countdown_seconds: IntGaugeVec,

    /// Node client version
    pub client_info: IntGaugeVec,

    /// Exporter version
    pub exporter_info: IntGaugeVec,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let downtime_blocks = IntCounterVec::new(
            Opts::new(
                "celochain_downtime_blocks_total",
                "Total number of blocks the validator signer missed",
            ),
            SIGNER_LABEL,
        )?;
        registry.register(Box::new(downtime_blocks.clone()))?;

        let gauge = |name: &str, help: &str, labels: &[&str]| -> Result<IntGaugeVec, TelemetryError> {
            let family = IntGaugeVec::new(Opts::new(name, help), labels)?;
            registry.register(Box::new(family.clone()))?;
            Ok(family)
        };

        Ok(Self {
            downtime_consecutive: gauge(
                "celochain_downtime_blocks_consecutive",
                "Consecutive blocks missed by the validator signer",
                SIGNER_LABEL,
            )?,
            downtime_consecutive_slow: gauge(
                "celochain_downtime_blocks_consecutive_slow",
                "Consecutive missed blocks, reset only after several signed blocks",
                SIGNER_LABEL,
            )?,
            latest_block_number: gauge(
                "celochain_latest_block_number",
                "Latest block number seen by the exporter",
                SIGNER_LABEL,
            )?,
            epoch_current: gauge(
                "celochain_epoch_current",
                "Current epoch number",
                SIGNER_LABEL,
            )?,
            epoch_countdown_blocks: gauge(
                "celochain_epoch_countdown_blocks",
                "Blocks remaining until the end of the epoch",
                SIGNER_LABEL,
            )?,
            epoch_countdown_seconds: gauge(
                "celochain_epoch_countdown_seconds",
                "Estimated seconds remaining until the end of the epoch",
                SIGNER_LABEL,
            )?,
            client_info: gauge(
                "celochain_web3_client_info",
                "Version of the connected node client",
                INFO_LABELS,
            )?,
            exporter_info: gauge(
                "celochain_exporter_info",
                "Version of the signer downtime exporter",
                INFO_LABELS,
            )?,
            downtime_blocks,
            registry,
        })
    }

    /// Encode all metrics as Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}
