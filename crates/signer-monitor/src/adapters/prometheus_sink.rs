//! Prometheus Metrics Sink
//!
//! Implements `MetricsSink` on top of the exporter's labeled metric families.
//! Every series carries the monitored signer address as its `signer` label.

use crate::domain::{DowntimeState, EpochCountdown};
use crate::error::{MonitorError, MonitorResult};
use crate::ports::outbound::MetricsSink;
use parking_lot::Mutex;
use prometheus::IntGaugeVec;
use signer_telemetry::ExporterMetrics;
use std::sync::Arc;

/// Sink writing into an [`ExporterMetrics`] registry.
pub struct PrometheusMetricsSink {
    metrics: Arc<ExporterMetrics>,
    signer: String,
    exporter_version: Mutex<Option<String>>,
    client_version: Mutex<Option<String>>,
}

impl PrometheusMetricsSink {
    pub fn new(metrics: Arc<ExporterMetrics>, signer: impl Into<String>) -> Self {
        Self {
            metrics,
            signer: signer.into(),
            exporter_version: Mutex::new(None),
            client_version: Mutex::new(None),
        }
    }

    fn set_gauge(&self, family: &IntGaugeVec, value: i64) -> MonitorResult<()> {
        family
            .get_metric_with_label_values(&[self.signer.as_str()])
            .map_err(push_error)?
            .set(value);
        Ok(())
    }

    /// The new version series is set before the stale one is removed, so a
    /// scrape never sees the family empty.
    fn set_info(
        &self,
        family: &IntGaugeVec,
        current: &Mutex<Option<String>>,
        version: &str,
    ) -> MonitorResult<()> {
        let mut current = current.lock();
        family
            .get_metric_with_label_values(&[self.signer.as_str(), version])
            .map_err(push_error)?
            .set(1);

        if let Some(previous) = current.as_deref().filter(|p| *p != version) {
            family
                .remove_label_values(&[self.signer.as_str(), previous])
                .map_err(push_error)?;
        }
        *current = Some(version.to_string());
        Ok(())
    }
}

fn push_error(err: prometheus::Error) -> MonitorError {
    MonitorError::MetricsPush {
        reason: err.to_string(),
    }
}

fn gauge_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl MetricsSink for PrometheusMetricsSink {
    fn set_exporter_info(&self, version: &str) -> MonitorResult<()> {
        self.set_info(&self.metrics.exporter_info, &self.exporter_version, version)
    }

    fn set_client_info(&self, version: &str) -> MonitorResult<()> {
        self.set_info(&self.metrics.client_info, &self.client_version, version)
    }

    fn set_latest_block(&self, number: u64) -> MonitorResult<()> {
        self.set_gauge(&self.metrics.latest_block_number, gauge_value(number))
    }

    fn set_epoch(&self, epoch: u64) -> MonitorResult<()> {
        self.set_gauge(&self.metrics.epoch_current, gauge_value(epoch))
    }

    fn set_epoch_countdown(&self, countdown: EpochCountdown) -> MonitorResult<()> {
        self.set_gauge(&self.metrics.epoch_countdown_blocks, countdown.blocks)?;
        self.set_gauge(&self.metrics.epoch_countdown_seconds, countdown.seconds)
    }

    fn publish_downtime(&self, state: &DowntimeState) -> MonitorResult<()> {
        // Counters cannot be set, so catch up to the state machine's total.
        let total = self
            .metrics
            .downtime_blocks
            .get_metric_with_label_values(&[self.signer.as_str()])
            .map_err(push_error)?;
        let exported = total.get();
        if state.total_downtime_blocks > exported {
            total.inc_by(state.total_downtime_blocks - exported);
        }

        self.set_gauge(
            &self.metrics.downtime_consecutive,
            gauge_value(state.consecutive),
        )?;
        self.set_gauge(
            &self.metrics.downtime_consecutive_slow,
            gauge_value(state.consecutive_slow),
        )
    }
}
