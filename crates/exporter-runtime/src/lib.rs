//! # Exporter Runtime
//!
//! Wires the signer monitor to a live Celo node and the Prometheus endpoint.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging
//! 3. Build the metric registry and start `/metrics`
//! 4. Connect the JSON-RPC client
//! 5. Run the poll loop until Ctrl+C

pub mod config;

pub use config::{ConfigError, ExporterConfig};

use anyhow::{Context, Result};
use signer_monitor::{CeloRpcClient, PrometheusMetricsSink, SignerMonitorService};
use signer_telemetry::ExporterMetrics;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Running exporter: metrics server plus poll loop.
pub struct ExporterRuntime {
    config: ExporterConfig,
    metrics: Arc<ExporterMetrics>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ExporterRuntime {
    pub fn new(config: ExporterConfig) -> Result<Self> {
        let metrics =
            Arc::new(ExporterMetrics::new().context("Failed to register exporter metrics")?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            metrics,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn metrics(&self) -> Arc<ExporterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Spawn the metrics server and the poll loop.
    pub async fn start(&self) -> Result<JoinHandle<()>> {
        info!("===========================================");
        info!("  Celo Signer Watch v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let listener = signer_telemetry::bind_metrics(self.config.telemetry.metrics_addr())
            .await
            .context("Failed to bind metrics endpoint")?;
        let metrics = self.metrics();
        tokio::spawn(async move {
            if let Err(e) = signer_telemetry::serve_on(listener, metrics).await {
                error!(error = %e, "Metrics server stopped");
            }
        });

        let chain = Arc::new(
            CeloRpcClient::new(self.config.rpc_config()).context("Failed to build RPC client")?,
        );
        let sink = Arc::new(PrometheusMetricsSink::new(
            self.metrics(),
            self.config.signer.to_hex(),
        ));

        info!(
            signer = %self.config.signer,
            rpc = %chain.url(),
            epoch_size = self.config.epoch_size,
            slow_reset_delay = self.config.slow_reset_delay,
            "Monitoring validator signer"
        );

        let service = SignerMonitorService::new(self.config.monitor_config(), chain, sink);
        Ok(tokio::spawn(service.run(self.shutdown_rx.clone())))
    }

    /// Signal the poll loop to stop.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unreachable_node_config() -> ExporterConfig {
        let mut config = ExporterConfig::from_lookup(|key| match key {
            config::SIGNER_ADDRESS_VAR => {
                Some("0x00000000000000000000000000000000000000ff".to_string())
            }
            "CELO_RPC_URL" => Some("http://127.0.0.1:1".to_string()),
            "RPC_TIMEOUT_MS" => Some("200".to_string()),
            "POLL_INTERVAL_MS" => Some("50".to_string()),
            _ => None,
        })
        .unwrap();
        config.telemetry.metrics_port = 0;
        config
    }

    #[tokio::test]
    async fn test_start_and_shutdown_with_unreachable_node() {
        let runtime = ExporterRuntime::new(unreachable_node_config()).unwrap();
        let poll_loop = runtime.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        runtime.shutdown();

        tokio::time::timeout(Duration::from_secs(2), poll_loop)
            .await
            .expect("poll loop did not stop")
            .unwrap();

        // Exporter info is published even without a node.
        let text = runtime.metrics().encode().unwrap();
        assert!(text.contains("celochain_exporter_info"));
    }

    #[tokio::test]
    async fn test_start_fails_when_metrics_port_taken() {
        let held = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let mut config = unreachable_node_config();
        config.telemetry.metrics_port = held.local_addr().unwrap().port();

        let runtime = ExporterRuntime::new(config).unwrap();
        let err = runtime.start().await.unwrap_err();
        assert!(err.to_string().contains("Failed to bind metrics endpoint"));
    }
}
