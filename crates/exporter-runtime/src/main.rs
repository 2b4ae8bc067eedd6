//! # Celo Signer Watch
//!
//! Prometheus exporter tracking missed blocks for one Celo validator signer.

use anyhow::Result;
use exporter_runtime::{ExporterConfig, ExporterRuntime};
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match ExporterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Logging depends on config, so fall back to a default subscriber.
            let _ = signer_telemetry::init_logging(&Default::default());
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    signer_telemetry::init_logging(&config.telemetry)?;

    let runtime = ExporterRuntime::new(config)?;
    let poll_loop = runtime.start().await?;

    info!("Exporter is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown();
    if tokio::time::timeout(Duration::from_secs(2), poll_loop)
        .await
        .is_err()
    {
        warn!("Poll loop did not stop in time");
    }

    info!("Shutdown complete");
    Ok(())
}
