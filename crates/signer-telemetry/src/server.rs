//! HTTP exposition of the exporter registry.

use crate::{ExporterMetrics, TelemetryError};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Router serving `GET /metrics` and `GET /health`.
pub fn metrics_router(metrics: Arc<ExporterMetrics>) -> Router {
    Router::new().route("/health", get(health_check)).route(
        "/metrics",
        get(move || {
            let metrics = Arc::clone(&metrics);
            async move { render_metrics(&metrics) }
        }),
    )
}

/// Bind the metrics listener so callers see port conflicts before serving.
pub async fn bind_metrics(addr: SocketAddr) -> Result<TcpListener, TelemetryError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TelemetryError::Server(format!("bind {addr}: {e}")))?;
    if let Ok(local) = listener.local_addr() {
        tracing::info!(addr = %local, "Prometheus metrics endpoint listening");
    }
    Ok(listener)
}

/// Serve the registry on an already bound listener until the task is dropped.
pub async fn serve_on(
    listener: TcpListener,
    metrics: Arc<ExporterMetrics>,
) -> Result<(), TelemetryError> {
    axum::serve(listener, metrics_router(metrics))
        .await
        .map_err(|e| TelemetryError::Server(e.to_string()))
}

/// Bind `addr` and serve the registry.
pub async fn serve_metrics(
    addr: SocketAddr,
    metrics: Arc<ExporterMetrics>,
) -> Result<(), TelemetryError> {
    serve_on(bind_metrics(addr).await?, metrics).await
}

fn render_metrics(metrics: &ExporterMetrics) -> axum::response::Response {
    match metrics.encode() {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "celo-signer-watch",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
