//! # signer-monitor
//!
//! Downtime tracking for a single Celo validator signer.
//!
//! ## Overview
//!
//! This crate provides:
//! - **Bitmap decoding**: signer slot lookup in the Istanbul aggregated seal
//! - **Epoch tracking**: current epoch bounds and the signer's validator slot
//! - **Downtime state machine**: fast and slow consecutive-miss gauges with hysteresis
//! - **Poll loop**: one block per tick, metrics pushed on every transition
//!
//! ## Architecture
//!
//! ```text
//! Celo node ──JSON-RPC──→ CeloRpcClient (ChainClient)
//!                              │
//!                              ▼
//!                     SignerMonitorService ──→ EpochTracker
//!                              │          ──→ BitmapDecoder
//!                              │          ──→ DowntimeStateMachine
//!                              ▼
//!                  PrometheusMetricsSink (MetricsSink) ──→ /metrics
//! ```
//!
//! ## Slow Gauge Hysteresis
//!
//! ```text
//! [IDLE] ──miss──→ [SLOW > 0] ──sign──→ counter += 1 ... counter == delay ──sign──→ [IDLE]
//!                      ↑                       │
//!                      └──────── miss ─────────┘ (counter reset, slow keeps climbing)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use signer_monitor::{CeloRpcClient, CeloRpcConfig, MonitorConfig, SignerMonitorService};
//!
//! let chain = Arc::new(CeloRpcClient::new(CeloRpcConfig::default())?);
//! let sink = Arc::new(PrometheusMetricsSink::new(metrics, signer.to_hex()));
//! let service = SignerMonitorService::new(MonitorConfig::new(signer), chain, sink);
//!
//! service.run(shutdown_rx).await;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{CeloRpcClient, CeloRpcConfig, PrometheusMetricsSink};
pub use domain::{
    Address, BitmapDecoder, Block, DowntimeConfig, DowntimeState, DowntimeStateMachine,
    DowntimeUpdate, EpochCountdown, EpochInfo, EpochTracker, Outcome, RefreshReason, SignerBit,
    SigningBitmap, ValidatorPosition,
};
pub use error::{MonitorError, MonitorResult};
pub use ports::{ChainClient, MetricsSink};
pub use service::{MonitorConfig, SignerMonitorService, TickOutcome};
