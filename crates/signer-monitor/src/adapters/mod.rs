//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits: the Celo JSON-RPC chain client, the
//! Prometheus metrics sink, and in-memory test doubles for both.

mod celo_rpc;
mod mock;
mod prometheus_sink;

pub use celo_rpc::{
    epoch_for_block, parse_data, parse_quantity, CeloRpcClient, CeloRpcConfig, DEFAULT_EPOCH_SIZE,
};
pub use mock::{
    block_with_signers, istanbul_extra_data, MockChainClient, RecordedMetrics,
    RecordingMetricsSink,
};
pub use prometheus_sink::PrometheusMetricsSink;
