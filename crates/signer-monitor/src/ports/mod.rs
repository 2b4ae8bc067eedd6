//! Ports module for the signer monitor

pub mod outbound;

pub use outbound::{with_deadline, ChainClient, MetricsSink};
