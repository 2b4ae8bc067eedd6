//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The monitor depends on two collaborators: a chain client that fetches raw
//! block and validator data, and a metrics sink that receives every counter
//! and gauge update.

use crate::domain::{Address, Block, DowntimeState, EpochCountdown, EpochInfo, ValidatorPosition};
use crate::error::{MonitorError, MonitorResult};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Read-only access to the blockchain node.
///
/// Every call may fail with a connectivity or parsing error; the poll loop
/// skips the tick in that case.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest block known to the node.
    async fn latest_block(&self) -> MonitorResult<Block>;

    /// Boundaries of the epoch containing the node's latest block.
    async fn epoch_info(&self) -> MonitorResult<EpochInfo>;

    /// Slot of `signer` in the current validator set.
    async fn validator_index(&self, signer: &Address) -> MonitorResult<ValidatorPosition>;

    /// Node software version string.
    async fn client_version(&self) -> MonitorResult<String>;
}

/// Receiver of exported metric values, keyed by the monitored signer.
///
/// Implementations must not block; a failed push is logged by the caller and
/// never rolls back monitor state.
pub trait MetricsSink: Send + Sync {
    fn set_exporter_info(&self, version: &str) -> MonitorResult<()>;

    fn set_client_info(&self, version: &str) -> MonitorResult<()>;

    fn set_latest_block(&self, number: u64) -> MonitorResult<()>;

    fn set_epoch(&self, epoch: u64) -> MonitorResult<()>;

    fn set_epoch_countdown(&self, countdown: EpochCountdown) -> MonitorResult<()>;

    /// Push all downtime counters at once.
    fn publish_downtime(&self, state: &DowntimeState) -> MonitorResult<()>;
}

/// Run a chain call under a deadline, mapping expiry to [`MonitorError::Timeout`].
pub async fn with_deadline<T, F>(
    operation: &'static str,
    timeout: Duration,
    call: F,
) -> MonitorResult<T>
where
    F: Future<Output = MonitorResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(MonitorError::Timeout { operation, timeout }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, MonitorError>(1u64)
        };

        let result = with_deadline("latest_block", Duration::from_secs(1), slow).await;
        assert!(matches!(
            result,
            Err(MonitorError::Timeout {
                operation: "latest_block",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let fast = async { Ok::<_, MonitorError>(7u64) };
        let result = with_deadline("epoch_info", Duration::from_secs(1), fast).await;
        assert_eq!(result.unwrap(), 7);
    }
}
