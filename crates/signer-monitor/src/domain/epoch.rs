//! # Epoch Tracker
//!
//! Holds the current epoch boundaries and the signer's slot in the active
//! validator set, and knows when both need to be re-resolved.
//!
//! ```text
//!   startup ──refresh──→ [epoch N, index i]
//!                               │
//!        last processed == end_block  OR  signer bit invalid
//!                               │
//!                               ↓
//!                     pending refresh (next new block)
//!                               │
//!                               ↓
//!                        [epoch N+1, index i']
//! ```

use crate::domain::types::{Address, EpochInfo, ValidatorPosition};
use crate::error::MonitorResult;
use crate::ports::outbound::{with_deadline, ChainClient};
use std::time::Duration;
use tracing::{info, warn};

/// Default fixed block time of the chain, in seconds.
pub const DEFAULT_BLOCK_TIME_SECS: u64 = 5;

/// Why the tracker is being re-resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshReason {
    Startup,
    /// Last processed block was the epoch's final block
    EpochBoundary,
    /// Signer bit lookup failed; the validator set may have changed
    InvalidSignerBit,
}

/// Blocks and seconds until the current epoch ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochCountdown {
    pub blocks: i64,
    pub seconds: i64,
}

impl EpochCountdown {
    /// The reference block is past the epoch end, so a boundary refresh was missed.
    pub fn is_overdue(&self) -> bool {
        self.blocks < 0
    }
}

/// Epoch boundaries plus the signer's validator slot.
#[derive(Debug)]
pub struct EpochTracker {
    signer: Address,
    block_time_secs: u64,
    epoch: EpochInfo,
    position: ValidatorPosition,
}

impl EpochTracker {
    /// Create an unresolved tracker; call [`EpochTracker::refresh`] before use.
    pub fn new(signer: Address, block_time_secs: u64) -> Self {
        Self {
            signer,
            block_time_secs,
            epoch: EpochInfo::default(),
            position: ValidatorPosition::absent(0),
        }
    }

    pub fn epoch(&self) -> EpochInfo {
        self.epoch
    }

    pub fn position(&self) -> ValidatorPosition {
        self.position
    }

    /// Re-query epoch boundaries and the signer's slot from the chain.
    ///
    /// Both lookups must succeed before anything is replaced, so a failed
    /// refresh leaves the previous view intact.
    pub async fn refresh<C: ChainClient + ?Sized>(
        &mut self,
        client: &C,
        call_timeout: Duration,
        reason: RefreshReason,
    ) -> MonitorResult<EpochInfo> {
        let epoch = with_deadline("epoch_info", call_timeout, client.epoch_info()).await?;
        let position = with_deadline(
            "validator_index",
            call_timeout,
            client.validator_index(&self.signer),
        )
        .await?;

        self.apply(epoch, position, reason);
        Ok(epoch)
    }

    /// Install a freshly resolved view.
    pub fn apply(&mut self, epoch: EpochInfo, position: ValidatorPosition, reason: RefreshReason) {
        let epoch_changed = epoch.number != self.epoch.number;
        let index_changed = position.index != self.position.index;

        self.epoch = epoch;
        self.position = position;

        info!(
            ?reason,
            epoch = epoch.number,
            end_block = epoch.end_block,
            index = ?position.index,
            set_size = position.set_size,
            epoch_changed,
            index_changed,
            "Epoch info refreshed"
        );

        if position.index.is_none() {
            warn!(
                signer = %self.signer,
                epoch = epoch.number,
                "Signer is not in the active validator set"
            );
        }
    }

    /// Countdown to the end of the epoch relative to `current_block`.
    ///
    /// Goes negative when the tracker is stale.
    pub fn countdown(&self, current_block: u64) -> EpochCountdown {
        let blocks = self.epoch.end_block as i64 - current_block as i64;
        EpochCountdown {
            blocks,
            seconds: blocks.saturating_mul(self.block_time_secs as i64),
        }
    }

    /// Exact-match boundary check against the last processed block.
    pub fn is_epoch_boundary(&self, last_processed: u64) -> bool {
        last_processed == self.epoch.end_block
    }
}
