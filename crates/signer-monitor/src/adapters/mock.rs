//! In-memory adapters for driving the poll loop in tests.

use crate::domain::{
    Address, Block, DowntimeState, EpochCountdown, EpochInfo, ValidatorPosition,
    EXTRA_VANITY_LEN,
};
use crate::error::{MonitorError, MonitorResult};
use crate::ports::outbound::{ChainClient, MetricsSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use rlp::RlpStream;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Build an Istanbul `extraData` field whose aggregated seal carries `bitmap`.
///
/// `bitmap` is the big-endian big-integer encoding, slot 0 in the lowest bit.
pub fn istanbul_extra_data(bitmap: &[u8]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(6);
    stream.begin_list(0);
    stream.begin_list(0);
    stream.append_empty_data();
    stream.append_empty_data();

    stream.begin_list(3);
    stream.append(&bitmap.to_vec());
    stream.append(&vec![0xAAu8; 48]);
    stream.append_empty_data();

    stream.begin_list(3);
    stream.append_empty_data();
    stream.append_empty_data();
    stream.append_empty_data();

    let mut extra = vec![0u8; EXTRA_VANITY_LEN];
    extra.extend_from_slice(&stream.out());
    extra
}

/// Block at `number` whose seal has exactly the `signed` slots set.
pub fn block_with_signers(number: u64, signed: &[usize]) -> Block {
    let width = signed.iter().max().map_or(0, |top| top / 8 + 1);
    let mut bitmap = vec![0u8; width];
    for slot in signed {
        bitmap[width - 1 - slot / 8] |= 1 << (slot % 8);
    }
    Block {
        number,
        extra_data: istanbul_extra_data(&bitmap),
    }
}

/// Scriptable chain client.
#[derive(Default)]
pub struct MockChainClient {
    latest: Mutex<Option<Block>>,
    epoch: Mutex<EpochInfo>,
    validators: Mutex<Vec<Address>>,
    latest_delay: Mutex<Option<Duration>>,
    fail_next_latest: AtomicBool,
    fail_next_validator_lookup: AtomicBool,
    fail_next_client_version: AtomicBool,
    epoch_info_calls: AtomicU64,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_latest(&self, block: Block) {
        *self.latest.lock() = Some(block);
    }

    pub fn set_epoch(&self, epoch: EpochInfo) {
        *self.epoch.lock() = epoch;
    }

    pub fn set_validators(&self, validators: Vec<Address>) {
        *self.validators.lock() = validators;
    }

    /// Make `latest_block` sleep before answering.
    pub fn set_latest_delay(&self, delay: Option<Duration>) {
        *self.latest_delay.lock() = delay;
    }

    pub fn fail_next_latest(&self) {
        self.fail_next_latest.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_validator_lookup(&self) {
        self.fail_next_validator_lookup.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_client_version(&self) {
        self.fail_next_client_version.store(true, Ordering::SeqCst);
    }

    /// Number of epoch queries served so far.
    pub fn epoch_info_calls(&self) -> u64 {
        self.epoch_info_calls.load(Ordering::SeqCst)
    }

    fn unreachable() -> MonitorError {
        MonitorError::Connection {
            reason: "mock node unreachable".to_string(),
        }
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn latest_block(&self) -> MonitorResult<Block> {
        let delay = *self.latest_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_next_latest.swap(false, Ordering::SeqCst) {
            return Err(Self::unreachable());
        }
        self.latest
            .lock()
            .clone()
            .ok_or_else(|| MonitorError::MalformedResponse {
                what: "block",
                reason: "no block scripted".to_string(),
            })
    }

    async fn epoch_info(&self) -> MonitorResult<EpochInfo> {
        self.epoch_info_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.epoch.lock())
    }

    async fn validator_index(&self, signer: &Address) -> MonitorResult<ValidatorPosition> {
        if self.fail_next_validator_lookup.swap(false, Ordering::SeqCst) {
            return Err(Self::unreachable());
        }
        let validators = self.validators.lock();
        Ok(ValidatorPosition {
            index: validators.iter().position(|v| v == signer),
            set_size: validators.len(),
        })
    }

    async fn client_version(&self) -> MonitorResult<String> {
        if self.fail_next_client_version.swap(false, Ordering::SeqCst) {
            return Err(Self::unreachable());
        }
        Ok("celo/mock-v1.0.0".to_string())
    }
}

/// Last values seen by [`RecordingMetricsSink`].
#[derive(Clone, Debug, Default)]
pub struct RecordedMetrics {
    pub exporter_version: Option<String>,
    pub client_version: Option<String>,
    pub latest_block: Option<u64>,
    pub epoch: Option<u64>,
    pub countdown: Option<EpochCountdown>,
    pub downtime: Vec<DowntimeState>,
}

/// Metrics sink that keeps everything in memory.
#[derive(Default)]
pub struct RecordingMetricsSink {
    recorded: Mutex<RecordedMetrics>,
    reject_pushes: AtomicBool,
}

impl RecordingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RecordedMetrics {
        self.recorded.lock().clone()
    }

    /// Last downtime state pushed, if any.
    pub fn last_downtime(&self) -> Option<DowntimeState> {
        self.recorded.lock().downtime.last().copied()
    }

    /// Make every push fail until switched off again.
    pub fn reject_pushes(&self, reject: bool) {
        self.reject_pushes.store(reject, Ordering::SeqCst);
    }

    fn record(&self, apply: impl FnOnce(&mut RecordedMetrics)) -> MonitorResult<()> {
        if self.reject_pushes.load(Ordering::SeqCst) {
            return Err(MonitorError::MetricsPush {
                reason: "sink rejecting pushes".to_string(),
            });
        }
        apply(&mut self.recorded.lock());
        Ok(())
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn set_exporter_info(&self, version: &str) -> MonitorResult<()> {
        self.record(|m| m.exporter_version = Some(version.to_string()))
    }

    fn set_client_info(&self, version: &str) -> MonitorResult<()> {
        self.record(|m| m.client_version = Some(version.to_string()))
    }

    fn set_latest_block(&self, number: u64) -> MonitorResult<()> {
        self.record(|m| m.latest_block = Some(number))
    }

    fn set_epoch(&self, epoch: u64) -> MonitorResult<()> {
        self.record(|m| m.epoch = Some(epoch))
    }

    fn set_epoch_countdown(&self, countdown: EpochCountdown) -> MonitorResult<()> {
        self.record(|m| m.countdown = Some(countdown))
    }

    fn publish_downtime(&self, state: &DowntimeState) -> MonitorResult<()> {
        self.record(|m| m.downtime.push(*state))
    }
}
