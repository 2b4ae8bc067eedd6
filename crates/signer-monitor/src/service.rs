//! Signer Monitor Service - the poll loop
//!
//! One tick per poll interval:
//!
//! ```text
//! latest_block ──→ publish latest number + countdown (vs last processed)
//!      │
//!      ├── same number as last processed ──→ done
//!      │
//!      └── new block
//!            ├── pending refresh? ──→ EpochTracker::refresh, publish epoch gauges
//!            ├── BitmapDecoder::bit_at(signer slot)
//!            ├── DowntimeStateMachine::observe ──→ publish downtime counters
//!            └── invalid bit / last block of epoch ──→ set pending refresh
//! ```
//!
//! A refresh requested on block N is performed when block N+1 (or later) is
//! first seen, so the node already reports the new epoch.

use crate::domain::{
    Address, BitmapDecoder, Block, DowntimeConfig, DowntimeStateMachine, DowntimeUpdate,
    EpochTracker, Outcome, RefreshReason, DEFAULT_BLOCK_TIME_SECS,
    DEFAULT_SLOW_RESET_DELAY,
};
use crate::error::MonitorResult;
use crate::ports::outbound::{with_deadline, ChainClient, MetricsSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Poll loop configuration
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Monitored validator signer
    pub signer: Address,
    /// Signed blocks before the slow gauge resets
    pub slow_reset_delay: u64,
    /// Fixed chain block time used for countdown seconds
    pub block_time_secs: u64,
    /// Delay between ticks
    pub poll_interval: Duration,
    /// Upper bound on each chain call
    pub call_timeout: Duration,
    /// Reported through the exporter info metric
    pub exporter_version: String,
}

impl MonitorConfig {
    pub fn new(signer: Address) -> Self {
        Self {
            signer,
            slow_reset_delay: DEFAULT_SLOW_RESET_DELAY,
            block_time_secs: DEFAULT_BLOCK_TIME_SECS,
            poll_interval: Duration::from_secs(1),
            call_timeout: Duration::from_secs(5),
            exporter_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Latest block was already processed
    Unchanged { block: u64 },
    /// A new block went through the state machine
    Processed(DowntimeUpdate),
}

/// Signer monitor driving the epoch tracker and downtime state machine.
pub struct SignerMonitorService<C, M>
where
    C: ChainClient + ?Sized,
    M: MetricsSink + ?Sized,
{
    config: MonitorConfig,
    chain: Arc<C>,
    metrics: Arc<M>,
    decoder: BitmapDecoder,
    tracker: EpochTracker,
    machine: DowntimeStateMachine,
    pending_refresh: Option<RefreshReason>,
    epoch_resolved: bool,
    client_info_published: bool,
}

impl<C, M> SignerMonitorService<C, M>
where
    C: ChainClient + ?Sized,
    M: MetricsSink + ?Sized,
{
    pub fn new(config: MonitorConfig, chain: Arc<C>, metrics: Arc<M>) -> Self {
        let tracker = EpochTracker::new(config.signer, config.block_time_secs);
        let machine = DowntimeStateMachine::new(DowntimeConfig {
            slow_reset_delay: config.slow_reset_delay,
        });

        Self {
            config,
            chain,
            metrics,
            decoder: BitmapDecoder::new(),
            tracker,
            machine,
            pending_refresh: Some(RefreshReason::Startup),
            epoch_resolved: false,
            client_info_published: false,
        }
    }

    pub fn tracker(&self) -> &EpochTracker {
        &self.tracker
    }

    pub fn machine(&self) -> &DowntimeStateMachine {
        &self.machine
    }

    /// Refresh reason waiting for the next new block, if any.
    pub fn pending_refresh(&self) -> Option<RefreshReason> {
        self.pending_refresh
    }

    /// Publish startup metrics and resolve the first epoch.
    ///
    /// Failures are logged; an unresolved epoch or client version is retried
    /// on later ticks.
    pub async fn initialize(&mut self) {
        let version = self.config.exporter_version.clone();
        self.push("exporter_info", |m| m.set_exporter_info(&version));

        self.publish_client_info().await;

        let initial = self.machine.state();
        self.push("downtime", |m| m.publish_downtime(&initial));
        self.push("latest_block", |m| m.set_latest_block(0));

        if let Err(e) = self.refresh_epoch(RefreshReason::Startup).await {
            warn!(error = %e, "Initial epoch refresh failed, retrying on next block");
        }
    }

    /// Run one poll iteration.
    pub async fn tick(&mut self) -> MonitorResult<TickOutcome> {
        let block = with_deadline(
            "latest_block",
            self.config.call_timeout,
            self.chain.latest_block(),
        )
        .await?;

        self.push("latest_block", |m| m.set_latest_block(block.number));
        if !self.client_info_published {
            self.publish_client_info().await;
        }
        self.publish_countdown(self.machine.last_processed().unwrap_or(block.number));

        if self.machine.last_processed() == Some(block.number) {
            return Ok(TickOutcome::Unchanged {
                block: block.number,
            });
        }
        debug!(block = block.number, "New block");

        if let Some(reason) = self.pending_refresh {
            self.refresh_epoch(reason).await?;
        }

        let bit = self.decoder.bit_at(&block, self.tracker.position());
        let update = self.machine.observe(block.number, bit);
        self.report(&block, &update);

        if update.is_transition() {
            self.push("downtime", |m| m.publish_downtime(&update.state));
        }

        if update.refresh_required() {
            error!(
                block = block.number,
                index = ?self.tracker.position().index,
                "Signer bit invalid, forcing epoch refresh"
            );
            self.pending_refresh = Some(RefreshReason::InvalidSignerBit);
        }

        if self.tracker.is_epoch_boundary(block.number) {
            info!(
                block = block.number,
                epoch = self.tracker.epoch().number,
                "Last block of epoch reached"
            );
            self.pending_refresh = Some(RefreshReason::EpochBoundary);
        }

        Ok(TickOutcome::Processed(update))
    }

    /// Poll until `shutdown` flips to true.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.initialize().await;

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(signer = %self.config.signer, "Listening...");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "Poll tick skipped");
                    }
                }
                _ = shutdown.changed() => {
                    info!("Signer monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Re-resolve epoch and validator slot; clears the pending signal on success.
    async fn refresh_epoch(&mut self, reason: RefreshReason) -> MonitorResult<()> {
        let epoch = self
            .tracker
            .refresh(self.chain.as_ref(), self.config.call_timeout, reason)
            .await?;
        self.pending_refresh = None;
        self.epoch_resolved = true;

        self.push("epoch", |m| m.set_epoch(epoch.number));
        if let Some(last) = self.machine.last_processed() {
            self.publish_countdown(last);
        }
        Ok(())
    }

    async fn publish_client_info(&mut self) {
        match with_deadline(
            "client_version",
            self.config.call_timeout,
            self.chain.client_version(),
        )
        .await
        {
            Ok(client_version) => {
                info!(%client_version, "Connected to chain node");
                self.push("client_info", |m| m.set_client_info(&client_version));
                self.client_info_published = true;
            }
            Err(e) => warn!(error = %e, "Could not read node client version"),
        }
    }

    fn publish_countdown(&self, reference_block: u64) {
        if !self.epoch_resolved {
            return;
        }
        let countdown = self.tracker.countdown(reference_block);
        if countdown.is_overdue() {
            warn!(
                block = reference_block,
                epoch = self.tracker.epoch().number,
                end_block = self.tracker.epoch().end_block,
                countdown = countdown.blocks,
                "Epoch end passed without a refresh"
            );
        }
        self.push("epoch_countdown", |m| m.set_epoch_countdown(countdown));
    }

    fn report(&self, block: &Block, update: &DowntimeUpdate) {
        let state = update.state;
        match update.outcome {
            Outcome::Missed { run_started } => {
                warn!(block = block.number, run_started, "Downtime at block");
                self.log_bitmap(block);
                warn!(
                    block = block.number,
                    consecutive = state.consecutive,
                    consecutive_slow = state.consecutive_slow,
                    total = state.total_downtime_blocks,
                    "Consecutive downtime blocks: {}",
                    state.consecutive
                );
            }
            Outcome::Signed {
                fast_reset,
                slow_reset,
            } => {
                debug!(block = block.number, "Validator signature found in the block");
                if fast_reset {
                    info!(block = block.number, "Reset consecutive block gauge");
                }
                if slow_reset {
                    info!(block = block.number, "Reset slow consecutive block gauge");
                }
            }
            Outcome::Invalid | Outcome::Duplicate => {}
        }
    }

    fn log_bitmap(&self, block: &Block) {
        let position = self.tracker.position();
        let (Some(index), Ok(bitmap)) = (
            position.index,
            self.decoder.decode(block, position.set_size),
        ) else {
            return;
        };
        warn!("Decoded bitmap: {}", bitmap);
        warn!("ID marker:      {}^", " ".repeat(index));
    }

    fn push(&self, metric: &'static str, apply: impl FnOnce(&M) -> MonitorResult<()>) {
        if let Err(e) = apply(self.metrics.as_ref()) {
            warn!(metric, error = %e, "Metrics push failed");
        }
    }
}
