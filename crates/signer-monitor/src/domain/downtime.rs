//! # Downtime State Machine
//!
//! Two-track consecutive-downtime counter driven by the signer's bit in each
//! newly observed block.
//!
//! ## Tracks
//!
//! - **Fast** (`consecutive`): contiguous missed blocks, cleared by the very
//!   next signed block.
//! - **Slow** (`consecutive_slow`): same run length, but held for a debounce
//!   window of signed blocks before dropping to zero so the exported gauge
//!   does not flap during intermittent signing.
//!
//! ## Transitions
//!
//! ```text
//! Missed, block == last_downtime + 1  → fast += 1, slow += 1
//! Missed, otherwise                   → fast = 1, slow = 1, slow_reset_counter = 0
//! Signed                              → fast = 0
//!                                       slow > 0 && counter <  delay → counter += 1
//!                                       slow > 0 && counter == delay → slow = 0, counter = 0
//! Invalid                             → no mutation, refresh required
//! ```
//!
//! A non-contiguous miss restarts the slow track at 1 even when it is in the
//! middle of draining.

use crate::domain::types::SignerBit;

/// Signed blocks the slow track waits before resetting.
pub const DEFAULT_SLOW_RESET_DELAY: u64 = 3;

/// State machine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DowntimeConfig {
    pub slow_reset_delay: u64,
}

impl Default for DowntimeConfig {
    fn default() -> Self {
        Self {
            slow_reset_delay: DEFAULT_SLOW_RESET_DELAY,
        }
    }
}

/// Downtime counters. Only [`DowntimeStateMachine::observe`] mutates them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DowntimeState {
    pub consecutive: u64,
    pub consecutive_slow: u64,
    pub slow_reset_counter: u64,
    /// 0 until the first miss
    pub last_downtime_block: u64,
    pub total_downtime_blocks: u64,
}

/// What a single observation did to the counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Block number equals the last processed one; ignored
    Duplicate,
    Missed {
        /// True when this miss started a new run
        run_started: bool,
    },
    Signed {
        fast_reset: bool,
        slow_reset: bool,
    },
    /// Signer bit unknown; counters untouched
    Invalid,
}

/// Result of feeding one block to the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DowntimeUpdate {
    pub block: u64,
    pub outcome: Outcome,
    pub state: DowntimeState,
}

impl DowntimeUpdate {
    /// Whether the caller must re-resolve epoch and validator index.
    pub fn refresh_required(&self) -> bool {
        matches!(self.outcome, Outcome::Invalid)
    }

    /// Whether counters changed and should be pushed to metrics.
    pub fn is_transition(&self) -> bool {
        !matches!(self.outcome, Outcome::Duplicate | Outcome::Invalid)
    }
}

/// Owner of [`DowntimeState`].
#[derive(Debug, Default)]
pub struct DowntimeStateMachine {
    config: DowntimeConfig,
    state: DowntimeState,
    last_processed: Option<u64>,
}

impl DowntimeStateMachine {
    pub fn new(config: DowntimeConfig) -> Self {
        Self {
            config,
            state: DowntimeState::default(),
            last_processed: None,
        }
    }

    pub fn state(&self) -> DowntimeState {
        self.state
    }

    pub fn config(&self) -> DowntimeConfig {
        self.config
    }

    /// Last block number fed through [`Self::observe`], including invalid ones.
    pub fn last_processed(&self) -> Option<u64> {
        self.last_processed
    }

    /// Apply one observation.
    ///
    /// Any block number different from the last processed one is accepted,
    /// including a lower one after a node switch.
    pub fn observe(&mut self, block: u64, bit: SignerBit) -> DowntimeUpdate {
        if self.last_processed == Some(block) {
            return self.update(block, Outcome::Duplicate);
        }
        self.last_processed = Some(block);

        let outcome = match bit {
            SignerBit::Missed => self.on_missed(block),
            SignerBit::Signed => self.on_signed(),
            SignerBit::Invalid => Outcome::Invalid,
        };

        self.update(block, outcome)
    }

    fn on_missed(&mut self, block: u64) -> Outcome {
        let state = &mut self.state;
        state.total_downtime_blocks += 1;

        let contiguous = block == state.last_downtime_block.wrapping_add(1);
        if contiguous {
            state.consecutive += 1;
            state.consecutive_slow += 1;
        } else {
            state.consecutive = 1;
            state.consecutive_slow = 1;
            state.slow_reset_counter = 0;
        }
        state.last_downtime_block = block;

        Outcome::Missed {
            run_started: !contiguous,
        }
    }

    fn on_signed(&mut self) -> Outcome {
        let delay = self.config.slow_reset_delay;
        let state = &mut self.state;

        let fast_reset = state.consecutive > 0;
        state.consecutive = 0;

        let mut slow_reset = false;
        if state.consecutive_slow > 0 {
            if state.slow_reset_counter < delay {
                state.slow_reset_counter += 1;
            } else {
                state.consecutive_slow = 0;
                state.slow_reset_counter = 0;
                slow_reset = true;
            }
        }

        Outcome::Signed {
            fast_reset,
            slow_reset,
        }
    }

    fn update(&self, block: u64, outcome: Outcome) -> DowntimeUpdate {
        DowntimeUpdate {
            block,
            outcome,
            state: self.state,
        }
    }
}
