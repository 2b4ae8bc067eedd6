//! Domain module for the signer monitor
//!
//! ## Core Modules
//! - bitmap: Signing bitmap decoding from block headers
//! - epoch: Epoch boundaries and validator slot resolution
//! - downtime: Fast/slow consecutive downtime state machine
//! - types: Addresses, blocks, epoch info

pub mod bitmap;
pub mod downtime;
pub mod epoch;
pub mod types;

pub use bitmap::{BitmapDecoder, BitmapError, SigningBitmap, EXTRA_VANITY_LEN};
pub use downtime::{
    DowntimeConfig, DowntimeState, DowntimeStateMachine, DowntimeUpdate, Outcome,
    DEFAULT_SLOW_RESET_DELAY,
};
pub use epoch::{EpochCountdown, EpochTracker, RefreshReason, DEFAULT_BLOCK_TIME_SECS};
pub use types::{Address, Block, EpochInfo, SignerBit, ValidatorPosition};
