//! Core value types shared by the monitor components.

use crate::error::{MonitorError, MonitorResult};
use std::fmt;
use std::str::FromStr;

/// 20-byte account address of the monitored signer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Lowercase `0x`-prefixed hex form, used as the metrics label.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = MonitorError;

    fn from_str(input: &str) -> MonitorResult<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(digits).map_err(|e| MonitorError::InvalidAddress {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        let raw: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| MonitorError::InvalidAddress {
                input: input.to_string(),
                reason: format!("expected 20 bytes, got {}", bytes.len()),
            })?;

        Ok(Address(raw))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A block as fetched from the chain client.
///
/// `extra_data` is the raw header field carrying the signing bitmap; it is
/// only interpreted by the bitmap decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub number: u64,
    pub extra_data: Vec<u8>,
}

/// Epoch boundaries as reported by the chain client.
///
/// Replaced wholesale on every refresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EpochInfo {
    pub start_block: u64,
    pub number: u64,
    pub end_block: u64,
}

/// Where the signer sits in the active validator set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatorPosition {
    /// Slot of the signer, `None` when it is not in the set
    pub index: Option<usize>,
    /// Number of validators in the set
    pub set_size: usize,
}

impl ValidatorPosition {
    pub fn absent(set_size: usize) -> Self {
        Self {
            index: None,
            set_size,
        }
    }
}

/// Outcome of looking up the signer's slot in a block's signing bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignerBit {
    Signed,
    Missed,
    /// Bitmap unparseable or index out of range
    Invalid,
}
