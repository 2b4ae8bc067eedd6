//! # Signing Bitmap Decoder
//!
//! Extracts the per-validator signature bits from a block header.
//!
//! ## Header Layout (Istanbul BFT)
//!
//! ```text
//! extraData = vanity[32] || RLP([
//!     addedValidators,
//!     addedValidatorsPublicKeys,
//!     removedValidators,
//!     seal,
//!     aggregatedSeal       = [bitmap, signature, round],   <- decoded here
//!     parentAggregatedSeal = [bitmap, signature, round],
//! ])
//! ```
//!
//! `bitmap` is a big-endian unsigned integer. Bit `i`, counted from the least
//! significant end, belongs to validator slot `i`.
//!
//! Decoding never fails loudly: any anomaly surfaces as [`SignerBit::Invalid`],
//! which the poll loop treats as "re-resolve the validator set".

use crate::domain::types::{Block, SignerBit, ValidatorPosition};
use rlp::{DecoderError, Rlp};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Length of the vanity prefix in `extraData`.
pub const EXTRA_VANITY_LEN: usize = 32;

/// Position of `aggregatedSeal` inside the extra RLP list.
const AGGREGATED_SEAL_INDEX: usize = 4;

/// Why a bitmap could not be decoded.
#[derive(Debug, Error, PartialEq)]
pub enum BitmapError {
    #[error("extraData shorter than the 32-byte vanity ({0} bytes)")]
    TooShort(usize),

    #[error("istanbul extra is not an RLP list")]
    NotAList,

    #[error("RLP decode failed: {0}")]
    Rlp(#[from] DecoderError),

    #[error("bit {bit} is set but the validator set has only {set_size} members")]
    BitOutsideSet { bit: usize, set_size: usize },
}

/// Ordered signature bits, slot 0 first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningBitmap {
    bits: Vec<bool>,
}

impl SigningBitmap {
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    /// Number of validators whose signature is in the seal.
    pub fn signed_count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }
}

/// Renders as a `0`/`1` string aligned with slot indices.
impl fmt::Display for SigningBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.bits {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Stateless decoder for the Istanbul signing bitmap.
#[derive(Clone, Copy, Debug, Default)]
pub struct BitmapDecoder;

impl BitmapDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode the signing bitmap of `block` into `set_size` ordered bits.
    ///
    /// High slots omitted by the big-integer encoding read as unsigned.
    pub fn decode(&self, block: &Block, set_size: usize) -> Result<SigningBitmap, BitmapError> {
        let raw = Self::raw_bitmap(&block.extra_data)?;

        let mut bits = vec![false; set_size];
        for (byte_pos, byte) in raw.iter().rev().enumerate() {
            for offset in 0..8 {
                if byte & (1 << offset) == 0 {
                    continue;
                }
                let bit = byte_pos * 8 + offset;
                match bits.get_mut(bit) {
                    Some(slot) => *slot = true,
                    None => return Err(BitmapError::BitOutsideSet { bit, set_size }),
                }
            }
        }

        Ok(SigningBitmap { bits })
    }

    /// Look up the signer's bit, folding every failure into `Invalid`.
    pub fn bit_at(&self, block: &Block, position: ValidatorPosition) -> SignerBit {
        let index = match position.index {
            Some(index) if index < position.set_size => index,
            other => {
                debug!(
                    block = block.number,
                    index = ?other,
                    set_size = position.set_size,
                    "Signer index outside validator set"
                );
                return SignerBit::Invalid;
            }
        };

        match self.decode(block, position.set_size) {
            Ok(bitmap) => match bitmap.get(index) {
                Some(true) => SignerBit::Signed,
                Some(false) => SignerBit::Missed,
                None => SignerBit::Invalid,
            },
            Err(e) => {
                debug!(block = block.number, error = %e, "Signing bitmap decode failed");
                SignerBit::Invalid
            }
        }
    }

    fn raw_bitmap(extra_data: &[u8]) -> Result<&[u8], BitmapError> {
        let payload = extra_data
            .get(EXTRA_VANITY_LEN..)
            .ok_or(BitmapError::TooShort(extra_data.len()))?;

        let extra = Rlp::new(payload);
        if !extra.is_list() {
            return Err(BitmapError::NotAList);
        }

        let seal = extra.at(AGGREGATED_SEAL_INDEX)?;
        Ok(seal.at(0)?.data()?)
    }
}
