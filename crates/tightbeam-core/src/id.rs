//! Message identifier codecs.
//!
//! The id is the only self-describing part of the wire format: a short
//! prefix the receiver uses to pick the descriptor before decoding
//! anything else. The default codec spends one leading bit to choose
//! between a one-byte and a two-byte form; the legacy codec reproduces the
//! historic CCL convention of a bare identifying byte.

use crate::bitset::Bitset;
use crate::error::{DecodeError, EncodeError, ValidationError};

/// Contract for message identifier codecs.
///
/// Encode prepends (the id travels in front of bits already collected);
/// decode pops from the front of the received bits.
pub trait IdCodec: Send + Sync {
    /// Prepend the id's bits in wire order.
    fn encode(&self, id: u32, bits: &mut Bitset) -> Result<(), EncodeError>;

    /// Pop and return the id.
    fn decode(&self, bits: &mut Bitset) -> Result<u32, DecodeError>;

    /// Exact width of this id's encoding in bits.
    fn size_bits(&self, id: u32) -> Result<u32, ValidationError>;

    /// Smallest width any id can take.
    fn min_bits(&self) -> u32;

    /// Largest width any id can take.
    fn max_bits(&self) -> u32;

    /// Reject ids this codec cannot express.
    fn validate(&self, id: u32) -> Result<(), ValidationError>;
}

/// Variable-length id codec: `0 b6..b0` for ids 0–127 (8 bits),
/// `1 b14..b0` for ids 128–32767 (16 bits).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdCodec;

impl DefaultIdCodec {
    /// Highest id the short form can carry.
    pub const SHORT_MAX: u32 = 127;
    /// Highest id the long form can carry.
    pub const LONG_MAX: u32 = 32767;
}

impl IdCodec for DefaultIdCodec {
    fn encode(&self, id: u32, bits: &mut Bitset) -> Result<(), EncodeError> {
        self.validate(id).map_err(EncodeError::Validation)?;
        if id <= Self::SHORT_MAX {
            // Flag bit 0 is the high bit of the byte, for free.
            bits.prepend_bits(u64::from(id), 8);
        } else {
            bits.prepend_bits(u64::from(id) | (1 << 15), 16);
        }
        Ok(())
    }

    fn decode(&self, bits: &mut Bitset) -> Result<u32, DecodeError> {
        let long_form = bits.pop_front_bits(1)? == 1;
        let width = if long_form { 15 } else { 7 };
        Ok(bits.pop_front_bits(width)? as u32)
    }

    fn size_bits(&self, id: u32) -> Result<u32, ValidationError> {
        self.validate(id)?;
        Ok(if id <= Self::SHORT_MAX { 8 } else { 16 })
    }

    fn min_bits(&self) -> u32 {
        8
    }

    fn max_bits(&self) -> u32 {
        16
    }

    fn validate(&self, id: u32) -> Result<(), ValidationError> {
        if id > Self::LONG_MAX {
            return Err(ValidationError::InvalidId {
                message: String::new(),
                id,
                reason: format!("long form tops out at {}", Self::LONG_MAX),
            });
        }
        Ok(())
    }
}

/// Legacy CCL id codec: the id is a single bare byte, as the historic
/// modem-data standard framed its fixed-layout messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyIdCodec;

impl LegacyIdCodec {
    /// Highest id one byte can carry.
    pub const MAX: u32 = 255;
}

impl IdCodec for LegacyIdCodec {
    fn encode(&self, id: u32, bits: &mut Bitset) -> Result<(), EncodeError> {
        self.validate(id).map_err(EncodeError::Validation)?;
        bits.prepend_bits(u64::from(id), 8);
        Ok(())
    }

    fn decode(&self, bits: &mut Bitset) -> Result<u32, DecodeError> {
        Ok(bits.pop_front_bits(8)? as u32)
    }

    fn size_bits(&self, id: u32) -> Result<u32, ValidationError> {
        self.validate(id)?;
        Ok(8)
    }

    fn min_bits(&self) -> u32 {
        8
    }

    fn max_bits(&self) -> u32 {
        8
    }

    fn validate(&self, id: u32) -> Result<(), ValidationError> {
        if id > Self::MAX {
            return Err(ValidationError::InvalidId {
                message: String::new(),
                id,
                reason: format!("legacy ids are one byte, max {}", Self::MAX),
            });
        }
        Ok(())
    }
}
