//! The range coder engine.
//!
//! Classic integer arithmetic coding over [`CODE_VALUE_BITS`] of
//! precision: the interval `[low, high]` narrows with every symbol, equal
//! leading bits are emitted as soon as they are determined, and near-half
//! straddles are deferred through the pending-bit (E3) mechanism.
//!
//! The decoder mirrors the encoder's renormalisation exactly: same
//! interval updates, same emit/pending counting, so it always knows how
//! many bits the encoder produced. That makes one encoded field
//! self-delimiting inside a larger bit stream: the decoder reads ahead
//! into its value register, then hands every bit past the encoded length
//! back to the stream. The flush (one disambiguating bit plus pending)
//! guarantees those borrowed continuation bits cannot change any symbol
//! decision.

use crate::arith::model::CODE_VALUE_BITS;
use crate::bitset::Bitset;
use crate::error::DecodeError;

const TOP: u64 = (1 << CODE_VALUE_BITS) - 1;
const QUARTER: u64 = 1 << (CODE_VALUE_BITS - 2);
const HALF: u64 = 2 * QUARTER;
const THREE_QUARTERS: u64 = 3 * QUARTER;

/// Streaming encoder for one field's symbol sequence.
pub(crate) struct RangeEncoder {
    low: u64,
    high: u64,
    pending: u64,
    out: Bitset,
}

impl RangeEncoder {
    pub(crate) fn new() -> Self {
        Self { low: 0, high: TOP, pending: 0, out: Bitset::new() }
    }

    /// Narrow the interval to a symbol's cumulative range `[c_lo, c_hi)`
    /// out of `total`, emitting bits as they become determined.
    pub(crate) fn encode(&mut self, c_lo: u64, c_hi: u64, total: u64) {
        debug_assert!(c_lo < c_hi && c_hi <= total);
        let range = self.high - self.low + 1;
        self.high = self.low + range * c_hi / total - 1;
        self.low += range * c_lo / total;

        loop {
            if self.high < HALF {
                self.emit(false);
            } else if self.low >= HALF {
                self.emit(true);
                self.low -= HALF;
                self.high -= HALF;
            } else if self.low >= QUARTER && self.high < THREE_QUARTERS {
                self.pending += 1;
                self.low -= QUARTER;
                self.high -= QUARTER;
            } else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
        }
    }

    fn emit(&mut self, bit: bool) {
        self.out.push_back(bit);
        for _ in 0..self.pending {
            self.out.push_back(!bit);
        }
        self.pending = 0;
    }

    /// Flush: one bit naming the quarter the final interval wholly
    /// contains, plus deferred pending bits. Everything appended after
    /// these bits keeps the code value inside the final interval.
    pub(crate) fn finish(mut self) -> Bitset {
        self.pending += 1;
        let bit = self.low >= QUARTER;
        self.emit(bit);
        self.out
    }
}

/// Streaming decoder consuming bits from the front of a shared stream.
pub(crate) struct RangeDecoder<'a> {
    src: &'a mut Bitset,
    /// Bits actually popped from `src`, for handing back unused tail bits.
    read: Vec<bool>,
    value: u64,
    low: u64,
    high: u64,
    pending: u64,
    emitted: u64,
}

impl<'a> RangeDecoder<'a> {
    pub(crate) fn new(src: &'a mut Bitset) -> Self {
        let mut decoder =
            Self { src, read: Vec::new(), value: 0, low: 0, high: TOP, pending: 0, emitted: 0 };
        for _ in 0..CODE_VALUE_BITS {
            decoder.value = (decoder.value << 1) | decoder.next_bit();
        }
        decoder
    }

    /// Bits past the end of the stream read as zero; [`Self::finish`]
    /// detects genuine truncation by comparing against the mirrored
    /// encoder bit count.
    fn next_bit(&mut self) -> u64 {
        match self.src.pop_front() {
            Some(bit) => {
                self.read.push(bit);
                u64::from(bit)
            },
            None => 0,
        }
    }

    /// Cumulative frequency the current code value points at.
    pub(crate) fn target(&self, total: u64) -> u64 {
        let range = self.high - self.low + 1;
        ((self.value - self.low + 1) * total - 1) / range
    }

    /// Apply the identified symbol's interval update, mirroring the
    /// encoder's emit/pending accounting.
    pub(crate) fn consume(&mut self, c_lo: u64, c_hi: u64, total: u64) {
        debug_assert!(c_lo < c_hi && c_hi <= total);
        let range = self.high - self.low + 1;
        self.high = self.low + range * c_hi / total - 1;
        self.low += range * c_lo / total;

        loop {
            if self.high < HALF {
                self.count_emit();
            } else if self.low >= HALF {
                self.count_emit();
                self.low -= HALF;
                self.high -= HALF;
                self.value -= HALF;
            } else if self.low >= QUARTER && self.high < THREE_QUARTERS {
                self.pending += 1;
                self.low -= QUARTER;
                self.high -= QUARTER;
                self.value -= QUARTER;
            } else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
            self.value = (self.value << 1) | self.next_bit();
        }
    }

    fn count_emit(&mut self) {
        self.emitted += 1 + self.pending;
        self.pending = 0;
    }

    /// Settle with the stream: push read-ahead bits that belong to
    /// subsequent fields back onto the front, or report truncation when
    /// the stream held fewer bits than the encoder emitted.
    pub(crate) fn finish(self) -> Result<(), DecodeError> {
        let encoded_len = (self.emitted + self.pending + 2) as usize;
        if self.read.len() < encoded_len {
            return Err(DecodeError::Truncated {
                requested: encoded_len,
                available: self.read.len(),
            });
        }
        for bit in self.read[encoded_len..].iter().rev() {
            self.src.push_front(*bit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Uniform three-way model: EOF at [0,1), symbols at [1,2), [2,3), [3,4).
    fn ranges() -> Vec<(u64, u64)> {
        vec![(0, 1), (1, 2), (2, 3), (3, 4)]
    }

    fn encode_sequence(symbols: &[usize]) -> Bitset {
        let mut enc = RangeEncoder::new();
        for s in symbols {
            let (lo, hi) = ranges()[*s];
            enc.encode(lo, hi, 4);
        }
        enc.finish()
    }

    fn decode_sequence(bits: &mut Bitset, count: usize) -> Vec<usize> {
        let mut dec = RangeDecoder::new(bits);
        let mut out = Vec::new();
        for _ in 0..count {
            let cum = dec.target(4);
            let symbol = ranges().iter().position(|(lo, hi)| cum >= *lo && cum < *hi).unwrap();
            let (lo, hi) = ranges()[symbol];
            dec.consume(lo, hi, 4);
            out.push(symbol);
        }
        dec.finish().unwrap();
        out
    }

    #[test]
    fn round_trips_a_symbol_sequence() {
        let symbols = vec![1, 3, 2, 1, 1, 0, 3];
        let mut bits = encode_sequence(&symbols);
        assert_eq!(decode_sequence(&mut bits, symbols.len()), symbols);
        assert!(bits.is_empty());
    }

    #[test]
    fn flush_alone_is_two_bits() {
        let enc = RangeEncoder::new();
        assert_eq!(enc.finish().len(), 2);
    }

    #[test]
    fn decoder_returns_unused_bits_to_the_stream() {
        let symbols = vec![2, 2, 0];
        let mut bits = encode_sequence(&symbols);
        let field_len = bits.len();

        // Bits of a hypothetical next field.
        bits.append_bits(0b10110, 5);
        let total_len = bits.len();
        assert_eq!(total_len, field_len + 5);

        assert_eq!(decode_sequence(&mut bits, symbols.len()), symbols);
        assert_eq!(bits.len(), 5, "exactly the trailing field bits remain");
        assert_eq!(bits.pop_front_bits(5).unwrap(), 0b10110);
    }

    #[test]
    fn trailing_garbage_does_not_change_decisions() {
        let symbols = vec![0, 1, 2, 3, 3, 1];
        let clean = encode_sequence(&symbols);

        for suffix in [0u64, 0b11111, 0b10101] {
            let mut bits = clean.clone();
            bits.append_bits(suffix, 5);
            assert_eq!(decode_sequence(&mut bits, symbols.len()), symbols);
            assert_eq!(bits.pop_front_bits(5).unwrap(), suffix & 0b11111);
        }
    }

    #[test]
    fn truncated_stream_is_detected() {
        let symbols = vec![1, 2, 3, 1, 2, 3, 1, 2, 3];
        let mut full = encode_sequence(&symbols);
        let full_len = full.len();

        // Keep all but the final two bits of the encoding.
        let mut trimmed = Bitset::new();
        for _ in 0..full_len - 2 {
            if let Some(bit) = full.pop_front() {
                trimmed.push_back(bit);
            }
        }

        // Drive the decoder through the same interval updates the encoder
        // made; symbol decisions may diverge on truncated input, only the
        // final bit accounting matters here.
        let mut dec = RangeDecoder::new(&mut trimmed);
        for s in &symbols {
            let (lo, hi) = ranges()[*s];
            dec.consume(lo, hi, 4);
        }
        assert!(matches!(dec.finish(), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn skewed_ranges_cost_fewer_bits_for_likely_symbols() {
        // 252 of 256 for symbol 0: long runs should compress well below
        // one bit per symbol.
        let mut enc = RangeEncoder::new();
        for _ in 0..64 {
            enc.encode(0, 252, 256);
        }
        let bits = enc.finish();
        assert!(bits.len() < 16, "64 near-certain symbols took {} bits", bits.len());
    }
}
