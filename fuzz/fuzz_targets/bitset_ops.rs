//! Exercise Bitset operations with arbitrary sequences.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tightbeam_core::Bitset;

#[derive(Arbitrary, Debug)]
enum Op {
    Append { value: u64, n: u8 },
    Prepend { value: u64, n: u8 },
    PopFront { n: u8 },
    Bytes,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut bits = Bitset::new();
    let mut expected_len = 0usize;

    for op in ops {
        match op {
            Op::Append { value, n } => {
                let n = u32::from(n) % 65;
                bits.append_bits(value, n);
                expected_len += n as usize;
            }
            Op::Prepend { value, n } => {
                let n = u32::from(n) % 65;
                bits.prepend_bits(value, n);
                expected_len += n as usize;
            }
            Op::PopFront { n } => {
                let n = u32::from(n) % 65;
                if bits.pop_front_bits(n).is_ok() {
                    expected_len -= n as usize;
                }
            }
            Op::Bytes => {
                let packed = bits.to_bytes();
                let rebuilt = Bitset::from_bytes(&packed);
                assert_eq!(rebuilt.len(), bits.len().div_ceil(8) * 8);
            }
        }
        assert_eq!(bits.len(), expected_len, "length bookkeeping drifted");
    }
});
