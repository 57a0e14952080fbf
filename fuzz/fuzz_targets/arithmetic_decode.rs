//! Feed arbitrary bytes to a message with an adaptive arithmetic field.
//!
//! Checks the range decoder's self-delimiting bookkeeping and that failed
//! decodes roll adaptive model state back (a second identical decode must
//! behave identically).

#![no_main]

use libfuzzer_sys::fuzz_target;
use tightbeam_core::Codec;
use tightbeam_core::arith::{Direction, ModelSpec};
use tightbeam_schema::{FieldDescriptor, FieldKind, MessageDescriptor};

fn build_codec() -> Codec {
    let mut codec = Codec::new();
    codec
        .models()
        .create(
            ModelSpec::new("fuzz", vec![0.0, 1.0, 2.0, 3.0, 4.0], vec![5, 2, 1, 1])
                .adaptive()
                .with_out_of_range_frequency(1),
        )
        .expect("fuzz model is valid");
    codec
        .load(
            MessageDescriptor::new("fuzz.Arith")
                .with_id(1)
                .with_max_bytes(64)
                .with_field(
                    FieldDescriptor::repeated("vs", FieldKind::Int32, 8)
                        .with_codec("arithmetic")
                        .with_model("fuzz"),
                )
                .with_field(
                    FieldDescriptor::required("tail", FieldKind::UInt32).with_range(0.0, 255.0),
                ),
        )
        .expect("fuzz schema is valid");
    codec
}

fuzz_target!(|data: &[u8]| {
    let mut codec = build_codec();
    let before = codec.models().frequencies("fuzz", Direction::Decoder);

    match codec.decode(data) {
        Ok(_) => {}
        Err(_) => {
            // Rollback: a failed decode must leave the model untouched.
            let after = codec.models().frequencies("fuzz", Direction::Decoder);
            assert_eq!(before, after);
        }
    }
});
