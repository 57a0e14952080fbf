//! Decode arbitrary bytes against a representative schema.
//!
//! The decoder must reject garbage with an error, never a panic, and a
//! successful decode must re-encode without error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tightbeam_core::Codec;
use tightbeam_schema::{EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor};

fn build_codec() -> Codec {
    let mut codec = Codec::new();
    codec
        .load(
            MessageDescriptor::new("fuzz.Status")
                .with_id(1)
                .with_max_bytes(64)
                .with_field(
                    FieldDescriptor::required("node", FieldKind::UInt32)
                        .with_range(0.0, 31.0)
                        .in_header(),
                )
                .with_field(
                    FieldDescriptor::required("depth", FieldKind::Double)
                        .with_range(0.0, 500.0)
                        .with_precision(1),
                )
                .with_field(
                    FieldDescriptor::optional("battery", FieldKind::UInt32).with_range(0.0, 100.0),
                )
                .with_field(FieldDescriptor::required(
                    "mode",
                    FieldKind::Enum(EnumDescriptor::new("Mode", ["IDLE", "SURVEY", "ABORT"])),
                ))
                .with_field(FieldDescriptor::optional("label", FieldKind::String).with_max_length(8))
                .with_field(
                    FieldDescriptor::repeated("legs", FieldKind::Int32, 6)
                        .with_range(-100.0, 100.0),
                ),
        )
        .expect("fuzz schema is valid");
    codec
}

fuzz_target!(|data: &[u8]| {
    let mut codec = build_codec();
    if let Ok(record) = codec.decode(data) {
        // Anything that decodes must be a legal record.
        let _ = codec.encode(&record).expect("decoded records re-encode");
    }
});
