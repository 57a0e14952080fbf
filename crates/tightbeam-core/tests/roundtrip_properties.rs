//! Property-based round-trip tests.
//!
//! For a fixed representative schema and arbitrary conforming records,
//! `decode(encode(r))` must reproduce `r` exactly (floats round to the
//! declared precision before comparison, by construction of the
//! strategies), and every encoding must respect the validated size
//! bounds.

use proptest::prelude::*;
use tightbeam_core::{Codec, CodecConfig};
use tightbeam_schema::{
    EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, Record, Value,
};

fn status_schema() -> MessageDescriptor {
    MessageDescriptor::new("test.Status")
        .with_id(40)
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
        .with_field(FieldDescriptor::optional("battery", FieldKind::UInt32).with_range(0.0, 100.0))
        .with_field(FieldDescriptor::required("surfaced", FieldKind::Bool))
        .with_field(FieldDescriptor::required(
            "mode",
            FieldKind::Enum(EnumDescriptor::new("Mode", ["IDLE", "SURVEY", "TRANSIT", "ABORT"])),
        ))
        .with_field(FieldDescriptor::optional("label", FieldKind::String).with_max_length(8))
        .with_field(
            FieldDescriptor::repeated("legs", FieldKind::Int32, 6).with_range(-100.0, 100.0),
        )
}

fn codec() -> Codec {
    let mut codec = Codec::new();
    codec.load(status_schema()).unwrap();
    codec
}

prop_compose! {
    fn arbitrary_status()(
        node in 0u32..=31,
        depth_tenths in 0u32..=5000,
        battery in proptest::option::of(0u32..=100),
        surfaced in any::<bool>(),
        mode in prop::sample::select(vec!["IDLE", "SURVEY", "TRANSIT", "ABORT"]),
        label in proptest::option::of("[a-z]{0,8}"),
        legs in prop::collection::vec(-100i64..=100, 0..=6),
    ) -> Record {
        let mut record = Record::new("test.Status");
        record.set("node", node);
        // Quantised up front so round-trip comparison is exact.
        record.set("depth", f64::from(depth_tenths) / 10.0);
        if let Some(battery) = battery {
            record.set("battery", battery);
        }
        record.set("surfaced", surfaced);
        record.set("mode", Value::Enum(mode.to_string()));
        if let Some(label) = label {
            record.set("label", label);
        }
        record.set_list("legs", legs.into_iter().map(Value::Int).collect());
        record
    }
}

proptest! {
    #[test]
    fn decode_inverts_encode(record in arbitrary_status()) {
        let mut codec = codec();
        let wire = codec.encode(&record).expect("legal record must encode");
        let decoded = codec.decode(&wire).expect("own encoding must decode");
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn encodings_respect_validated_bounds(record in arbitrary_status()) {
        let mut codec = codec();
        let bounds = codec.validate("test.Status").expect("schema is valid");
        let bits = codec.size(&record).expect("legal record must size");
        prop_assert!(bits >= bounds.min_bits());
        prop_assert!(bits <= bounds.max_bits());

        let wire = codec.encode(&record).expect("legal record must encode");
        prop_assert!((wire.len() as u64) <= bounds.max_bytes());
        prop_assert!((wire.len() as u64) >= bounds.min_bytes());
    }

    #[test]
    fn size_equals_encoded_bits(record in arbitrary_status()) {
        let mut codec = codec();
        let bits = codec.size(&record).expect("legal record must size");
        let wire = codec.encode(&record).expect("legal record must encode");
        // Two sections pad independently; reconstruct from the bounds.
        let bounds = codec.validate("test.Status").expect("schema is valid");
        let head_bits = u64::from(bounds.id_bits) + bounds.head_bits;
        let body_bits = bits - head_bits;
        prop_assert_eq!(
            wire.len() as u64,
            head_bits.div_ceil(8) + body_bits.div_ceil(8)
        );
    }

    #[test]
    fn encryption_round_trips(record in arbitrary_status()) {
        let mut codec = Codec::with_config(
            CodecConfig::default().with_passphrase(&b"shared secret"[..]),
        );
        codec.load(status_schema()).unwrap();
        let wire = codec.encode(&record).expect("legal record must encode");
        let decoded = codec.decode(&wire).expect("own encoding must decode");
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn arbitrary_bytes_never_panic_the_decoder(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut codec = codec();
        // Garbage must come back as an error or a record, never a panic.
        let _ = codec.decode(&bytes);
    }
}
