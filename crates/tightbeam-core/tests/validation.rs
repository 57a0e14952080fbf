//! Validator behaviour across whole descriptors.

use tightbeam_core::{Codec, CodecConfig, ValidationError};
use tightbeam_schema::{FieldDescriptor, FieldKind, MessageDescriptor, Record};

#[test]
fn variable_width_header_fields_are_rejected() {
    let mut codec = Codec::new();
    let err = codec
        .load(
            MessageDescriptor::new("test.BadHead").with_id(30).with_max_bytes(16).with_field(
                FieldDescriptor::optional("route", FieldKind::UInt32)
                    .with_range(0.0, 7.0)
                    .in_header(),
            ),
        )
        .unwrap_err();
    assert!(matches!(err, ValidationError::HeaderNotFixed { .. }));
}

#[test]
fn fixed_width_header_fields_pass() {
    let mut codec = Codec::new();
    codec
        .load(
            MessageDescriptor::new("test.GoodHead").with_id(30).with_max_bytes(16).with_field(
                FieldDescriptor::required("route", FieldKind::UInt32)
                    .with_range(0.0, 7.0)
                    .in_header(),
            ),
        )
        .unwrap();
    let bounds = codec.validate("test.GoodHead").unwrap();
    assert_eq!(bounds.head_bits, 3);
}

#[test]
fn embedded_messages_encode_recursively() {
    let mut codec = Codec::new();
    codec
        .load(
            MessageDescriptor::new("test.Fix")
                .with_field(
                    FieldDescriptor::required("lat", FieldKind::Double)
                        .with_range(-90.0, 90.0)
                        .with_precision(3),
                )
                .with_field(
                    FieldDescriptor::required("lon", FieldKind::Double)
                        .with_range(-180.0, 180.0)
                        .with_precision(3),
                ),
        )
        .unwrap();
    codec
        .load(
            MessageDescriptor::new("test.Track")
                .with_id(31)
                .with_max_bytes(32)
                .with_field(FieldDescriptor::required(
                    "position",
                    FieldKind::Message("test.Fix".to_string()),
                ))
                .with_field(FieldDescriptor::optional(
                    "previous",
                    FieldKind::Message("test.Fix".to_string()),
                )),
        )
        .unwrap();

    let mut fix = Record::new("test.Fix");
    fix.set("lat", 41.523);
    fix.set("lon", -70.671);
    let mut record = Record::new("test.Track");
    record.set("position", fix.clone());

    let wire = codec.encode(&record).unwrap();
    let decoded = codec.decode(&wire).unwrap();
    let position = decoded.message("position").unwrap();
    assert_eq!(position.float("lat"), Some(41.523));
    assert_eq!(position.float("lon"), Some(-70.671));
    assert!(!decoded.has("previous"));

    // With the optional nested message present.
    record.set("previous", fix);
    let wire = codec.encode(&record).unwrap();
    let decoded = codec.decode(&wire).unwrap();
    assert_eq!(decoded.message("previous").unwrap().float("lat"), Some(41.523));
}

#[test]
fn missing_nested_type_fails_at_load() {
    let mut codec = Codec::new();
    let err = codec
        .load(
            MessageDescriptor::new("test.Dangling").with_id(32).with_max_bytes(8).with_field(
                FieldDescriptor::required("sub", FieldKind::Message("test.Nowhere".to_string())),
            ),
        )
        .unwrap_err();
    assert!(matches!(err, ValidationError::Schema(_)));
    assert!(!codec.schemas().contains("test.Dangling"), "failed loads roll back");
}

#[test]
fn self_referential_messages_are_rejected() {
    // A message embedding itself can never have a bounded size; the
    // nesting guard turns the cycle into a validation error.
    let mut codec = Codec::with_config(CodecConfig::default().without_id_codec());
    let err = codec
        .load(
            MessageDescriptor::new("test.Ouroboros").with_field(FieldDescriptor::required(
                "tail",
                FieldKind::Message("test.Ouroboros".to_string()),
            )),
        )
        .unwrap_err();
    assert!(matches!(err, ValidationError::NestingTooDeep { .. }));
}

#[test]
fn config_byte_budget_overrides_the_descriptor() {
    let schema = || {
        MessageDescriptor::new("test.Budget").with_id(33).with_max_bytes(64).with_field(
            FieldDescriptor::required("blob", FieldKind::Bytes).with_max_length(16),
        )
    };

    let mut codec = Codec::new();
    codec.load(schema()).unwrap();

    // 3 bytes cannot hold id + 5-bit prefix + 16 payload bytes.
    let mut tight = Codec::with_config(CodecConfig::default().with_max_bytes(3));
    let err = tight.load(schema()).unwrap_err();
    assert!(matches!(err, ValidationError::Oversize { max_bytes: 3, .. }));
}

#[test]
fn unknown_codec_names_are_cited_with_the_field_path() {
    let mut codec = Codec::new();
    let err = codec
        .load(
            MessageDescriptor::new("test.Typo").with_id(34).with_max_bytes(8).with_field(
                FieldDescriptor::required("v", FieldKind::UInt32)
                    .with_range(0.0, 7.0)
                    .with_codec("arithmetik"),
            ),
        )
        .unwrap_err();
    match err {
        ValidationError::UnknownCodec { path, name, .. } => {
            assert_eq!(path, "test.Typo.v");
            assert_eq!(name, "arithmetik");
        },
        other => unreachable!("expected UnknownCodec, got {other}"),
    }
}

#[test]
fn unknown_group_is_rejected() {
    let mut codec = Codec::new();
    let err = codec
        .load(
            MessageDescriptor::new("test.NoGroup")
                .with_id(35)
                .with_max_bytes(8)
                .with_group("v9")
                .with_field(FieldDescriptor::required("v", FieldKind::Bool)),
        )
        .unwrap_err();
    assert!(matches!(err, ValidationError::UnknownGroup { .. }));
}

#[test]
fn validated_schemas_encode_every_legal_record() {
    // Spot-check of the "validate proves encodability" invariant over an
    // exhaustive small domain.
    let mut codec = Codec::new();
    codec
        .load(
            MessageDescriptor::new("test.Exhaustive")
                .with_id(36)
                .with_max_bytes(8)
                .with_field(
                    FieldDescriptor::required("a", FieldKind::UInt32).with_range(0.0, 7.0),
                )
                .with_field(FieldDescriptor::optional("b", FieldKind::Bool)),
        )
        .unwrap();

    for a in 0u32..=7 {
        for b in [None, Some(false), Some(true)] {
            let mut record = Record::new("test.Exhaustive");
            record.set("a", a);
            if let Some(b) = b {
                record.set("b", b);
            }
            let wire = codec.encode(&record).unwrap();
            assert_eq!(codec.decode(&wire).unwrap(), record);
        }
    }
}
