//! End-to-end arithmetic codec behaviour through the façade.

use tightbeam_core::arith::{Direction, EOF_SYMBOL, ModelSpec};
use tightbeam_core::{Codec, DecodeError};
use tightbeam_schema::{FieldDescriptor, FieldKind, MessageDescriptor, Record, Value};

fn arith_codec(spec: ModelSpec) -> Codec {
    let mut codec = Codec::new();
    codec.models().create(spec).unwrap();
    codec
        .load(
            MessageDescriptor::new("test.Arith").with_id(10).with_max_bytes(64).with_field(
                FieldDescriptor::required("v", FieldKind::Int32)
                    .with_codec("arithmetic")
                    .with_model("m"),
            ),
        )
        .unwrap();
    codec
}

fn three_symbols() -> ModelSpec {
    ModelSpec::new("m", vec![0.0, 1.0, 2.0, 3.0], vec![1, 1, 1])
}

fn value_frequencies(codec: &Codec, direction: Direction) -> Vec<u64> {
    codec
        .models()
        .frequencies("m", direction)
        .unwrap()
        .into_iter()
        .filter(|(s, _)| *s >= 0)
        .map(|(_, f)| f)
        .collect()
}

#[test]
fn non_adaptive_round_trip_is_exact() {
    let mut codec = arith_codec(three_symbols());
    for v in [0i64, 1, 2, 2, 0] {
        let mut record = Record::new("test.Arith");
        record.set("v", v);
        let wire = codec.encode(&record).unwrap();
        assert_eq!(codec.decode(&wire).unwrap().int("v"), Some(v));
    }
}

#[test]
fn adaptive_frequencies_follow_the_documented_rule() {
    // [1,1,1]; encoding 0, 0, 1 bumps each emitted symbol and everything
    // before it: [4,2,1].
    let mut codec = arith_codec(three_symbols().adaptive());

    for v in [0i64, 0, 1] {
        let mut record = Record::new("test.Arith");
        record.set("v", v);
        let wire = codec.encode(&record).unwrap();
        // The decoder walks the same sequence, so its state tracks.
        assert_eq!(codec.decode(&wire).unwrap().int("v"), Some(v));
    }

    assert_eq!(value_frequencies(&codec, Direction::Encoder), vec![4, 2, 1]);
    assert_eq!(value_frequencies(&codec, Direction::Decoder), vec![4, 2, 1]);
}

#[test]
fn reset_returns_a_model_to_its_initial_state() {
    let mut codec = arith_codec(three_symbols().adaptive());
    let mut record = Record::new("test.Arith");
    record.set("v", 2i64);
    let _ = codec.encode(&record).unwrap();
    assert_ne!(value_frequencies(&codec, Direction::Encoder), vec![1, 1, 1]);

    codec.models().reset("m").unwrap();
    assert_eq!(value_frequencies(&codec, Direction::Encoder), vec![1, 1, 1]);
    assert_eq!(value_frequencies(&codec, Direction::Decoder), vec![1, 1, 1]);
}

#[test]
fn size_dry_runs_do_not_advance_adaptive_state() {
    let mut codec = arith_codec(three_symbols().adaptive());
    let mut record = Record::new("test.Arith");
    record.set("v", 1i64);

    let size = codec.size(&record).unwrap();
    assert!(size >= 2);
    assert_eq!(value_frequencies(&codec, Direction::Encoder), vec![1, 1, 1]);

    // And sizing agrees with the bits a real encode then produces.
    let wire = codec.encode(&record).unwrap();
    assert!((wire.len() as u64) * 8 >= size);
}

#[test]
fn failed_encode_rolls_adaptation_back() {
    let mut codec = arith_codec(three_symbols().adaptive());

    // 9 maps out of range; the model has no out-of-range symbol.
    let mut record = Record::new("test.Arith");
    record.set("v", 9i64);
    assert!(codec.encode(&record).is_err());
    assert_eq!(value_frequencies(&codec, Direction::Encoder), vec![1, 1, 1]);
}

#[test]
fn repeated_arithmetic_terminates_with_eof_only_when_short() {
    let mut codec = Codec::new();
    codec.models().create(three_symbols()).unwrap();
    codec
        .load(
            MessageDescriptor::new("test.Seq").with_id(11).with_max_bytes(64).with_field({
                FieldDescriptor::repeated("vs", FieldKind::Int32, 4)
                    .with_codec("arithmetic")
                    .with_model("m")
            }),
        )
        .unwrap();

    for seq in [vec![], vec![1i64], vec![0, 1, 2], vec![2, 2, 2, 2]] {
        let mut record = Record::new("test.Seq");
        record.set_list("vs", seq.iter().map(|v| Value::Int(*v)).collect());
        let wire = codec.encode(&record).unwrap();
        let decoded = codec.decode(&wire).unwrap();
        let got: Vec<i64> = decoded
            .get_list("vs")
            .unwrap()
            .iter()
            .map(|v| match v {
                Value::Int(i) => *i,
                other => unreachable!("unexpected value {other:?}"),
            })
            .collect();
        assert_eq!(got, seq);
    }
}

#[test]
fn single_symbol_model_encodes_in_the_flush_alone() {
    let mut codec = Codec::new();
    codec.models().create(ModelSpec::new("m", vec![0.0, 1.0], vec![1])).unwrap();
    codec
        .load(
            MessageDescriptor::new("test.One").with_id(12).with_max_bytes(8).with_field(
                FieldDescriptor::required("v", FieldKind::Int32)
                    .with_codec("arithmetic")
                    .with_model("m"),
            ),
        )
        .unwrap();

    let mut record = Record::new("test.One");
    record.set("v", 0i64);
    // Id byte, one symbol bit, two flush bits.
    assert_eq!(codec.size(&record).unwrap(), 11);
    let wire = codec.encode(&record).unwrap();
    assert_eq!(codec.decode(&wire).unwrap().int("v"), Some(0));
}

#[test]
fn arithmetic_and_plain_fields_share_a_message() {
    // The arithmetic field must hand unused read-ahead bits back to the
    // field behind it.
    let mut codec = Codec::new();
    codec.models().create(three_symbols()).unwrap();
    codec
        .load(
            MessageDescriptor::new("test.Mixed")
                .with_id(13)
                .with_max_bytes(64)
                .with_field(
                    FieldDescriptor::required("a", FieldKind::Int32)
                        .with_codec("arithmetic")
                        .with_model("m"),
                )
                .with_field(
                    FieldDescriptor::required("b", FieldKind::UInt32).with_range(0.0, 255.0),
                )
                .with_field(FieldDescriptor::required("c", FieldKind::Bool)),
        )
        .unwrap();

    for (a, b, c) in [(0i64, 0u64, false), (1, 170, true), (2, 255, true)] {
        let mut record = Record::new("test.Mixed");
        record.set("a", a);
        record.set("b", b);
        record.set("c", c);
        let wire = codec.encode(&record).unwrap();
        let decoded = codec.decode(&wire).unwrap();
        assert_eq!(decoded.int("a"), Some(a));
        assert_eq!(decoded.uint("b"), Some(b));
        assert_eq!(decoded.boolean("c"), Some(c));
    }
}

#[test]
fn unknown_model_fails_validation_at_load() {
    let mut codec = Codec::new();
    let err = codec
        .load(
            MessageDescriptor::new("test.NoModel").with_id(14).with_max_bytes(8).with_field(
                FieldDescriptor::required("v", FieldKind::Int32)
                    .with_codec("arithmetic")
                    .with_model("missing"),
            ),
        )
        .unwrap_err();
    assert!(matches!(err, tightbeam_core::ValidationError::UnknownModel { .. }));
}

#[test]
fn eof_symbol_never_reaches_a_required_value() {
    // A required single-value field whose wire bits decode to EOF is
    // corrupt input, not a value. EOF owns the lowest cumulative range
    // (symbol -2 sorts first), so an all-zero body lands on it.
    assert!(EOF_SYMBOL < 0);
    let mut codec = arith_codec(three_symbols());
    let err = codec.decode(&[0x0A, 0x00]).unwrap_err();
    assert!(matches!(err, DecodeError::EofHasNoValue { .. }));
}
