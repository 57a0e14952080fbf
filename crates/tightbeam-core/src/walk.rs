//! Recursive field traversal.
//!
//! Encode, decode and validate all walk a descriptor's fields the same
//! way: declaration order, filtered to the header or body partition at the
//! top level, everything at once inside embedded messages. This module is
//! that walk; the per-value work is delegated to the resolved field codec.
//!
//! Cardinality is handled here so the rule is uniform across the group:
//! optional fields cost exactly one presence bit (`0` absent, `1` present,
//! then the value), repeated fields go through the codec's
//! `encode_repeated`/`decode_repeated` hooks, and required fields with no
//! value abort the encode.

use tightbeam_schema::{FieldDescriptor, FieldValue, Label, MessageDescriptor, Record};

use crate::bitset::Bitset;
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::field::{DecodeCx, EncodeCx, Resolver, ValidateCx};

/// Which partition of a message a walk covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    /// Top-level fields flagged `in_header`.
    Header,
    /// Top-level fields not flagged `in_header`.
    Body,
    /// Every field; used inside embedded messages, where the partition
    /// of the enclosing field already decided header or body.
    All,
}

impl Section {
    fn covers(self, field: &FieldDescriptor) -> bool {
        match self {
            Section::Header => field.options.in_header,
            Section::Body => !field.options.in_header,
            Section::All => true,
        }
    }
}

/// Accumulated size bounds of one walked section, in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct SectionBounds {
    pub min_bits: u64,
    pub max_bits: u64,
}

/// Size bounds of one field including its cardinality overhead.
pub(crate) fn field_bounds(
    field: &FieldDescriptor,
    path: &str,
    cx: &ValidateCx<'_>,
) -> Result<(u64, u64), ValidationError> {
    let codec = cx.res.field_codec(field, path)?;
    Ok(match field.label {
        Label::Required => (codec.min_bits(field, path, cx)?, codec.max_bits(field, path, cx)?),
        Label::Optional => (1, 1 + codec.max_bits(field, path, cx)?),
        Label::Repeated => (
            codec.min_bits_repeated(field, path, cx)?,
            codec.max_bits_repeated(field, path, cx)?,
        ),
    })
}

/// Validate every field of a section and accumulate its size bounds.
pub(crate) fn validate_section(
    desc: &MessageDescriptor,
    section: Section,
    path: &str,
    cx: &ValidateCx<'_>,
) -> Result<SectionBounds, ValidationError> {
    let mut bounds = SectionBounds::default();
    for field in desc.fields.iter().filter(|f| section.covers(f)) {
        let fpath = join(path, &field.name);
        let codec = cx.res.field_codec(field, &fpath)?;
        codec.validate(field, &fpath, cx)?;
        let (min, max) = field_bounds(field, &fpath, cx)?;
        bounds.min_bits += min;
        bounds.max_bits += max;
    }
    Ok(bounds)
}

/// Encode every field of a section in declaration order.
pub(crate) fn encode_section(
    desc: &MessageDescriptor,
    record: &Record,
    section: Section,
    res: Resolver<'_>,
    path: &str,
    bits: &mut Bitset,
) -> Result<(), EncodeError> {
    let cx = EncodeCx { res, root: record };
    for field in desc.fields.iter().filter(|f| section.covers(f)) {
        let fpath = join(path, &field.name);
        let codec = res.field_codec(field, &fpath).map_err(EncodeError::Validation)?;

        match field.label {
            Label::Required => match record.field(&field.name) {
                Some(FieldValue::Single(value)) => {
                    codec.encode(field, value, &fpath, &cx, bits)?;
                },
                Some(FieldValue::List(_)) => {
                    return Err(EncodeError::WrongType {
                        path: fpath,
                        expected: "single value",
                        got: "list",
                    });
                },
                None => return Err(EncodeError::MissingField { path: fpath }),
            },
            Label::Optional => match record.field(&field.name) {
                Some(FieldValue::Single(value)) => {
                    bits.append_bits(1, 1);
                    codec.encode(field, value, &fpath, &cx, bits)?;
                },
                Some(FieldValue::List(_)) => {
                    return Err(EncodeError::WrongType {
                        path: fpath,
                        expected: "single value",
                        got: "list",
                    });
                },
                None => bits.append_bits(0, 1),
            },
            Label::Repeated => match record.field(&field.name) {
                Some(FieldValue::List(values)) => {
                    codec.encode_repeated(field, values, &fpath, &cx, bits)?;
                },
                Some(FieldValue::Single(_)) => {
                    return Err(EncodeError::WrongType {
                        path: fpath,
                        expected: "list",
                        got: "single value",
                    });
                },
                None => codec.encode_repeated(field, &[], &fpath, &cx, bits)?,
            },
        }
        tracing::trace!(field = %fpath, total_bits = bits.len(), "encoded field");
    }
    Ok(())
}

/// Decode every field of a section in declaration order, populating
/// `record` as it goes so context-sensitive codecs can read already
/// decoded siblings.
pub(crate) fn decode_section(
    desc: &MessageDescriptor,
    section: Section,
    res: Resolver<'_>,
    path: &str,
    bits: &mut Bitset,
    record: &mut Record,
) -> Result<(), DecodeError> {
    for field in desc.fields.iter().filter(|f| section.covers(f)) {
        let fpath = join(path, &field.name);
        let codec = res.field_codec(field, &fpath).map_err(DecodeError::Validation)?;

        match field.label {
            Label::Required => {
                let value = {
                    let cx = DecodeCx { res, root: record };
                    codec.decode(field, &fpath, &cx, bits)?
                };
                record.set(field.name.clone(), value);
            },
            Label::Optional => {
                if bits.pop_front_bits(1)? == 1 {
                    let value = {
                        let cx = DecodeCx { res, root: record };
                        codec.decode(field, &fpath, &cx, bits)?
                    };
                    record.set(field.name.clone(), value);
                }
            },
            Label::Repeated => {
                let values = {
                    let cx = DecodeCx { res, root: record };
                    codec.decode_repeated(field, &fpath, &cx, bits)?
                };
                record.set_list(field.name.clone(), values);
            },
        }
        tracing::trace!(field = %fpath, remaining_bits = bits.len(), "decoded field");
    }
    Ok(())
}

fn join(path: &str, field: &str) -> String {
    format!("{path}.{field}")
}
