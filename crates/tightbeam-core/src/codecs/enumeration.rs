//! Default enum codec.
//!
//! Enum values travel as their dense index into the declared value list,
//! `ceil(log2(count))` bits. Declaration order is therefore part of the
//! wire contract; reordering values is a breaking schema change.

use tightbeam_schema::{EnumDescriptor, FieldDescriptor, FieldKind, Value};

use crate::bitset::{Bitset, bits_to_represent};
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::field::{DecodeCx, EncodeCx, FieldCodec, ValidateCx};

/// Default codec for enum fields.
#[derive(Debug, Default)]
pub struct EnumCodec;

impl EnumCodec {
    fn descriptor<'f>(
        field: &'f FieldDescriptor,
        path: &str,
    ) -> Result<&'f EnumDescriptor, ValidationError> {
        match &field.kind {
            FieldKind::Enum(desc) if !desc.values.is_empty() => Ok(desc),
            FieldKind::Enum(_) => Err(ValidationError::InvalidOption {
                path: path.to_string(),
                reason: "enum declares no values".to_string(),
            }),
            _ => Err(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "default".to_string(),
                family: field.kind.family(),
            }),
        }
    }

    fn width(desc: &EnumDescriptor) -> u32 {
        bits_to_represent(desc.values.len() as u128)
    }
}

impl FieldCodec for EnumCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        Self::descriptor(field, path).map(|_| ())
    }

    fn min_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(u64::from(Self::width(Self::descriptor(field, path)?)))
    }

    fn max_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        self.min_bits(field, path, cx)
    }

    fn encode(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        path: &str,
        _cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let desc = Self::descriptor(field, path).map_err(EncodeError::Validation)?;
        let name = match value {
            Value::Enum(name) => name,
            other => {
                return Err(EncodeError::WrongType {
                    path: path.to_string(),
                    expected: "enum",
                    got: other.kind_name(),
                });
            },
        };
        let index = desc.index_of(name).ok_or_else(|| EncodeError::UnknownEnumValue {
            path: path.to_string(),
            value: name.clone(),
        })?;
        bits.append_bits(index as u64, Self::width(desc));
        Ok(())
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let desc = Self::descriptor(field, path).map_err(DecodeError::Validation)?;
        let index = bits.pop_front_bits(Self::width(desc))?;
        desc.values
            .get(index as usize)
            .cloned()
            .map(Value::Enum)
            .ok_or(DecodeError::InvalidEnumIndex {
                path: path.to_string(),
                index,
                count: desc.values.len(),
            })
    }
}
