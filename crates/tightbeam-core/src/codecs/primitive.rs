//! Default bool codec: one bit.

use tightbeam_schema::{FieldDescriptor, FieldKind, Value};

use crate::bitset::Bitset;
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::field::{DecodeCx, EncodeCx, FieldCodec, ValidateCx};

/// Default codec for bool fields.
#[derive(Debug, Default)]
pub struct BoolCodec;

impl FieldCodec for BoolCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        if !matches!(field.kind, FieldKind::Bool) {
            return Err(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "default".to_string(),
                family: field.kind.family(),
            });
        }
        Ok(())
    }

    fn min_bits(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(1)
    }

    fn max_bits(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(1)
    }

    fn encode(
        &self,
        _field: &FieldDescriptor,
        value: &Value,
        path: &str,
        _cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        match value {
            Value::Bool(b) => {
                bits.append_bits(u64::from(*b), 1);
                Ok(())
            },
            other => Err(EncodeError::WrongType {
                path: path.to_string(),
                expected: "bool",
                got: other.kind_name(),
            }),
        }
    }

    fn decode(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        Ok(Value::Bool(bits.pop_front_bits(1)? == 1))
    }
}
