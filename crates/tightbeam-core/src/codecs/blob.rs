//! Default string and bytes codecs.
//!
//! Both carry a `ceil(log2(max_length + 1))`-bit length prefix followed by
//! `len × 8` bits of payload. The decoded length drives consumption, so a
//! prefix above `max_length` is rejected before any payload is read.

use tightbeam_schema::{FieldDescriptor, FieldKind, Value};

use crate::bitset::{Bitset, bits_to_represent};
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::field::{DecodeCx, EncodeCx, FieldCodec, ValidateCx};

fn max_length(field: &FieldDescriptor, path: &str) -> Result<u32, ValidationError> {
    field.options.max_length.ok_or_else(|| ValidationError::MissingOption {
        path: path.to_string(),
        option: "max_length",
    })
}

fn prefix_width(max: u32) -> u32 {
    bits_to_represent(u128::from(max) + 1)
}

fn encode_blob(
    payload: &[u8],
    max: u32,
    path: &str,
    bits: &mut Bitset,
) -> Result<(), EncodeError> {
    if payload.len() > max as usize {
        return Err(EncodeError::TooLong { path: path.to_string(), len: payload.len(), max });
    }
    bits.append_bits(payload.len() as u64, prefix_width(max));
    for byte in payload {
        bits.append_bits(u64::from(*byte), 8);
    }
    Ok(())
}

fn decode_blob(max: u32, path: &str, bits: &mut Bitset) -> Result<Vec<u8>, DecodeError> {
    let len = bits.pop_front_bits(prefix_width(max))?;
    if len > u64::from(max) {
        return Err(DecodeError::BadLengthPrefix { path: path.to_string(), len, max });
    }
    let mut payload = Vec::with_capacity(len as usize);
    for _ in 0..len {
        payload.push(bits.pop_front_bits(8)? as u8);
    }
    Ok(payload)
}

fn blob_bounds(field: &FieldDescriptor, path: &str) -> Result<(u64, u64), ValidationError> {
    let max = max_length(field, path)?;
    let prefix = u64::from(prefix_width(max));
    Ok((prefix, prefix + u64::from(max) * 8))
}

/// Default codec for UTF-8 string fields.
#[derive(Debug, Default)]
pub struct StringCodec;

impl FieldCodec for StringCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        if !matches!(field.kind, FieldKind::String) {
            return Err(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "default".to_string(),
                family: field.kind.family(),
            });
        }
        max_length(field, path).map(|_| ())
    }

    fn min_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(blob_bounds(field, path)?.0)
    }

    fn max_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(blob_bounds(field, path)?.1)
    }

    fn encode(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        path: &str,
        _cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let max = max_length(field, path).map_err(EncodeError::Validation)?;
        match value {
            Value::Str(s) => encode_blob(s.as_bytes(), max, path, bits),
            other => Err(EncodeError::WrongType {
                path: path.to_string(),
                expected: "string",
                got: other.kind_name(),
            }),
        }
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let max = max_length(field, path).map_err(DecodeError::Validation)?;
        let payload = decode_blob(max, path, bits)?;
        String::from_utf8(payload)
            .map(Value::Str)
            .map_err(|_| DecodeError::InvalidUtf8 { path: path.to_string() })
    }
}

/// Default codec for raw byte-string fields.
#[derive(Debug, Default)]
pub struct BytesCodec;

impl FieldCodec for BytesCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        if !matches!(field.kind, FieldKind::Bytes) {
            return Err(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "default".to_string(),
                family: field.kind.family(),
            });
        }
        max_length(field, path).map(|_| ())
    }

    fn min_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(blob_bounds(field, path)?.0)
    }

    fn max_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(blob_bounds(field, path)?.1)
    }

    fn encode(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        path: &str,
        _cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let max = max_length(field, path).map_err(EncodeError::Validation)?;
        match value {
            Value::Bytes(b) => encode_blob(b, max, path, bits),
            other => Err(EncodeError::WrongType {
                path: path.to_string(),
                expected: "bytes",
                got: other.kind_name(),
            }),
        }
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let max = max_length(field, path).map_err(DecodeError::Validation)?;
        Ok(Value::Bytes(decode_blob(max, path, bits)?))
    }
}
