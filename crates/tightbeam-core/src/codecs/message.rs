//! Embedded message codec.
//!
//! A message-typed field encodes the nested descriptor's fields in place,
//! with no length delimiter: every nested codec's width is derived from
//! the schema, so the encoding is self-delimiting by construction. The
//! nested message may select its own codec group; otherwise it inherits
//! the enclosing group.

use tightbeam_schema::{FieldDescriptor, FieldKind, Record, Value};

use crate::bitset::Bitset;
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::field::{DecodeCx, EncodeCx, FieldCodec, ValidateCx};
use crate::walk;

/// Default codec for embedded message fields.
#[derive(Debug, Default)]
pub struct MessageCodec;

impl MessageCodec {
    fn nested_name<'f>(field: &'f FieldDescriptor, path: &str) -> Result<&'f str, ValidationError> {
        match &field.kind {
            FieldKind::Message(name) => Ok(name),
            _ => Err(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "default".to_string(),
                family: field.kind.family(),
            }),
        }
    }

    fn bounds(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<walk::SectionBounds, ValidationError> {
        let name = Self::nested_name(field, path)?;
        let desc = cx.res.schemas.by_name(name)?.clone();
        let res = cx.res.for_group(desc.options.codec_group.as_deref())?;
        let nested = ValidateCx { res, depth: cx.nested(path)?.depth };
        walk::validate_section(&desc, walk::Section::All, path, &nested)
    }
}

impl FieldCodec for MessageCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        self.bounds(field, path, cx).map(|_| ())
    }

    fn min_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(self.bounds(field, path, cx)?.min_bits)
    }

    fn max_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(self.bounds(field, path, cx)?.max_bits)
    }

    fn encode(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        path: &str,
        cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let name = Self::nested_name(field, path).map_err(EncodeError::Validation)?;
        let record = match value {
            Value::Message(record) if record.type_name() == name => record,
            Value::Message(_) => {
                return Err(EncodeError::WrongType {
                    path: path.to_string(),
                    expected: "embedded message of the declared type",
                    got: "message of another type",
                });
            },
            other => {
                return Err(EncodeError::WrongType {
                    path: path.to_string(),
                    expected: "message",
                    got: other.kind_name(),
                });
            },
        };
        let desc = cx.res.schemas.by_name(name).map_err(ValidationError::from)?.clone();
        let res = cx
            .res
            .for_group(desc.options.codec_group.as_deref())
            .map_err(EncodeError::Validation)?;
        walk::encode_section(&desc, record, walk::Section::All, res, path, bits)
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let name = Self::nested_name(field, path).map_err(DecodeError::Validation)?;
        let desc = cx
            .res
            .schemas
            .by_name(name)
            .map_err(ValidationError::from)
            .map_err(DecodeError::Validation)?
            .clone();
        let res = cx
            .res
            .for_group(desc.options.codec_group.as_deref())
            .map_err(DecodeError::Validation)?;
        let mut record = Record::new(name);
        walk::decode_section(&desc, walk::Section::All, res, path, bits, &mut record)?;
        Ok(Value::Message(record))
    }
}
