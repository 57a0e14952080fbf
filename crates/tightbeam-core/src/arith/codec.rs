//! The arithmetic field codec.
//!
//! Bridges the field codec contract to the range coder: values map to
//! model symbols under the group's [`SymbolMapping`] rule, symbols drive
//! the coder, and the model adapts after every emit/consume. A repeated
//! field encodes its elements as one symbol stream, terminated by the EOF
//! symbol only when it holds fewer than `max_repeat` elements; a
//! non-repeated field is a stream of exactly one symbol.
//!
//! Model state is not rolled back here on failure; the codec façade
//! snapshots the touched direction around every operation and restores it
//! when the operation fails (or unconditionally for size dry runs).

use tightbeam_schema::{FieldDescriptor, FieldKind, TypeFamily, Value};

use crate::arith::coder::{RangeDecoder, RangeEncoder};
use crate::arith::model::{Direction, EOF_SYMBOL, Model};
use crate::bitset::Bitset;
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::field::{DecodeCx, EncodeCx, FieldCodec, ValidateCx, require_max_repeat};

/// Range-coded variable-length codec for numeric, bool and enum fields.
#[derive(Debug, Default)]
pub(crate) struct ArithmeticCodec;

const SUPPORTED: [TypeFamily; 8] = [
    TypeFamily::Int32,
    TypeFamily::Int64,
    TypeFamily::UInt32,
    TypeFamily::UInt64,
    TypeFamily::Float,
    TypeFamily::Double,
    TypeFamily::Bool,
    TypeFamily::Enum,
];

fn model_name<'f>(field: &'f FieldDescriptor, path: &str) -> Result<&'f str, ValidationError> {
    field.options.model.as_deref().ok_or_else(|| ValidationError::MissingOption {
        path: path.to_string(),
        option: "model",
    })
}

fn unknown_model(path: &str, model: &str) -> ValidationError {
    ValidationError::UnknownModel { path: path.to_string(), model: model.to_string() }
}

fn value_to_f64(field: &FieldDescriptor, value: &Value, path: &str) -> Result<f64, EncodeError> {
    match (value, &field.kind) {
        (Value::Int(v), _) => Ok(*v as f64),
        (Value::UInt(v), _) => Ok(*v as f64),
        (Value::Float(v), _) => Ok(*v),
        (Value::Bool(b), _) => Ok(f64::from(u8::from(*b))),
        (Value::Enum(name), FieldKind::Enum(desc)) => {
            desc.index_of(name).map(|i| i as f64).ok_or_else(|| EncodeError::UnknownEnumValue {
                path: path.to_string(),
                value: name.clone(),
            })
        },
        (other, _) => Err(EncodeError::WrongType {
            path: path.to_string(),
            expected: "numeric, bool or enum",
            got: other.kind_name(),
        }),
    }
}

fn f64_to_value(field: &FieldDescriptor, raw: f64, path: &str) -> Result<Value, DecodeError> {
    if raw.is_nan() {
        // Out-of-range symbol: NaN regardless of the declared kind.
        return Ok(Value::Float(f64::NAN));
    }
    match &field.kind {
        FieldKind::Int32 | FieldKind::Int64 => Ok(Value::Int(raw.round() as i64)),
        FieldKind::UInt32 | FieldKind::UInt64 => Ok(Value::UInt(raw.round().max(0.0) as u64)),
        FieldKind::Float | FieldKind::Double => Ok(Value::Float(raw)),
        FieldKind::Bool => Ok(Value::Bool(raw != 0.0)),
        FieldKind::Enum(desc) => {
            let index = raw.round().max(0.0) as u64;
            desc.values
                .get(index as usize)
                .cloned()
                .map(Value::Enum)
                .ok_or_else(|| DecodeError::InvalidEnumIndex {
                    path: path.to_string(),
                    index,
                    count: desc.values.len(),
                })
        },
        FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) => {
            Err(DecodeError::Validation(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "arithmetic".to_string(),
                family: field.kind.family(),
            }))
        },
    }
}

impl ArithmeticCodec {
    fn encode_sequence(
        &self,
        field: &FieldDescriptor,
        values: &[Value],
        max_ops: usize,
        path: &str,
        cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let name = model_name(field, path).map_err(EncodeError::Validation)?;
        let mapping = cx.res.group.symbol_mapping();

        let encoded = cx
            .res
            .models
            .with_model(name, |model: &mut Model| -> Result<Bitset, EncodeError> {
                let mut encoder = RangeEncoder::new();
                for value in values {
                    let raw = value_to_f64(field, value, path)?;
                    let symbol = model.value_to_symbol(raw, mapping);
                    let total = model.total(Direction::Encoder);
                    let (c_lo, c_hi) =
                        model.range_of(symbol, Direction::Encoder).ok_or_else(|| {
                            // Out of range with no out-of-range symbol.
                            EncodeError::OutOfRange { path: path.to_string(), value: raw.to_string() }
                        })?;
                    encoder.encode(c_lo, c_hi, total);
                    model.update(symbol, Direction::Encoder);
                }

                if values.len() < max_ops {
                    let total = model.total(Direction::Encoder);
                    let (c_lo, c_hi) =
                        model.range_of(EOF_SYMBOL, Direction::Encoder).ok_or_else(|| {
                            EncodeError::Validation(ValidationError::InvalidOption {
                                path: path.to_string(),
                                reason: "model has no EOF symbol".to_string(),
                            })
                        })?;
                    encoder.encode(c_lo, c_hi, total);
                    model.update(EOF_SYMBOL, Direction::Encoder);
                }
                Ok(encoder.finish())
            })
            .ok_or_else(|| EncodeError::Validation(unknown_model(path, name)))??;

        bits.append(&encoded);
        Ok(())
    }

    fn decode_sequence(
        &self,
        field: &FieldDescriptor,
        max_ops: usize,
        path: &str,
        cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Vec<Value>, DecodeError> {
        let name = model_name(field, path).map_err(DecodeError::Validation)?;

        cx.res
            .models
            .with_model(name, |model: &mut Model| -> Result<Vec<Value>, DecodeError> {
                let mut decoder = RangeDecoder::new(bits);
                let mut out = Vec::new();
                while out.len() < max_ops {
                    let total = model.total(Direction::Decoder);
                    let cum = decoder.target(total);
                    let symbol = model.symbol_at(cum, Direction::Decoder).ok_or(
                        DecodeError::CumulativeLookupMiss { path: path.to_string(), value: cum },
                    )?;
                    let (c_lo, c_hi) = model.range_of(symbol, Direction::Decoder).ok_or(
                        DecodeError::CumulativeLookupMiss { path: path.to_string(), value: cum },
                    )?;
                    decoder.consume(c_lo, c_hi, total);
                    model.update(symbol, Direction::Decoder);

                    if symbol == EOF_SYMBOL {
                        break;
                    }
                    let raw = model
                        .symbol_to_value(symbol)
                        .ok_or_else(|| DecodeError::EofHasNoValue { path: path.to_string() })?;
                    out.push(f64_to_value(field, raw, path)?);
                }
                decoder.finish()?;
                Ok(out)
            })
            .ok_or_else(|| DecodeError::Validation(unknown_model(path, name)))?
    }

    fn bits_bound(
        &self,
        field: &FieldDescriptor,
        ops: u64,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        let name = model_name(field, path)?;
        cx.res
            .models
            .with_model(name, |model: &mut Model| model.max_bits_bound(ops))
            .ok_or_else(|| unknown_model(path, name))
    }
}

impl FieldCodec for ArithmeticCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        let family = field.kind.family();
        if !SUPPORTED.contains(&family) {
            return Err(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "arithmetic".to_string(),
                family,
            });
        }
        let name = model_name(field, path)?;
        if !cx.res.models.contains(name) {
            return Err(unknown_model(path, name));
        }
        Ok(())
    }

    fn min_bits(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        // The flush alone: one disambiguating bit plus one pending.
        Ok(2)
    }

    fn max_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        self.bits_bound(field, 1, path, cx)
    }

    fn encode(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        path: &str,
        cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        self.encode_sequence(field, std::slice::from_ref(value), 1, path, cx, bits)
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        self.decode_sequence(field, 1, path, cx, bits)?
            .into_iter()
            .next()
            .ok_or_else(|| DecodeError::EofHasNoValue { path: path.to_string() })
    }

    fn encode_repeated(
        &self,
        field: &FieldDescriptor,
        values: &[Value],
        path: &str,
        cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let max = require_max_repeat(field, path).map_err(EncodeError::Validation)?;
        if values.len() > max as usize {
            return Err(EncodeError::TooManyElements {
                path: path.to_string(),
                count: values.len(),
                max,
            });
        }
        self.encode_sequence(field, values, max as usize, path, cx, bits)
    }

    fn decode_repeated(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Vec<Value>, DecodeError> {
        let max = require_max_repeat(field, path).map_err(DecodeError::Validation)?;
        self.decode_sequence(field, max as usize, path, cx, bits)
    }

    fn min_bits_repeated(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        require_max_repeat(field, path)?;
        Ok(2)
    }

    fn max_bits_repeated(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        let max = require_max_repeat(field, path)?;
        self.bits_bound(field, u64::from(max) + 1, path, cx)
    }
}
