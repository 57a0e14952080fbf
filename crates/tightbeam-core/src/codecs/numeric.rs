//! Default integer and floating-point codecs.
//!
//! An integer field with range `[min, max]` spends exactly
//! `ceil(log2(max − min + 1))` bits carrying `value − min`; a degenerate
//! range (`min == max`) spends none. Floats scale by `10^precision` and
//! ride the same offset arithmetic on the scaled range.
//!
//! Bounds are carried as `f64` in the schema. To keep offsets exact both
//! codecs require the scaled range to sit within `±2^53`, where every
//! integer is representable.

use tightbeam_schema::{FieldDescriptor, FieldKind, Value};

use crate::bitset::{Bitset, bits_to_represent};
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::field::{DecodeCx, EncodeCx, FieldCodec, ValidateCx};

/// Largest magnitude a bound may take and still be an exact integer.
const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

fn missing(path: &str, option: &'static str) -> ValidationError {
    ValidationError::MissingOption { path: path.to_string(), option }
}

fn invalid(path: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidOption { path: path.to_string(), reason: reason.into() }
}

fn numeric_range(field: &FieldDescriptor, path: &str) -> Result<(f64, f64), ValidationError> {
    let min = field.options.min.ok_or_else(|| missing(path, "min"))?;
    let max = field.options.max.ok_or_else(|| missing(path, "max"))?;
    if !min.is_finite() || !max.is_finite() {
        return Err(invalid(path, "min/max must be finite"));
    }
    if min > max {
        return Err(invalid(path, format!("min {min} exceeds max {max}")));
    }
    Ok((min, max))
}

/// Default codec for the four integer families.
#[derive(Debug, Default)]
pub struct IntegerCodec;

impl IntegerCodec {
    fn bounds(field: &FieldDescriptor, path: &str) -> Result<(i64, i64), ValidationError> {
        let (min, max) = numeric_range(field, path)?;
        if min.fract() != 0.0 || max.fract() != 0.0 {
            return Err(invalid(path, "integer bounds must be whole numbers"));
        }
        if min.abs() > EXACT_LIMIT || max.abs() > EXACT_LIMIT {
            return Err(invalid(path, "integer bounds exceed the exact float range"));
        }
        let (lo, hi) = (min as i64, max as i64);
        let family_ok = match field.kind {
            FieldKind::Int32 => lo >= i64::from(i32::MIN) && hi <= i64::from(i32::MAX),
            FieldKind::UInt32 => lo >= 0 && hi <= i64::from(u32::MAX),
            FieldKind::Int64 => true,
            FieldKind::UInt64 => lo >= 0,
            _ => {
                return Err(ValidationError::UnsupportedKind {
                    path: path.to_string(),
                    codec: "default".to_string(),
                    family: field.kind.family(),
                });
            },
        };
        if !family_ok {
            return Err(invalid(path, format!("bounds [{lo}, {hi}] do not fit the field type")));
        }
        if field.options.precision.is_some() {
            return Err(invalid(path, "precision applies to float/double fields"));
        }
        Ok((lo, hi))
    }

    fn width(lo: i64, hi: i64) -> u32 {
        bits_to_represent((i128::from(hi) - i128::from(lo) + 1) as u128)
    }

    fn signed(field: &FieldDescriptor) -> bool {
        matches!(field.kind, FieldKind::Int32 | FieldKind::Int64)
    }
}

impl FieldCodec for IntegerCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        Self::bounds(field, path).map(|_| ())
    }

    fn min_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        let (lo, hi) = Self::bounds(field, path)?;
        Ok(u64::from(Self::width(lo, hi)))
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
        let (lo, hi) = Self::bounds(field, path).map_err(EncodeError::Validation)?;
        let v: i128 = match value {
            Value::Int(v) => i128::from(*v),
            Value::UInt(v) => i128::from(*v),
            other => {
                return Err(EncodeError::WrongType {
                    path: path.to_string(),
                    expected: "integer",
                    got: other.kind_name(),
                });
            },
        };
        if v < i128::from(lo) || v > i128::from(hi) {
            return Err(EncodeError::OutOfRange { path: path.to_string(), value: v.to_string() });
        }
        bits.append_bits((v - i128::from(lo)) as u64, Self::width(lo, hi));
        Ok(())
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let (lo, hi) = Self::bounds(field, path).map_err(DecodeError::Validation)?;
        let offset = bits.pop_front_bits(Self::width(lo, hi))?;
        let v = i128::from(lo) + i128::from(offset);
        Ok(if Self::signed(field) {
            Value::Int(v as i64)
        } else {
            Value::UInt(v as u64)
        })
    }
}

/// Default codec for float and double fields: fixed-point over the scaled
/// range.
#[derive(Debug, Default)]
pub struct FloatCodec;

struct ScaledRange {
    q_min: i64,
    q_max: i64,
    scale: f64,
}

impl ScaledRange {
    fn width(&self) -> u32 {
        bits_to_represent((i128::from(self.q_max) - i128::from(self.q_min) + 1) as u128)
    }
}

impl FloatCodec {
    fn scaled(field: &FieldDescriptor, path: &str) -> Result<ScaledRange, ValidationError> {
        if !field.kind.is_floating() {
            return Err(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "default".to_string(),
                family: field.kind.family(),
            });
        }
        let (min, max) = numeric_range(field, path)?;
        let precision = field.options.precision.unwrap_or(0);
        if !(-15..=15).contains(&precision) {
            return Err(invalid(path, "precision must lie in -15..=15"));
        }
        let scale = 10f64.powi(precision);
        let q_min = (min * scale).round();
        let q_max = (max * scale).round();
        if q_min.abs() > EXACT_LIMIT || q_max.abs() > EXACT_LIMIT {
            return Err(invalid(path, "scaled bounds exceed the exact float range"));
        }
        Ok(ScaledRange { q_min: q_min as i64, q_max: q_max as i64, scale })
    }
}

impl FieldCodec for FloatCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        Self::scaled(field, path).map(|_| ())
    }

    fn min_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(u64::from(Self::scaled(field, path)?.width()))
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
        let range = Self::scaled(field, path).map_err(EncodeError::Validation)?;
        let raw: f64 = match value {
            Value::Float(v) => *v,
            Value::Int(v) => *v as f64,
            Value::UInt(v) => *v as f64,
            other => {
                return Err(EncodeError::WrongType {
                    path: path.to_string(),
                    expected: "float",
                    got: other.kind_name(),
                });
            },
        };
        if !raw.is_finite() {
            return Err(EncodeError::OutOfRange { path: path.to_string(), value: raw.to_string() });
        }
        // Round to the declared precision, halves away from zero.
        let q = (raw * range.scale).round();
        if q < range.q_min as f64 || q > range.q_max as f64 {
            return Err(EncodeError::OutOfRange { path: path.to_string(), value: raw.to_string() });
        }
        bits.append_bits((q as i64 - range.q_min) as u64, range.width());
        Ok(())
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let range = Self::scaled(field, path).map_err(DecodeError::Validation)?;
        let offset = bits.pop_front_bits(range.width())?;
        let q = range.q_min + offset as i64;
        Ok(Value::Float(q as f64 / range.scale))
    }
}
