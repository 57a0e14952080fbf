//! Legacy CCL compatibility codecs.
//!
//! Fixed-width codecs reproducing the historic WHOI CCL codebook so
//! schemas can interoperate with fielded modems that predate hint-driven
//! encoding. Every codec here has a hard-wired width and scalar mapping;
//! `min`/`max`/`precision` options are ignored, cardinality must be
//! required, and the one-byte [`crate::LegacyIdCodec`] frames the
//! messages.
//!
//! The speed codec is context-sensitive: the codebook stored either RPM
//! or metres per second in the same byte, selected by a thrust-mode enum
//! elsewhere in the message. The field's `context_field` option names that
//! sibling, which must be declared (and therefore encoded/decoded) before
//! the speed field.

use tightbeam_schema::{FieldDescriptor, FieldKind, Record, Value};

use crate::bitset::Bitset;
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::field::{DecodeCx, EncodeCx, FieldCodec, ValidateCx};

/// Degrees-to-counts factor of the 24-bit lat/lon compression.
const LATLON_SCALE: f64 = ((1u32 << 23) - 1) as f64 / 180.0;

/// Thrust-mode enum value selecting metres per second in the speed byte.
const SPEED_MODE_MSEC: &str = "METERS_PER_SECOND";

fn require_required(field: &FieldDescriptor, path: &str) -> Result<(), ValidationError> {
    match field.label {
        tightbeam_schema::Label::Required => Ok(()),
        _ => Err(ValidationError::InvalidOption {
            path: path.to_string(),
            reason: "legacy CCL codecs support required fields only".to_string(),
        }),
    }
}

fn numeric_kind(field: &FieldDescriptor, path: &str) -> Result<(), ValidationError> {
    if field.kind.is_integer() || field.kind.is_floating() {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedKind {
            path: path.to_string(),
            codec: "legacy-ccl".to_string(),
            family: field.kind.family(),
        })
    }
}

fn numeric_value(value: &Value, path: &str) -> Result<f64, EncodeError> {
    match value {
        Value::Float(v) => Ok(*v),
        Value::Int(v) => Ok(*v as f64),
        Value::UInt(v) => Ok(*v as f64),
        other => Err(EncodeError::WrongType {
            path: path.to_string(),
            expected: "numeric",
            got: other.kind_name(),
        }),
    }
}

fn rebuild_value(field: &FieldDescriptor, raw: f64) -> Value {
    match field.kind {
        FieldKind::Int32 | FieldKind::Int64 => Value::Int(raw.round() as i64),
        FieldKind::UInt32 | FieldKind::UInt64 => Value::UInt(raw.round().max(0.0) as u64),
        _ => Value::Float(raw),
    }
}

/// Round and clamp to `0..=max`.
fn saturate(value: f64, max: u64) -> u64 {
    let rounded = value.round();
    if !(rounded > 0.0) {
        0
    } else if rounded >= max as f64 {
        max
    } else {
        rounded as u64
    }
}

/// A fixed-width scalar codebook entry: width plus the two directions of
/// its mapping. One [`FieldCodec`] impl serves every plain scalar codec.
pub struct ScalarCompressed {
    width: u32,
    to_wire: fn(f64) -> u64,
    from_wire: fn(u64) -> f64,
}

impl ScalarCompressed {
    /// Latitude/longitude: degrees in 24-bit two's complement counts.
    pub fn latlon() -> Self {
        Self {
            width: 24,
            to_wire: |deg| {
                let clamped = deg.clamp(-180.0, 180.0);
                ((clamped * LATLON_SCALE).round() as i64 as u64) & 0xFF_FFFF
            },
            from_wire: |raw| {
                // Sign-extend from bit 23.
                let signed = ((raw as i64) << 40) >> 40;
                signed as f64 / LATLON_SCALE
            },
        }
    }

    /// GPS fix age: one byte of 4-second steps, saturating.
    pub fn fix_age() -> Self {
        Self {
            width: 8,
            to_wire: |sec| saturate(sec / 4.0, 255),
            from_wire: |raw| raw as f64 * 4.0,
        }
    }

    /// Heading: degrees in one byte, 360/255 resolution.
    pub fn heading() -> Self {
        Self {
            width: 8,
            to_wire: |deg| saturate(deg * 255.0 / 360.0, 255),
            from_wire: |raw| raw as f64 * 360.0 / 255.0,
        }
    }

    /// Depth: decimetres in two bytes, saturating.
    pub fn depth() -> Self {
        Self {
            width: 16,
            to_wire: |m| saturate(m * 10.0, 65535),
            from_wire: |raw| raw as f64 / 10.0,
        }
    }

    /// Estimated velocity: 1/40 m/s counts in one byte.
    pub fn velocity() -> Self {
        Self {
            width: 8,
            to_wire: |mps| saturate(mps * 40.0, 255),
            from_wire: |raw| raw as f64 / 40.0,
        }
    }

    /// Power draw: 4-watt steps in one byte.
    pub fn watts() -> Self {
        Self {
            width: 8,
            to_wire: |w| saturate(w / 4.0, 255),
            from_wire: |raw| raw as f64 * 4.0,
        }
    }

    /// High-resolution altitude: centimetres in two bytes.
    pub fn hires_altitude() -> Self {
        Self {
            width: 16,
            to_wire: |m| saturate(m * 100.0, 65535),
            from_wire: |raw| raw as f64 / 100.0,
        }
    }

    /// Water temperature: millidegrees offset 5 °C below zero.
    pub fn temperature() -> Self {
        Self {
            width: 16,
            to_wire: |c| saturate((c + 5.0) * 1000.0, 65535),
            from_wire: |raw| raw as f64 / 1000.0 - 5.0,
        }
    }

    /// Salinity: milli-PSU offset at 20 PSU.
    pub fn salinity() -> Self {
        Self {
            width: 16,
            to_wire: |psu| saturate((psu - 20.0) * 1000.0, 65535),
            from_wire: |raw| raw as f64 / 1000.0 + 20.0,
        }
    }

    /// Sound speed: millimetres per second offset at 1425 m/s.
    pub fn sound_speed() -> Self {
        Self {
            width: 16,
            to_wire: |mps| saturate((mps - 1425.0) * 1000.0, 65535),
            from_wire: |raw| raw as f64 / 1000.0 + 1425.0,
        }
    }
}

impl FieldCodec for ScalarCompressed {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        require_required(field, path)?;
        numeric_kind(field, path)
    }

    fn min_bits(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(u64::from(self.width))
    }

    fn max_bits(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(u64::from(self.width))
    }

    fn encode(
        &self,
        _field: &FieldDescriptor,
        value: &Value,
        path: &str,
        _cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let raw = numeric_value(value, path)?;
        bits.append_bits((self.to_wire)(raw), self.width);
        Ok(())
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        _path: &str,
        _cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let raw = bits.pop_front_bits(self.width)?;
        Ok(rebuild_value(field, (self.from_wire)(raw)))
    }
}

/// Time of day packed into three bytes: month 4, day 5, hour 5, minute 6,
/// second/4 4. The year never travels; decode re-attaches the current
/// year from the injected clock, and seconds come back quantised to 4.
///
/// Field values are microseconds since the Unix epoch.
#[derive(Debug, Default)]
pub struct TimeDateCodec;

const MICROS_PER_SECOND: u64 = 1_000_000;

impl FieldCodec for TimeDateCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        require_required(field, path)?;
        if !matches!(field.kind, FieldKind::UInt64 | FieldKind::Int64) {
            return Err(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "legacy-ccl".to_string(),
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
        Ok(24)
    }

    fn max_bits(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(24)
    }

    fn encode(
        &self,
        _field: &FieldDescriptor,
        value: &Value,
        path: &str,
        _cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let micros = match value {
            Value::UInt(v) => *v,
            Value::Int(v) if *v >= 0 => *v as u64,
            other => {
                return Err(EncodeError::WrongType {
                    path: path.to_string(),
                    expected: "unsigned timestamp in microseconds",
                    got: other.kind_name(),
                });
            },
        };
        let (_, month, day, hour, minute, second) =
            civil_from_unix((micros / MICROS_PER_SECOND) as i64);
        bits.append_bits(u64::from(month), 4);
        bits.append_bits(u64::from(day), 5);
        bits.append_bits(u64::from(hour), 5);
        bits.append_bits(u64::from(minute), 6);
        bits.append_bits(u64::from(second / 4), 4);
        Ok(())
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        _path: &str,
        cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let month = (bits.pop_front_bits(4)? as u32).clamp(1, 12);
        let day = (bits.pop_front_bits(5)? as u32).clamp(1, 31);
        let hour = bits.pop_front_bits(5)? as u32;
        let minute = bits.pop_front_bits(6)? as u32;
        let second = bits.pop_front_bits(4)? as u32 * 4;

        // The year never travels; assume the receiver's current year.
        let (year, ..) = civil_from_unix(cx.res.clock.now_unix());
        let secs = unix_from_civil(year, month, day, hour, minute, second);
        let micros = secs.max(0) as u64 * MICROS_PER_SECOND;
        Ok(match field.kind {
            FieldKind::Int64 => Value::Int(micros as i64),
            _ => Value::UInt(micros),
        })
    }
}

/// Speed byte whose unit depends on the sibling thrust-mode enum:
/// `METERS_PER_SECOND` stores 1/30 m/s counts, anything else (the
/// codebook default) stores 20-RPM counts.
#[derive(Debug, Default)]
pub struct SpeedCodec;

impl SpeedCodec {
    fn mode_is_msec(
        field: &FieldDescriptor,
        root: &Record,
        path: &str,
    ) -> Result<bool, EncodeError> {
        let context = field.options.context_field.as_deref().ok_or(EncodeError::Validation(
            ValidationError::MissingOption { path: path.to_string(), option: "context_field" },
        ))?;
        let mode = root.enum_value(context).ok_or_else(|| EncodeError::MissingField {
            path: format!("{path} (context field {context:?})"),
        })?;
        Ok(mode == SPEED_MODE_MSEC)
    }
}

impl FieldCodec for SpeedCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        require_required(field, path)?;
        numeric_kind(field, path)?;
        if field.options.context_field.is_none() {
            return Err(ValidationError::MissingOption {
                path: path.to_string(),
                option: "context_field",
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
        Ok(8)
    }

    fn max_bits(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(8)
    }

    fn encode(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        path: &str,
        cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let raw = numeric_value(value, path)?;
        let wire = if Self::mode_is_msec(field, cx.root, path)? {
            saturate(raw * 30.0, 255)
        } else {
            saturate(raw / 20.0, 255)
        };
        bits.append_bits(wire, 8);
        Ok(())
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let raw = bits.pop_front_bits(8)?;
        let msec = Self::mode_is_msec(field, cx.root, path).map_err(|err| match err {
            EncodeError::MissingField { path } => DecodeError::Validation(
                ValidationError::InvalidOption {
                    path,
                    reason: "context field must be declared before the speed field".to_string(),
                },
            ),
            EncodeError::Validation(v) => DecodeError::Validation(v),
            _ => DecodeError::Validation(ValidationError::MissingOption {
                path: path.to_string(),
                option: "context_field",
            }),
        })?;
        let speed = if msec { raw as f64 / 30.0 } else { raw as f64 * 20.0 };
        Ok(rebuild_value(field, speed))
    }
}

/// Ground-fault indicator, pitch and oil level packed into two bytes:
/// gfi% in 5 bits, pitch degrees (±90, two's complement) in 6 bits, oil%
/// in 5 bits. The field is an embedded message with `gfi`, `pitch` and
/// `oil` members; absent members encode as zero.
#[derive(Debug, Default)]
pub struct GfiPitchOilCodec;

impl GfiPitchOilCodec {
    fn nested_name<'f>(field: &'f FieldDescriptor, path: &str) -> Result<&'f str, ValidationError> {
        match &field.kind {
            FieldKind::Message(name) => Ok(name),
            _ => Err(ValidationError::UnsupportedKind {
                path: path.to_string(),
                codec: "legacy-ccl".to_string(),
                family: field.kind.family(),
            }),
        }
    }
}

impl FieldCodec for GfiPitchOilCodec {
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError> {
        require_required(field, path)?;
        let name = Self::nested_name(field, path)?;
        cx.res.schemas.by_name(name)?;
        Ok(())
    }

    fn min_bits(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(16)
    }

    fn max_bits(
        &self,
        _field: &FieldDescriptor,
        _path: &str,
        _cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        Ok(16)
    }

    fn encode(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        path: &str,
        _cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError> {
        let name = Self::nested_name(field, path).map_err(EncodeError::Validation)?;
        let record = match value {
            Value::Message(record) if record.type_name() == name => record,
            other => {
                return Err(EncodeError::WrongType {
                    path: path.to_string(),
                    expected: "embedded message of the declared type",
                    got: other.kind_name(),
                });
            },
        };
        let gfi = record.float("gfi").unwrap_or(0.0);
        let pitch = record.float("pitch").unwrap_or(0.0);
        let oil = record.float("oil").unwrap_or(0.0);

        bits.append_bits(saturate(gfi * 31.0 / 100.0, 31), 5);
        let pitch_counts = (pitch.clamp(-90.0, 90.0) * 63.0 / 180.0).round() as i64;
        bits.append_bits((pitch_counts as u64) & 0x3F, 6);
        bits.append_bits(saturate(oil * 31.0 / 100.0, 31), 5);
        Ok(())
    }

    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        _cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError> {
        let name = Self::nested_name(field, path).map_err(DecodeError::Validation)?;
        let gfi = bits.pop_front_bits(5)?;
        let pitch_raw = bits.pop_front_bits(6)?;
        let oil = bits.pop_front_bits(5)?;

        let pitch = (((pitch_raw as i64) << 58) >> 58) as f64 * 180.0 / 63.0;
        let mut record = Record::new(name);
        record.set("gfi", gfi as f64 * 100.0 / 31.0);
        record.set("pitch", pitch);
        record.set("oil", oil as f64 * 100.0 / 31.0);
        Ok(Value::Message(record))
    }
}

/// Days-based civil calendar conversion (proleptic Gregorian, UTC).
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = year - i64::from(month <= 2);
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = i64::from(if month > 2 { month - 3 } else { month + 9 });
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    (y + i64::from(month <= 2), month, day)
}

fn civil_from_unix(secs: i64) -> (i64, u32, u32, u32, u32, u32) {
    let days = secs.div_euclid(86_400);
    let tod = secs.rem_euclid(86_400) as u32;
    let (year, month, day) = civil_from_days(days);
    (year, month, day, tod / 3600, (tod / 60) % 60, tod % 60)
}

fn unix_from_civil(year: i64, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> i64 {
    days_from_civil(year, month, day) * 86_400
        + i64::from(hour) * 3600
        + i64::from(minute) * 60
        + i64::from(second)
}
