//! Built-in field codecs and their bootstrap registration.
//!
//! Two codec groups ship with the crate:
//!
//! - [`STANDARD_GROUP`]: hint-driven minimum-width codecs (integer offset,
//!   scaled float, dense enum, length-prefixed blobs, recursive embedded
//!   messages) with the variable-length id codec and nearest-neighbour
//!   arithmetic symbol mapping.
//! - [`LEGACY_GROUP`]: the fixed-width WHOI CCL codebook with the one-byte
//!   id codec and strict-bucket arithmetic symbol mapping, for
//!   interoperating with fielded modem software.
//!
//! The arithmetic codec registers under [`ARITHMETIC_CODEC`] in every
//! scalar family and is selected per field via the `codec` option.

mod blob;
mod enumeration;
mod legacy;
mod message;
mod numeric;
mod primitive;

use std::sync::Arc;

use tightbeam_schema::TypeFamily;

pub use blob::{BytesCodec, StringCodec};
pub use enumeration::EnumCodec;
pub use legacy::{GfiPitchOilCodec, ScalarCompressed, SpeedCodec, TimeDateCodec};
pub use message::MessageCodec;
pub use numeric::{FloatCodec, IntegerCodec};
pub use primitive::BoolCodec;

use crate::arith::ArithmeticCodec;
use crate::error::RegistrationError;
use crate::id::{DefaultIdCodec, LegacyIdCodec};
use crate::registry::{CodecGroup, CodecRegistry, SymbolMapping};

/// Name the default codec of every family registers under.
pub const DEFAULT_CODEC: &str = "default";

/// Name of the arithmetic codec in every scalar family.
pub const ARITHMETIC_CODEC: &str = "arithmetic";

/// Name of the variable-length id codec.
pub const DEFAULT_ID_CODEC: &str = "default";

/// Name of the one-byte legacy id codec.
pub const LEGACY_ID_CODEC: &str = "ccl";

/// Name of the hint-driven codec group.
pub const STANDARD_GROUP: &str = "standard";

/// Name of the fixed-width compatibility codec group.
pub const LEGACY_GROUP: &str = "legacy-ccl";

/// Legacy codec name: 3-byte compressed latitude/longitude.
pub const CCL_LATLON: &str = "ccl.latlon";
/// Legacy codec name: 3-byte packed time of day.
pub const CCL_TIME_DATE: &str = "ccl.time_date";
/// Legacy codec name: 1-byte GPS fix age.
pub const CCL_FIX_AGE: &str = "ccl.fix_age";
/// Legacy codec name: 1-byte heading.
pub const CCL_HEADING: &str = "ccl.heading";
/// Legacy codec name: 2-byte depth.
pub const CCL_DEPTH: &str = "ccl.depth";
/// Legacy codec name: 1-byte estimated velocity.
pub const CCL_VELOCITY: &str = "ccl.velocity";
/// Legacy codec name: 1-byte thrust-mode-dependent speed.
pub const CCL_SPEED: &str = "ccl.speed";
/// Legacy codec name: 1-byte power draw.
pub const CCL_WATTS: &str = "ccl.watts";
/// Legacy codec name: 2-byte gfi/pitch/oil bundle.
pub const CCL_GFI_PITCH_OIL: &str = "ccl.gfi_pitch_oil";
/// Legacy codec name: 2-byte high-resolution altitude.
pub const CCL_HIRES_ALTITUDE: &str = "ccl.hires_altitude";
/// Legacy codec name: 2-byte water temperature.
pub const CCL_TEMPERATURE: &str = "ccl.temperature";
/// Legacy codec name: 2-byte salinity.
pub const CCL_SALINITY: &str = "ccl.salinity";
/// Legacy codec name: 2-byte sound speed.
pub const CCL_SOUND_SPEED: &str = "ccl.sound_speed";

const ALL_FAMILIES: [TypeFamily; 11] = [
    TypeFamily::Int32,
    TypeFamily::Int64,
    TypeFamily::UInt32,
    TypeFamily::UInt64,
    TypeFamily::Float,
    TypeFamily::Double,
    TypeFamily::Bool,
    TypeFamily::String,
    TypeFamily::Bytes,
    TypeFamily::Enum,
    TypeFamily::Message,
];

const ARITHMETIC_FAMILIES: [TypeFamily; 8] = [
    TypeFamily::Int32,
    TypeFamily::Int64,
    TypeFamily::UInt32,
    TypeFamily::UInt64,
    TypeFamily::Float,
    TypeFamily::Double,
    TypeFamily::Bool,
    TypeFamily::Enum,
];

const NUMERIC_FAMILIES: [TypeFamily; 6] = [
    TypeFamily::Int32,
    TypeFamily::Int64,
    TypeFamily::UInt32,
    TypeFamily::UInt64,
    TypeFamily::Float,
    TypeFamily::Double,
];

/// Register every built-in codec, id codec and codec group.
///
/// Fails only when called twice on the same registry.
pub fn register_builtins(registry: &mut CodecRegistry) -> Result<(), RegistrationError> {
    // Default codecs, one instance shared across its families.
    let integer = Arc::new(IntegerCodec);
    for family in [TypeFamily::Int32, TypeFamily::Int64, TypeFamily::UInt32, TypeFamily::UInt64] {
        registry.add_field_codec(family, DEFAULT_CODEC, integer.clone())?;
    }
    let float = Arc::new(FloatCodec);
    registry.add_field_codec(TypeFamily::Float, DEFAULT_CODEC, float.clone())?;
    registry.add_field_codec(TypeFamily::Double, DEFAULT_CODEC, float)?;
    registry.add_field_codec(TypeFamily::Bool, DEFAULT_CODEC, Arc::new(BoolCodec))?;
    registry.add_field_codec(TypeFamily::String, DEFAULT_CODEC, Arc::new(StringCodec))?;
    registry.add_field_codec(TypeFamily::Bytes, DEFAULT_CODEC, Arc::new(BytesCodec))?;
    registry.add_field_codec(TypeFamily::Enum, DEFAULT_CODEC, Arc::new(EnumCodec))?;
    registry.add_field_codec(TypeFamily::Message, DEFAULT_CODEC, Arc::new(MessageCodec))?;

    let arithmetic = Arc::new(ArithmeticCodec);
    for family in ARITHMETIC_FAMILIES {
        registry.add_field_codec(family, ARITHMETIC_CODEC, arithmetic.clone())?;
    }

    // The legacy codebook: scalar entries in every numeric family so a
    // schema may type its fields naturally, bespoke codecs where the
    // codebook needs context or structure.
    let scalars: [(&str, fn() -> ScalarCompressed); 10] = [
        (CCL_LATLON, ScalarCompressed::latlon),
        (CCL_FIX_AGE, ScalarCompressed::fix_age),
        (CCL_HEADING, ScalarCompressed::heading),
        (CCL_DEPTH, ScalarCompressed::depth),
        (CCL_VELOCITY, ScalarCompressed::velocity),
        (CCL_WATTS, ScalarCompressed::watts),
        (CCL_HIRES_ALTITUDE, ScalarCompressed::hires_altitude),
        (CCL_TEMPERATURE, ScalarCompressed::temperature),
        (CCL_SALINITY, ScalarCompressed::salinity),
        (CCL_SOUND_SPEED, ScalarCompressed::sound_speed),
    ];
    for (name, make) in scalars {
        let codec: Arc<ScalarCompressed> = Arc::new(make());
        for family in NUMERIC_FAMILIES {
            registry.add_field_codec(family, name, codec.clone())?;
        }
    }
    let time_date = Arc::new(TimeDateCodec);
    registry.add_field_codec(TypeFamily::UInt64, CCL_TIME_DATE, time_date.clone())?;
    registry.add_field_codec(TypeFamily::Int64, CCL_TIME_DATE, time_date)?;
    let speed = Arc::new(SpeedCodec);
    for family in NUMERIC_FAMILIES {
        registry.add_field_codec(family, CCL_SPEED, speed.clone())?;
    }
    registry.add_field_codec(TypeFamily::Message, CCL_GFI_PITCH_OIL, Arc::new(GfiPitchOilCodec))?;

    registry.add_id_codec(DEFAULT_ID_CODEC, Arc::new(DefaultIdCodec))?;
    registry.add_id_codec(LEGACY_ID_CODEC, Arc::new(LegacyIdCodec))?;

    let mut standard =
        CodecGroup::new(STANDARD_GROUP, DEFAULT_ID_CODEC, SymbolMapping::NearestNeighbor);
    let mut legacy = CodecGroup::new(LEGACY_GROUP, LEGACY_ID_CODEC, SymbolMapping::StrictBucket);
    for family in ALL_FAMILIES {
        standard = standard.with_default(family, DEFAULT_CODEC);
        legacy = legacy.with_default(family, DEFAULT_CODEC);
    }
    registry.add_group(standard)?;
    registry.add_group(legacy)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_once() {
        let mut registry = CodecRegistry::new();
        register_builtins(&mut registry).unwrap();

        assert!(registry.field_codec(TypeFamily::UInt32, DEFAULT_CODEC).is_some());
        assert!(registry.field_codec(TypeFamily::Double, ARITHMETIC_CODEC).is_some());
        assert!(registry.field_codec(TypeFamily::Double, CCL_LATLON).is_some());
        assert!(registry.field_codec(TypeFamily::Message, CCL_GFI_PITCH_OIL).is_some());
        assert!(registry.field_codec(TypeFamily::String, ARITHMETIC_CODEC).is_none());
        assert!(registry.id_codec(DEFAULT_ID_CODEC).is_ok());
        assert!(registry.id_codec(LEGACY_ID_CODEC).is_ok());
        assert!(registry.group(STANDARD_GROUP).is_ok());
        assert!(registry.group(LEGACY_GROUP).is_ok());

        // Bootstrap is not idempotent by design: duplicate keys reject.
        assert!(register_builtins(&mut registry).is_err());
    }

    #[test]
    fn group_policies_differ() {
        let mut registry = CodecRegistry::new();
        register_builtins(&mut registry).unwrap();

        let standard = registry.group(STANDARD_GROUP).unwrap();
        let legacy = registry.group(LEGACY_GROUP).unwrap();
        assert_eq!(standard.symbol_mapping(), SymbolMapping::NearestNeighbor);
        assert_eq!(legacy.symbol_mapping(), SymbolMapping::StrictBucket);
        assert_eq!(standard.id_codec(), DEFAULT_ID_CODEC);
        assert_eq!(legacy.id_codec(), LEGACY_ID_CODEC);
    }
}
