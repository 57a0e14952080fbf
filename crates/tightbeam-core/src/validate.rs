//! The schema validator.
//!
//! Before any record moves, the validator proves a descriptor yields a
//! bounded, round-trip-safe encoding: every field's codec accepts its
//! options, header fields are fixed-width (the receiver must know where
//! the body starts before decoding it), and the worst-case encoding fits
//! the message's byte budget. The computed [`MessageBounds`] are cached by
//! the façade and drive the head/body byte split on both encode and
//! decode.

use std::sync::Arc;

use tightbeam_schema::MessageDescriptor;

use crate::error::ValidationError;
use crate::field::{Resolver, ValidateCx};
use crate::id::IdCodec;
use crate::walk;

/// Proven size bounds of one message, in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageBounds {
    /// Width of the id prefix; zero when the id codec is disabled.
    pub id_bits: u32,
    /// Fixed width of the header fields.
    pub head_bits: u64,
    /// Fewest bits the body can take.
    pub body_min_bits: u64,
    /// Most bits the body can take.
    pub body_max_bits: u64,
}

impl MessageBounds {
    /// Bytes of the head section (id plus header, zero-padded out).
    pub fn head_bytes(&self) -> usize {
        ((u64::from(self.id_bits) + self.head_bits) as usize).div_ceil(8)
    }

    /// Fewest bits a record can encode to, before byte padding.
    pub fn min_bits(&self) -> u64 {
        u64::from(self.id_bits) + self.head_bits + self.body_min_bits
    }

    /// Most bits a record can encode to, before byte padding.
    pub fn max_bits(&self) -> u64 {
        u64::from(self.id_bits) + self.head_bits + self.body_max_bits
    }

    /// Fewest bytes a record can encode to on the wire.
    pub fn min_bytes(&self) -> u64 {
        self.head_bytes() as u64 + self.body_min_bits.div_ceil(8)
    }

    /// Most bytes a record can encode to on the wire.
    pub fn max_bytes(&self) -> u64 {
        self.head_bytes() as u64 + self.body_max_bits.div_ceil(8)
    }
}

/// Validate one message descriptor and compute its bounds.
///
/// `id_codec` is the active id codec, if any; `max_bytes` is the already
/// resolved byte budget (config override or message option).
pub(crate) fn validate_message(
    desc: &MessageDescriptor,
    res: Resolver<'_>,
    id_codec: Option<&Arc<dyn IdCodec>>,
    max_bytes: Option<u32>,
) -> Result<MessageBounds, ValidationError> {
    // A declared id must be expressible. A message may also declare none
    // and live as an embedded component or an explicit-descriptor type;
    // encoding it standalone under an id codec fails then.
    let id_bits = match (id_codec, desc.id) {
        (Some(codec), Some(id)) => codec.size_bits(id).map_err(|err| match err {
            ValidationError::InvalidId { id, reason, .. } => {
                ValidationError::InvalidId { message: desc.full_name.clone(), id, reason }
            },
            other => other,
        })?,
        _ => 0,
    };

    let cx = ValidateCx { res, depth: 0 };
    let path = desc.full_name.as_str();

    // Header fields validate like any other, plus the fixed-width rule.
    let mut head_bits = 0u64;
    for field in desc.header_fields() {
        let fpath = format!("{path}.{}", field.name);
        let codec = res.field_codec(field, &fpath)?;
        codec.validate(field, &fpath, &cx)?;
        let (min, max) = walk::field_bounds(field, &fpath, &cx)?;
        if min != max {
            return Err(ValidationError::HeaderNotFixed {
                path: fpath,
                min_bits: min,
                max_bits: max,
            });
        }
        head_bits += max;
    }

    let body = walk::validate_section(desc, walk::Section::Body, path, &cx)?;

    let bounds = MessageBounds {
        id_bits,
        head_bits,
        body_min_bits: body.min_bits,
        body_max_bits: body.max_bits,
    };

    if let Some(limit) = max_bytes
        && bounds.max_bytes() > u64::from(limit)
    {
        return Err(ValidationError::Oversize {
            message: desc.full_name.clone(),
            needed_bytes: bounds.max_bytes(),
            max_bytes: u64::from(limit),
        });
    }

    Ok(bounds)
}
