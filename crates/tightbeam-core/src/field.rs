//! The field codec contract.
//!
//! Every field type is handled by an implementation of [`FieldCodec`]:
//! encode and decode move a variable number of bits through the shared
//! [`Bitset`], `min_bits`/`max_bits` bound that number statically, and
//! `validate` rejects descriptors the codec cannot encode round-trip
//! safely. Codec instances are stateless singletons owned by the
//! [`CodecRegistry`]; everything an invocation needs arrives through an
//! explicit context:
//!
//! - [`Resolver`]: registry, schema set, active codec group, model
//!   manager and clock, for codecs that recurse or consult shared state.
//! - [`EncodeCx`]/[`DecodeCx`]: additionally the enclosing record, so
//!   context-sensitive codecs (the legacy speed codec) can read sibling
//!   fields that were encoded or decoded before them.
//!
//! Presence bits for optional fields are owned by the traversal layer,
//! not by individual codecs, so the rule is uniform across a codec group.

use std::sync::Arc;

use tightbeam_schema::{FieldDescriptor, Record, SchemaSet, Value};

use crate::arith::ModelManager;
use crate::bitset::{Bitset, bits_to_represent};
use crate::clock::Clock;
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::registry::{CodecGroup, CodecRegistry};

/// Shared collaborators every codec invocation can reach.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    /// Field and id codec registry.
    pub registry: &'a CodecRegistry,
    /// Registered message descriptors, for embedded-message recursion.
    pub schemas: &'a SchemaSet,
    /// Codec group the current message encodes under.
    pub group: &'a CodecGroup,
    /// Probability models for the arithmetic codec.
    pub models: &'a ModelManager,
    /// Time source for the legacy time-of-day codec.
    pub clock: &'a dyn Clock,
}

impl<'a> Resolver<'a> {
    /// Resolve the codec for a field: its explicit `codec` option if set,
    /// otherwise the group default for the field's type family.
    pub fn field_codec(
        &self,
        field: &FieldDescriptor,
        path: &str,
    ) -> Result<Arc<dyn FieldCodec>, ValidationError> {
        let family = field.kind.family();
        let name = match &field.options.codec {
            Some(explicit) => explicit.clone(),
            None => match self.group.default_for(family) {
                Some(default) => default.to_string(),
                None => format!("{}/default", self.group.name()),
            },
        };
        self.registry.field_codec(family, &name).cloned().ok_or_else(|| {
            ValidationError::UnknownCodec { path: path.to_string(), name, family }
        })
    }

    /// Switch to another codec group for a nested message, keeping the
    /// current group when the nested descriptor selects none.
    pub fn for_group(&self, group: Option<&str>) -> Result<Resolver<'a>, ValidationError> {
        match group {
            None => Ok(*self),
            Some(name) => Ok(Resolver { group: self.registry.group(name)?, ..*self }),
        }
    }
}

/// Context for `validate`/`min_bits`/`max_bits`.
#[derive(Clone, Copy)]
pub struct ValidateCx<'a> {
    /// Shared collaborators.
    pub res: Resolver<'a>,
    /// Current message nesting depth, capped at [`ValidateCx::MAX_DEPTH`].
    pub depth: u32,
}

impl<'a> ValidateCx<'a> {
    /// Deepest supported message nesting. Validation rejects anything
    /// deeper, which also rejects descriptor cycles.
    pub const MAX_DEPTH: u32 = 32;

    /// Context for one nesting level down.
    pub fn nested(&self, path: &str) -> Result<ValidateCx<'a>, ValidationError> {
        if self.depth >= Self::MAX_DEPTH {
            return Err(ValidationError::NestingTooDeep {
                path: path.to_string(),
                limit: Self::MAX_DEPTH,
            });
        }
        Ok(ValidateCx { res: self.res, depth: self.depth + 1 })
    }
}

/// Context for `encode`.
#[derive(Clone, Copy)]
pub struct EncodeCx<'a> {
    /// Shared collaborators.
    pub res: Resolver<'a>,
    /// The record enclosing the current field; already fully populated.
    pub root: &'a Record,
}

/// Context for `decode`.
#[derive(Clone, Copy)]
pub struct DecodeCx<'a> {
    /// The record enclosing the current field, holding the fields decoded
    /// so far in declaration order.
    pub root: &'a Record,
    /// Shared collaborators.
    pub res: Resolver<'a>,
}

/// Contract every field codec satisfies.
///
/// Implementations are pure with respect to message content and safe to
/// share across threads; the only mutable state they may touch is the
/// per-direction probability model state behind [`ModelManager`].
pub trait FieldCodec: Send + Sync {
    /// Reject descriptors this codec cannot encode: missing range,
    /// precision on the wrong kind, unsupported cardinality, and so on.
    fn validate(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<(), ValidationError>;

    /// Fewest bits one value can occupy.
    fn min_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError>;

    /// Most bits one value can occupy. Variable-size codecs must honour
    /// this bound for every legal input; the validator relies on it.
    fn max_bits(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError>;

    /// Append the wire bits for one value.
    fn encode(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        path: &str,
        cx: &EncodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<(), EncodeError>;

    /// Consume exactly the bits the matching `encode` produced and rebuild
    /// the value.
    fn decode(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Value, DecodeError>;

    /// Encode a repeated field: a `ceil(log2(max_repeat + 1))`-bit count
    /// prefix followed by the elements. Cardinality-aware codecs (the
    /// arithmetic codec) override this.
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
        bits.append_bits(values.len() as u64, bits_to_represent(u128::from(max) + 1));
        for value in values {
            self.encode(field, value, path, cx, bits)?;
        }
        Ok(())
    }

    /// Decode a repeated field encoded by [`FieldCodec::encode_repeated`].
    fn decode_repeated(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &DecodeCx<'_>,
        bits: &mut Bitset,
    ) -> Result<Vec<Value>, DecodeError> {
        let max = require_max_repeat(field, path).map_err(DecodeError::Validation)?;
        let count = bits.pop_front_bits(bits_to_represent(u128::from(max) + 1))?;
        if count > u64::from(max) {
            return Err(DecodeError::BadLengthPrefix {
                path: path.to_string(),
                len: count,
                max,
            });
        }
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(self.decode(field, path, cx, bits)?);
        }
        Ok(values)
    }

    /// Fewest bits a repeated field can occupy (an empty list: the count
    /// prefix alone).
    fn min_bits_repeated(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        let _ = cx;
        let max = require_max_repeat(field, path)?;
        Ok(u64::from(bits_to_represent(u128::from(max) + 1)))
    }

    /// Most bits a repeated field can occupy (a full list).
    fn max_bits_repeated(
        &self,
        field: &FieldDescriptor,
        path: &str,
        cx: &ValidateCx<'_>,
    ) -> Result<u64, ValidationError> {
        let max = require_max_repeat(field, path)?;
        let prefix = u64::from(bits_to_represent(u128::from(max) + 1));
        Ok(prefix + u64::from(max) * self.max_bits(field, path, cx)?)
    }
}

/// The `max_repeat` option, mandatory for repeated fields.
pub(crate) fn require_max_repeat(
    field: &FieldDescriptor,
    path: &str,
) -> Result<u32, ValidationError> {
    field.options.max_repeat.ok_or_else(|| ValidationError::MissingOption {
        path: path.to_string(),
        option: "max_repeat",
    })
}
