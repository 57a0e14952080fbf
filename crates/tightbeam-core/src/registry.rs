//! Field codec registry and codec groups.
//!
//! The registry is the single resolution point every recursive encode,
//! decode and validate step calls. Field codecs are keyed by
//! `(type family, codec name)`; id codecs by name alone. A codec group
//! bundles the defaults one schema version agrees on: which codec each
//! family falls back to, which id codec frames the message, and which
//! arithmetic symbol-mapping rule applies.
//!
//! # Lifecycle
//!
//! Populate at startup (built-ins via [`crate::codecs::register_builtins`],
//! extensions via [`CodecRegistry::add_field_codec`]), then treat as
//! read-only. Registration is additive; re-registering an existing key is
//! rejected rather than silently replaced, since two peers disagreeing on
//! a codec implementation is a wire-compatibility bug.

use std::collections::HashMap;
use std::sync::Arc;

use tightbeam_schema::TypeFamily;

use crate::error::{RegistrationError, ValidationError};
use crate::field::FieldCodec;
use crate::id::IdCodec;

/// Rule for mapping a raw value to an arithmetic model symbol.
///
/// The two historic codec versions disagree here, and the choice is part
/// of the wire contract: peers in one group must use the same rule. It is
/// therefore an explicit group attribute, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolMapping {
    /// The value falls in the bucket `[bound[i], bound[i+1])`.
    StrictBucket,
    /// The value maps to the boundary minimising `|bound² − value²|`.
    NearestNeighbor,
}

/// Named bundle of codec defaults one schema version agrees on.
#[derive(Debug, Clone)]
pub struct CodecGroup {
    name: String,
    id_codec: String,
    symbol_mapping: SymbolMapping,
    defaults: HashMap<TypeFamily, String>,
}

impl CodecGroup {
    /// A group with no per-family defaults yet.
    pub fn new(
        name: impl Into<String>,
        id_codec: impl Into<String>,
        symbol_mapping: SymbolMapping,
    ) -> Self {
        Self {
            name: name.into(),
            id_codec: id_codec.into(),
            symbol_mapping,
            defaults: HashMap::new(),
        }
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the id codec messages in this group are framed with.
    pub fn id_codec(&self) -> &str {
        &self.id_codec
    }

    /// The group's arithmetic symbol-mapping rule.
    pub fn symbol_mapping(&self) -> SymbolMapping {
        self.symbol_mapping
    }

    /// Set the default codec name for a type family.
    #[must_use]
    pub fn with_default(mut self, family: TypeFamily, codec: impl Into<String>) -> Self {
        self.defaults.insert(family, codec.into());
        self
    }

    /// Default codec name for a family, if one is set.
    pub fn default_for(&self, family: TypeFamily) -> Option<&str> {
        self.defaults.get(&family).map(String::as_str)
    }
}

/// Process-wide codec lookup, keyed by `(type family, codec name)`.
#[derive(Default)]
pub struct CodecRegistry {
    field_codecs: HashMap<(TypeFamily, String), Arc<dyn FieldCodec>>,
    id_codecs: HashMap<String, Arc<dyn IdCodec>>,
    groups: HashMap<String, CodecGroup>,
}

impl CodecRegistry {
    /// An empty registry. Most callers want
    /// [`crate::codecs::register_builtins`] on top of this.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field codec under `(family, name)`.
    ///
    /// # Errors
    ///
    /// `RegistrationError::DuplicateFieldCodec` when the key is taken.
    pub fn add_field_codec(
        &mut self,
        family: TypeFamily,
        name: impl Into<String>,
        codec: Arc<dyn FieldCodec>,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        let key = (family, name.clone());
        if self.field_codecs.contains_key(&key) {
            return Err(RegistrationError::DuplicateFieldCodec { family, name });
        }
        self.field_codecs.insert(key, codec);
        Ok(())
    }

    /// Remove a field codec registration, returning it if present.
    ///
    /// Callers must exclude concurrent encoders/decoders; this exists for
    /// the quiesce-then-teardown phase and for replacing extensions.
    pub fn remove_field_codec(
        &mut self,
        family: TypeFamily,
        name: &str,
    ) -> Option<Arc<dyn FieldCodec>> {
        self.field_codecs.remove(&(family, name.to_string()))
    }

    /// Look up a field codec.
    pub fn field_codec(&self, family: TypeFamily, name: &str) -> Option<&Arc<dyn FieldCodec>> {
        self.field_codecs.get(&(family, name.to_string()))
    }

    /// Register an id codec under a name.
    pub fn add_id_codec(
        &mut self,
        name: impl Into<String>,
        codec: Arc<dyn IdCodec>,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if self.id_codecs.contains_key(&name) {
            return Err(RegistrationError::DuplicateIdCodec { name });
        }
        self.id_codecs.insert(name, codec);
        Ok(())
    }

    /// Look up an id codec.
    pub fn id_codec(&self, name: &str) -> Result<&Arc<dyn IdCodec>, ValidationError> {
        self.id_codecs
            .get(name)
            .ok_or_else(|| ValidationError::UnknownIdCodec { name: name.to_string() })
    }

    /// Register a codec group.
    pub fn add_group(&mut self, group: CodecGroup) -> Result<(), RegistrationError> {
        if self.groups.contains_key(group.name()) {
            return Err(RegistrationError::DuplicateGroup { name: group.name().to_string() });
        }
        self.groups.insert(group.name().to_string(), group);
        Ok(())
    }

    /// Look up a codec group.
    pub fn group(&self, name: &str) -> Result<&CodecGroup, ValidationError> {
        self.groups
            .get(name)
            .ok_or_else(|| ValidationError::UnknownGroup { name: name.to_string() })
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("field_codecs", &self.field_codecs.len())
            .field("id_codecs", &self.id_codecs.len())
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tightbeam_schema::{FieldDescriptor, Record, Value};

    use super::*;
    use crate::bitset::Bitset;
    use crate::error::{DecodeError, EncodeError};
    use crate::field::{DecodeCx, EncodeCx, ValidateCx};

    struct NullCodec;

    impl FieldCodec for NullCodec {
        fn validate(
            &self,
            _: &FieldDescriptor,
            _: &str,
            _: &ValidateCx<'_>,
        ) -> Result<(), ValidationError> {
            Ok(())
        }

        fn min_bits(
            &self,
            _: &FieldDescriptor,
            _: &str,
            _: &ValidateCx<'_>,
        ) -> Result<u64, ValidationError> {
            Ok(0)
        }

        fn max_bits(
            &self,
            _: &FieldDescriptor,
            _: &str,
            _: &ValidateCx<'_>,
        ) -> Result<u64, ValidationError> {
            Ok(0)
        }

        fn encode(
            &self,
            _: &FieldDescriptor,
            _: &Value,
            _: &str,
            _: &EncodeCx<'_>,
            _: &mut Bitset,
        ) -> Result<(), EncodeError> {
            Ok(())
        }

        fn decode(
            &self,
            _: &FieldDescriptor,
            _: &str,
            _: &DecodeCx<'_>,
            _: &mut Bitset,
        ) -> Result<Value, DecodeError> {
            Ok(Value::Message(Record::new("null")))
        }
    }

    #[test]
    fn duplicate_field_codec_rejected() {
        let mut reg = CodecRegistry::new();
        reg.add_field_codec(TypeFamily::Bool, "null", Arc::new(NullCodec)).unwrap();

        let err = reg
            .add_field_codec(TypeFamily::Bool, "null", Arc::new(NullCodec))
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateFieldCodec {
                family: TypeFamily::Bool,
                name: "null".to_string()
            }
        );

        // Same name under another family is a different key.
        reg.add_field_codec(TypeFamily::Enum, "null", Arc::new(NullCodec)).unwrap();
    }

    #[test]
    fn removal_frees_the_key() {
        let mut reg = CodecRegistry::new();
        reg.add_field_codec(TypeFamily::Bool, "null", Arc::new(NullCodec)).unwrap();
        assert!(reg.remove_field_codec(TypeFamily::Bool, "null").is_some());
        assert!(reg.field_codec(TypeFamily::Bool, "null").is_none());
        reg.add_field_codec(TypeFamily::Bool, "null", Arc::new(NullCodec)).unwrap();
    }

    #[test]
    fn group_defaults_resolve_per_family() {
        let group = CodecGroup::new("test", "default", SymbolMapping::StrictBucket)
            .with_default(TypeFamily::Bool, "null");
        assert_eq!(group.default_for(TypeFamily::Bool), Some("null"));
        assert_eq!(group.default_for(TypeFamily::Enum), None);
    }

    #[test]
    fn unknown_group_is_a_validation_error() {
        let reg = CodecRegistry::new();
        assert!(matches!(reg.group("nope"), Err(ValidationError::UnknownGroup { .. })));
    }
}
