//! The codec façade.
//!
//! [`Codec`] owns the registry, schema set, model manager, configuration
//! and crypto key, and exposes the public encode/decode/validate/size
//! surface. One instance services one operation at a time (it carries
//! transient per-operation state such as adaptive model snapshots);
//! independent instances run in parallel freely.
//!
//! # Wire layout
//!
//! ```text
//! [ id bits | header bits | pad ][ body bits | pad ]
//!  \------- head bytes --------/ \---- body bytes -----/
//!            cleartext             encrypted when a key
//!                                  is configured
//! ```
//!
//! Head and body pack to byte boundaries separately so the body can be
//! encrypted as whole bytes with a nonce derived from the head bytes the
//! receiver has already read.
//!
//! # Failure semantics
//!
//! Errors pass through unmasked. A failed encode returns nothing and
//! restores encoder-side adaptive model state; a failed decode discards
//! the partially populated record (fields decode in declaration order up
//! to the failure) and restores decoder-side model state, so a
//! retransmission decodes against the same state.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tightbeam_crypto::EnvelopeKey;
use tightbeam_schema::{MessageDescriptor, Record, SchemaSet};

use crate::arith::{Direction, ModelManager};
use crate::bitset::Bitset;
use crate::clock::{Clock, SystemClock};
use crate::codecs;
use crate::config::{CodecConfig, IdCodecSelection};
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::field::{Resolver, ValidateCx};
use crate::id::IdCodec;
use crate::registry::{CodecGroup, CodecRegistry};
use crate::validate::{MessageBounds, validate_message};
use crate::walk;

/// Public encode/decode/validate/size surface.
pub struct Codec {
    registry: CodecRegistry,
    schemas: SchemaSet,
    models: ModelManager,
    config: CodecConfig,
    key: Option<EnvelopeKey>,
    clock: Box<dyn Clock>,
    bounds: HashMap<String, MessageBounds>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    /// A codec with the built-in registry and default configuration.
    pub fn new() -> Self {
        let mut registry = CodecRegistry::new();
        if codecs::register_builtins(&mut registry).is_err() {
            unreachable!("builtin registration on an empty registry cannot collide");
        }
        Self {
            registry,
            schemas: SchemaSet::new(),
            models: ModelManager::new(),
            config: CodecConfig::default(),
            key: None,
            clock: Box::new(SystemClock),
            bounds: HashMap::new(),
        }
    }

    /// A codec with a specific configuration.
    pub fn with_config(config: CodecConfig) -> Self {
        let mut codec = Self::new();
        codec.set_config(config);
        codec
    }

    /// Replace the configuration. Re-derives the crypto key and drops the
    /// validation cache, since group and size limits may have changed.
    pub fn set_config(&mut self, config: CodecConfig) {
        self.key = config.passphrase.as_deref().map(EnvelopeKey::derive);
        self.config = config;
        self.bounds.clear();
    }

    /// Current configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Replace the time source (tests pin it; production keeps
    /// [`SystemClock`]).
    pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
        self.clock = clock;
    }

    /// The codec registry.
    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Mutable registry access for registering extensions. Drops the
    /// validation cache, since resolution may change.
    pub fn registry_mut(&mut self) -> &mut CodecRegistry {
        self.bounds.clear();
        &mut self.registry
    }

    /// The probability model manager.
    pub fn models(&self) -> &ModelManager {
        &self.models
    }

    /// Registered message descriptors.
    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    /// Register a message descriptor and validate it.
    ///
    /// Nested message types must be loaded before the messages that embed
    /// them. A descriptor that fails validation is not registered.
    pub fn load(
        &mut self,
        descriptor: MessageDescriptor,
    ) -> Result<Arc<MessageDescriptor>, ValidationError> {
        let name = descriptor.full_name.clone();
        let arc = self.schemas.insert(descriptor)?;
        match self.validate(&name) {
            Ok(bounds) => {
                tracing::debug!(
                    message = %name,
                    max_bytes = bounds.max_bytes(),
                    "loaded message"
                );
                Ok(arc)
            },
            Err(err) => {
                self.schemas.remove(&name);
                self.bounds.remove(&name);
                Err(err)
            },
        }
    }

    /// Validate a registered message, caching the result. Idempotent:
    /// repeated calls return the same bounds without recomputation.
    pub fn validate(&mut self, name: &str) -> Result<MessageBounds, ValidationError> {
        if let Some(bounds) = self.bounds.get(name) {
            return Ok(*bounds);
        }
        let bounds = self.compute_bounds(name)?;
        self.bounds.insert(name.to_string(), bounds);
        Ok(bounds)
    }

    /// Encode a record to wire bytes.
    pub fn encode(&mut self, record: &Record) -> Result<Bytes, EncodeError> {
        let bounds = self.validate(record.type_name()).map_err(EncodeError::Validation)?;
        let snapshot = self.models.snapshot(Direction::Encoder);
        let (desc, head, body) = match self.encode_bits(record) {
            Ok(sections) => sections,
            Err(err) => {
                self.models.restore(Direction::Encoder, snapshot);
                return Err(err);
            },
        };
        debug_assert_eq!(head.len() as u64, u64::from(bounds.id_bits) + bounds.head_bits);
        debug_assert!(body.len() as u64 <= bounds.body_max_bits);

        let head_bytes = head.to_bytes();
        let mut body_bytes = body.to_bytes();
        if self.crypto_applies(&desc)
            && let Some(key) = &self.key
        {
            key.apply(&head_bytes, &mut body_bytes);
        }

        tracing::debug!(
            message = %desc.full_name,
            bits = head.len() + body.len(),
            bytes = head_bytes.len() + body_bytes.len(),
            "encoded message"
        );
        let mut wire = head_bytes;
        wire.extend_from_slice(&body_bytes);
        Ok(Bytes::from(wire))
    }

    /// Encoded size of a record in bits, without producing bytes.
    ///
    /// Runs the encoder machinery as a dry run; adaptive model state is
    /// restored afterwards, so sizing never desynchronises a session.
    pub fn size(&mut self, record: &Record) -> Result<u64, EncodeError> {
        self.validate(record.type_name()).map_err(EncodeError::Validation)?;
        let snapshot = self.models.snapshot(Direction::Encoder);
        let result = self
            .encode_bits(record)
            .map(|(_, head, body)| (head.len() + body.len()) as u64);
        self.models.restore(Direction::Encoder, snapshot);
        result
    }

    /// Decode wire bytes, resolving the descriptor through the id codec.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Record, DecodeError> {
        let id_codec = self
            .active_id_codec()
            .map_err(DecodeError::Validation)?
            .ok_or(DecodeError::IdCodecDisabled)?;
        let probe_len = (id_codec.max_bits() as usize).div_ceil(8).min(bytes.len());
        let mut probe = Bitset::from_bytes(&bytes[..probe_len]);
        let id = id_codec.decode(&mut probe)?;
        let desc = self.schemas.by_id(id).map_err(|_| DecodeError::UnknownId { id })?.clone();
        self.decode_desc(bytes, &desc)
    }

    /// Decode wire bytes against an explicitly named descriptor.
    ///
    /// Required when the id codec is disabled; with an id codec active the
    /// wire id is still read and must match the named message.
    pub fn decode_as(&mut self, bytes: &[u8], name: &str) -> Result<Record, DecodeError> {
        let desc = self
            .schemas
            .by_name(name)
            .map_err(ValidationError::from)
            .map_err(DecodeError::Validation)?
            .clone();
        self.decode_desc(bytes, &desc)
    }

    /// Human-readable per-field layout report, in the spirit of a link
    /// budget worksheet.
    pub fn info(&mut self, name: &str) -> Result<String, ValidationError> {
        use std::fmt::Write as _;

        let bounds = self.validate(name)?;
        let desc = self.schemas.by_name(name)?.clone();
        let group = self.group_for(&desc)?;
        let cx = ValidateCx { res: self.resolver(group), depth: 0 };

        let mut out = String::new();
        let id = desc.id.map_or_else(|| "none".to_string(), |id| id.to_string());
        let _ = writeln!(
            out,
            "{} (id {id}, group {}): {}..{} bits, {}..{} bytes on the wire",
            desc.full_name,
            group.name(),
            bounds.min_bits(),
            bounds.max_bits(),
            bounds.min_bytes(),
            bounds.max_bytes(),
        );
        for field in &desc.fields {
            let fpath = format!("{}.{}", desc.full_name, field.name);
            let (min, max) = walk::field_bounds(field, &fpath, &cx)?;
            let codec = field
                .options
                .codec
                .clone()
                .or_else(|| group.default_for(field.kind.family()).map(str::to_string))
                .unwrap_or_else(|| "?".to_string());
            let section = if field.options.in_header { "header" } else { "body" };
            let width = if min == max {
                format!("{max} bits")
            } else {
                format!("{min}..{max} bits")
            };
            let _ = writeln!(
                out,
                "  {} [{section}] {} codec {codec}: {width}",
                field.name,
                field.kind.family(),
            );
        }
        Ok(out)
    }

    fn compute_bounds(&self, name: &str) -> Result<MessageBounds, ValidationError> {
        let desc = self.schemas.by_name(name)?.clone();
        let group = self.group_for(&desc)?;
        let id_codec = self.active_id_codec()?;
        let max_bytes = self.config.max_bytes.or(desc.options.max_bytes);
        validate_message(&desc, self.resolver(group), id_codec.as_ref(), max_bytes)
    }

    fn encode_bits(
        &self,
        record: &Record,
    ) -> Result<(Arc<MessageDescriptor>, Bitset, Bitset), EncodeError> {
        let desc = self
            .schemas
            .by_name(record.type_name())
            .map_err(ValidationError::from)?
            .clone();
        let group = self.group_for(&desc).map_err(EncodeError::Validation)?;
        let res = self.resolver(group);

        let mut head = Bitset::new();
        walk::encode_section(&desc, record, walk::Section::Header, res, &desc.full_name, &mut head)?;
        if let Some(id_codec) = self.active_id_codec().map_err(EncodeError::Validation)? {
            let id = desc.id.ok_or_else(|| {
                EncodeError::Validation(ValidationError::MissingId {
                    message: desc.full_name.clone(),
                })
            })?;
            id_codec.encode(id, &mut head)?;
        }

        let mut body = Bitset::new();
        walk::encode_section(&desc, record, walk::Section::Body, res, &desc.full_name, &mut body)?;
        Ok((desc, head, body))
    }

    fn decode_desc(
        &mut self,
        bytes: &[u8],
        desc: &Arc<MessageDescriptor>,
    ) -> Result<Record, DecodeError> {
        let bounds = self.validate(&desc.full_name).map_err(DecodeError::Validation)?;
        let snapshot = self.models.snapshot(Direction::Decoder);
        match self.decode_sections(bytes, desc, bounds) {
            Ok(record) => {
                tracing::debug!(
                    message = %desc.full_name,
                    bytes = bytes.len(),
                    "decoded message"
                );
                Ok(record)
            },
            Err(err) => {
                self.models.restore(Direction::Decoder, snapshot);
                Err(err)
            },
        }
    }

    fn decode_sections(
        &self,
        bytes: &[u8],
        desc: &Arc<MessageDescriptor>,
        bounds: MessageBounds,
    ) -> Result<Record, DecodeError> {
        let head_len = bounds.head_bytes();
        if bytes.len() < head_len {
            return Err(DecodeError::Truncated {
                requested: head_len * 8,
                available: bytes.len() * 8,
            });
        }

        let mut head_bits = Bitset::from_bytes(&bytes[..head_len]);
        if let Some(id_codec) = self.active_id_codec().map_err(DecodeError::Validation)? {
            let wire_id = id_codec.decode(&mut head_bits)?;
            if desc.id != Some(wire_id) {
                return Err(DecodeError::IdMismatch {
                    expected: desc.full_name.clone(),
                    expected_id: desc.id.unwrap_or(0),
                    got: wire_id,
                });
            }
        }

        let group = self.group_for(desc).map_err(DecodeError::Validation)?;
        let res = self.resolver(group);
        let mut record = Record::new(desc.full_name.clone());
        walk::decode_section(
            desc,
            walk::Section::Header,
            res,
            &desc.full_name,
            &mut head_bits,
            &mut record,
        )?;

        let mut body_bytes = bytes[head_len..].to_vec();
        if self.crypto_applies(desc)
            && let Some(key) = &self.key
        {
            key.apply(&bytes[..head_len], &mut body_bytes);
        }
        let mut body_bits = Bitset::from_bytes(&body_bytes);
        walk::decode_section(
            desc,
            walk::Section::Body,
            res,
            &desc.full_name,
            &mut body_bits,
            &mut record,
        )?;
        Ok(record)
    }

    fn group_for(&self, desc: &MessageDescriptor) -> Result<&CodecGroup, ValidationError> {
        let name = desc.options.codec_group.as_deref().unwrap_or(&self.config.group);
        self.registry.group(name)
    }

    /// The id codec framing every message under the current
    /// configuration, or `None` when disabled. One codec per instance:
    /// the receiver reads the id before it knows which message (and so
    /// which group) it is looking at.
    fn active_id_codec(&self) -> Result<Option<Arc<dyn IdCodec>>, ValidationError> {
        match &self.config.id_codec {
            IdCodecSelection::Disabled => Ok(None),
            IdCodecSelection::Group => {
                let group = self.registry.group(&self.config.group)?;
                Ok(Some(self.registry.id_codec(group.id_codec())?.clone()))
            },
            IdCodecSelection::Named(name) => Ok(Some(self.registry.id_codec(name)?.clone())),
        }
    }

    fn crypto_applies(&self, desc: &MessageDescriptor) -> bool {
        self.key.is_some()
            && !desc.options.disable_crypto
            && !desc.id.is_some_and(|id| self.config.skip_crypto_ids.contains(&id))
    }

    fn resolver<'a>(&'a self, group: &'a CodecGroup) -> Resolver<'a> {
        Resolver {
            registry: &self.registry,
            schemas: &self.schemas,
            group,
            models: &self.models,
            clock: &*self.clock,
        }
    }
}
