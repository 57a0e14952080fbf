//! Tightbeam codec core.
//!
//! Tightbeam marshals structured records into minimum-length bit strings
//! for channels where every bit is expensive: acoustic modems, burst
//! satellite uplinks, anything with payloads of tens to a few hundred
//! bits. Messages are described by a [`tightbeam_schema::MessageDescriptor`]
//! whose per-field range, precision and length hints let each field codec
//! emit a near-information-theoretic encoding instead of a self-describing
//! byte format. Both peers must hold identical descriptors; the wire
//! carries only a short message id followed by the packed field bits.
//!
//! # Architecture
//!
//! - **Sans-IO**: encode and decode are pure byte/record transformations;
//!   transport, queueing and scheduling live elsewhere.
//! - **Deterministic**: same record, same descriptor, same model state →
//!   same bits. No clock or randomness in the encode path (the injectable
//!   [`Clock`] exists only for the legacy time-of-day codec).
//! - **Validated up front**: a descriptor must pass [`Codec::validate`]
//!   (run implicitly by [`Codec::load`]) before any record is encoded;
//!   validation proves the encoding is bounded and round-trip safe.
//!
//! # Flow
//!
//! 1. **Load**: register descriptors; ids must be unique.
//! 2. **Encode**: id and header fields pack into the clear head section;
//!    body fields pack behind it, optionally XOR-encrypted with a
//!    head-derived nonce.
//! 3. **Decode**: the id codec picks the descriptor, the head decodes, the
//!    body is decrypted and decoded field by field.
//!
//! A [`Codec`] instance carries transient per-operation state and is not
//! safe for concurrent use; independent instances may run in parallel.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod arith;
mod bitset;
mod clock;
mod codec;
pub mod codecs;
mod config;
mod error;
mod field;
mod id;
mod registry;
mod validate;
mod walk;

pub use bitset::{Bitset, bits_to_represent};
pub use clock::{Clock, SystemClock};
pub use codec::Codec;
pub use config::{CodecConfig, IdCodecSelection};
pub use error::{DecodeError, EncodeError, RegistrationError, ValidationError};
pub use field::{DecodeCx, EncodeCx, FieldCodec, Resolver, ValidateCx};
pub use id::{DefaultIdCodec, IdCodec, LegacyIdCodec};
pub use registry::{CodecGroup, CodecRegistry, SymbolMapping};
pub use validate::MessageBounds;
