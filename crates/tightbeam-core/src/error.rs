//! Error types for the codec core.
//!
//! Four kinds, matching the four failure domains: schema problems found
//! before any bits move ([`ValidationError`]), runtime encode failures
//! ([`EncodeError`]), runtime decode failures ([`DecodeError`]), and
//! registry conflicts ([`RegistrationError`]). Errors are never masked:
//! the façade returns them to the caller unchanged. A failed encode leaves
//! no observable effect; a failed decode discards the partial record.

use thiserror::Error;
use tightbeam_schema::{SchemaError, TypeFamily};

/// Schema-level errors: the descriptor cannot yield a bounded,
/// round-trip-safe encoding.
///
/// Raised by `validate`/`load`, or by the first encode/decode when
/// validation runs implicitly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A codec requires an option the field does not carry.
    #[error("{path}: missing required option {option:?}")]
    MissingOption {
        /// Dotted path of the offending field.
        path: String,
        /// Name of the absent option.
        option: &'static str,
    },

    /// An option is present but unusable.
    #[error("{path}: invalid option: {reason}")]
    InvalidOption {
        /// Dotted path of the offending field.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The resolved codec cannot encode this field's type family.
    #[error("{path}: codec {codec:?} does not support {family} fields")]
    UnsupportedKind {
        /// Dotted path of the offending field.
        path: String,
        /// Name of the resolved codec.
        codec: String,
        /// The field's type family.
        family: TypeFamily,
    },

    /// No codec registered under the requested (family, name) key.
    #[error("{path}: no codec named {name:?} for {family} fields")]
    UnknownCodec {
        /// Dotted path of the offending field.
        path: String,
        /// The requested codec name.
        name: String,
        /// The field's type family.
        family: TypeFamily,
    },

    /// The selected codec group was never registered.
    #[error("unknown codec group {name:?}")]
    UnknownGroup {
        /// The requested group name.
        name: String,
    },

    /// The selected id codec was never registered.
    #[error("unknown id codec {name:?}")]
    UnknownIdCodec {
        /// The requested id codec name.
        name: String,
    },

    /// A header field may not have a variable width.
    #[error("{path}: header fields must be fixed-width, got {min_bits}..{max_bits} bits")]
    HeaderNotFixed {
        /// Dotted path of the offending field.
        path: String,
        /// Minimum encoded size in bits.
        min_bits: u64,
        /// Maximum encoded size in bits.
        max_bits: u64,
    },

    /// The message cannot be proven to fit its byte budget.
    #[error("{message}: worst case {needed_bytes} bytes exceeds limit of {max_bytes}")]
    Oversize {
        /// Full name of the message.
        message: String,
        /// Worst-case encoded size.
        needed_bytes: u64,
        /// The configured limit.
        max_bytes: u64,
    },

    /// The message needs a wire id but declares none.
    #[error("{message}: an id is required when an id codec is configured")]
    MissingId {
        /// Full name of the message.
        message: String,
    },

    /// The declared wire id is outside what the id codec can express.
    #[error("{message}: id {id} is not encodable: {reason}")]
    InvalidId {
        /// Full name of the message.
        message: String,
        /// The declared id.
        id: u32,
        /// Why the id codec rejects it.
        reason: String,
    },

    /// An arithmetic field references a model that was never created.
    #[error("{path}: unknown probability model {model:?}")]
    UnknownModel {
        /// Dotted path of the offending field.
        path: String,
        /// The requested model name.
        model: String,
    },

    /// Message nesting exceeds the supported depth.
    #[error("{path}: message nesting exceeds {limit} levels")]
    NestingTooDeep {
        /// Dotted path where the limit was hit.
        path: String,
        /// The depth limit.
        limit: u32,
    },

    /// Descriptor registration or lookup failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Runtime encode failures. The encoder aborts and returns no partial
/// output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A value lies outside the field's declared range.
    #[error("{path}: value {value} is outside the declared range")]
    OutOfRange {
        /// Dotted path of the offending field.
        path: String,
        /// Display form of the rejected value.
        value: String,
    },

    /// A repeated field holds more elements than `max_repeat`.
    #[error("{path}: {count} elements exceeds max_repeat {max}")]
    TooManyElements {
        /// Dotted path of the offending field.
        path: String,
        /// Number of elements supplied.
        count: usize,
        /// The declared bound.
        max: u32,
    },

    /// A string/bytes value is longer than `max_length`.
    #[error("{path}: length {len} exceeds max_length {max}")]
    TooLong {
        /// Dotted path of the offending field.
        path: String,
        /// Byte length supplied.
        len: usize,
        /// The declared bound.
        max: u32,
    },

    /// A required field has no value.
    #[error("{path}: missing required field")]
    MissingField {
        /// Dotted path of the offending field.
        path: String,
    },

    /// The record holds a value of the wrong type for this field.
    #[error("{path}: expected {expected} value, got {got}")]
    WrongType {
        /// Dotted path of the offending field.
        path: String,
        /// What the field's codec accepts.
        expected: &'static str,
        /// What the record holds.
        got: &'static str,
    },

    /// An enum value name is not in the declared set.
    #[error("{path}: {value:?} is not a declared enum value")]
    UnknownEnumValue {
        /// Dotted path of the offending field.
        path: String,
        /// The rejected name.
        value: String,
    },

    /// Implicit validation failed before any bits were written.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Runtime decode failures. The partial record is discarded; fields are
/// populated in declaration order up to the failure point and never
/// exposed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The input ends before the requested bits.
    #[error("truncated input: needed {requested} more bits, {available} available")]
    Truncated {
        /// Bits the decoder asked for.
        requested: usize,
        /// Bits that remained.
        available: usize,
    },

    /// The decoded id matches no registered descriptor.
    #[error("unknown message id {id}")]
    UnknownId {
        /// The id found on the wire.
        id: u32,
    },

    /// The wire id does not match the descriptor the caller expected.
    #[error("id mismatch: expected {expected:?} (id {expected_id}), wire says {got}")]
    IdMismatch {
        /// Full name of the expected message.
        expected: String,
        /// Its declared id.
        expected_id: u32,
        /// The id found on the wire.
        got: u32,
    },

    /// Decoding requires an id codec but none is configured.
    #[error("no id codec configured; use decode_as with an explicit message name")]
    IdCodecDisabled,

    /// A decoded enum index is outside the declared value set.
    #[error("{path}: enum index {index} out of range ({count} values declared)")]
    InvalidEnumIndex {
        /// Dotted path of the offending field.
        path: String,
        /// The decoded index.
        index: u64,
        /// Number of declared values.
        count: usize,
    },

    /// A decoded length prefix exceeds the declared maximum.
    #[error("{path}: length prefix {len} exceeds max_length {max}")]
    BadLengthPrefix {
        /// Dotted path of the offending field.
        path: String,
        /// The decoded length.
        len: u64,
        /// The declared bound.
        max: u32,
    },

    /// A decoded string is not valid UTF-8.
    #[error("{path}: decoded bytes are not valid UTF-8")]
    InvalidUtf8 {
        /// Dotted path of the offending field.
        path: String,
    },

    /// The EOF symbol cannot be mapped to a field value.
    #[error("{path}: EOF symbol has no value")]
    EofHasNoValue {
        /// Dotted path of the offending field.
        path: String,
    },

    /// A cumulative frequency fell outside every symbol's range.
    #[error("{path}: cumulative frequency {value} matches no symbol")]
    CumulativeLookupMiss {
        /// Dotted path of the offending field.
        path: String,
        /// The orphaned cumulative frequency.
        value: u64,
    },

    /// Implicit validation failed before any bits were read.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Registry conflicts: duplicate or malformed codec/model registration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// A field codec is already registered under this (family, name) key.
    #[error("field codec {name:?} for {family} fields is already registered")]
    DuplicateFieldCodec {
        /// The registry family key.
        family: TypeFamily,
        /// The registry name key.
        name: String,
    },

    /// An id codec is already registered under this name.
    #[error("id codec {name:?} is already registered")]
    DuplicateIdCodec {
        /// The registry name key.
        name: String,
    },

    /// A codec group is already registered under this name.
    #[error("codec group {name:?} is already registered")]
    DuplicateGroup {
        /// The registry name key.
        name: String,
    },

    /// A probability model is already registered under this name.
    #[error("model {name:?} is already registered")]
    DuplicateModel {
        /// The model name.
        name: String,
    },

    /// A model operation referenced a name that was never created.
    #[error("unknown model {name:?}")]
    UnknownModel {
        /// The model name.
        name: String,
    },

    /// A model specification is internally inconsistent.
    #[error("model {name:?} is invalid: {reason}")]
    InvalidModel {
        /// The model name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}
