//! Message and field descriptors.
//!
//! A [`MessageDescriptor`] is the schema of one message: an ordered field
//! list, an optional wire id, and per-message options. Each
//! [`FieldDescriptor`] carries the hints the bit-level codecs need to emit a
//! minimum-length encoding: numeric range, decimal precision, maximum
//! lengths, an explicit codec override, and the header/body partition flag.
//!
//! Descriptors serialize with serde so an embedding application can keep its
//! schemas in configuration files; the codec core itself never touches the
//! filesystem.

use serde::{Deserialize, Serialize};

/// The scalar or composite type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Raw byte string.
    Bytes,
    /// Enumeration over a closed set of named values.
    Enum(EnumDescriptor),
    /// Embedded message, referenced by its registered full name.
    Message(String),
}

impl FieldKind {
    /// The registry family this kind dispatches on.
    pub fn family(&self) -> TypeFamily {
        match self {
            FieldKind::Int32 => TypeFamily::Int32,
            FieldKind::Int64 => TypeFamily::Int64,
            FieldKind::UInt32 => TypeFamily::UInt32,
            FieldKind::UInt64 => TypeFamily::UInt64,
            FieldKind::Float => TypeFamily::Float,
            FieldKind::Double => TypeFamily::Double,
            FieldKind::Bool => TypeFamily::Bool,
            FieldKind::String => TypeFamily::String,
            FieldKind::Bytes => TypeFamily::Bytes,
            FieldKind::Enum(_) => TypeFamily::Enum,
            FieldKind::Message(_) => TypeFamily::Message,
        }
    }

    /// True for the integer families (signed and unsigned).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldKind::Int32 | FieldKind::Int64 | FieldKind::UInt32 | FieldKind::UInt64
        )
    }

    /// True for `Float` and `Double`.
    pub fn is_floating(&self) -> bool {
        matches!(self, FieldKind::Float | FieldKind::Double)
    }
}

/// Payload-free type family used as a codec registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeFamily {
    /// Signed 32-bit integer fields.
    Int32,
    /// Signed 64-bit integer fields.
    Int64,
    /// Unsigned 32-bit integer fields.
    UInt32,
    /// Unsigned 64-bit integer fields.
    UInt64,
    /// 32-bit float fields.
    Float,
    /// 64-bit float fields.
    Double,
    /// Boolean fields.
    Bool,
    /// String fields.
    String,
    /// Byte-string fields.
    Bytes,
    /// Enumeration fields.
    Enum,
    /// Embedded message fields.
    Message,
}

impl std::fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeFamily::Int32 => "int32",
            TypeFamily::Int64 => "int64",
            TypeFamily::UInt32 => "uint32",
            TypeFamily::UInt64 => "uint64",
            TypeFamily::Float => "float",
            TypeFamily::Double => "double",
            TypeFamily::Bool => "bool",
            TypeFamily::String => "string",
            TypeFamily::Bytes => "bytes",
            TypeFamily::Enum => "enum",
            TypeFamily::Message => "message",
        };
        f.write_str(name)
    }
}

/// Enumeration schema: declared value names in declaration order.
///
/// The wire encoding is the dense index into this list, so declaration
/// order is part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    /// Name of the enumeration type.
    pub name: String,
    /// Declared value names, in declaration order.
    pub values: Vec<String>,
}

impl EnumDescriptor {
    /// Create an enum descriptor from a value-name list.
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { name: name.into(), values: values.into_iter().map(Into::into).collect() }
    }

    /// Dense wire index of a value name, if declared.
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

/// Field cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    /// Exactly one value must be present.
    Required,
    /// Zero or one value.
    Optional,
    /// Zero or more values, bounded by `max_repeat`.
    Repeated,
}

/// Per-field codec hints.
///
/// All hints default to absent; each codec's `validate` decides which are
/// mandatory for it (the default integer codec requires `min`/`max`, the
/// string codec requires `max_length`, and so on).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Minimum legal value for numeric fields.
    pub min: Option<f64>,
    /// Maximum legal value for numeric fields.
    pub max: Option<f64>,
    /// Decimal places preserved by floating-point fields.
    pub precision: Option<i32>,
    /// Maximum length in bytes for string/bytes fields.
    pub max_length: Option<u32>,
    /// Maximum element count for repeated fields.
    pub max_repeat: Option<u32>,
    /// Explicit codec name, overriding the group default for the family.
    pub codec: Option<String>,
    /// True when the field belongs to the fixed-width, never-encrypted
    /// message header.
    pub in_header: bool,
    /// Probability model name for the arithmetic codec.
    pub model: Option<String>,
    /// Name of a sibling field consulted by context-sensitive codecs
    /// (the legacy speed codec reads its thrust-mode enum through this).
    pub context_field: Option<String>,
}

/// Schema of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name, unique within the message.
    pub name: String,
    /// Scalar or composite type.
    pub kind: FieldKind,
    /// Cardinality.
    pub label: Label,
    /// Codec hints.
    pub options: FieldOptions,
}

impl FieldDescriptor {
    /// A required field with default options.
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, label: Label::Required, options: FieldOptions::default() }
    }

    /// An optional field with default options.
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, label: Label::Optional, options: FieldOptions::default() }
    }

    /// A repeated field bounded at `max_repeat` elements.
    pub fn repeated(name: impl Into<String>, kind: FieldKind, max_repeat: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            label: Label::Repeated,
            options: FieldOptions { max_repeat: Some(max_repeat), ..FieldOptions::default() },
        }
    }

    /// Set the inclusive numeric range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.options.min = Some(min);
        self.options.max = Some(max);
        self
    }

    /// Set the decimal precision of a floating-point field.
    pub fn with_precision(mut self, precision: i32) -> Self {
        self.options.precision = Some(precision);
        self
    }

    /// Set the maximum byte length of a string/bytes field.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.options.max_length = Some(max_length);
        self
    }

    /// Select an explicit codec by name.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.options.codec = Some(codec.into());
        self
    }

    /// Place the field in the message header.
    pub fn in_header(mut self) -> Self {
        self.options.in_header = true;
        self
    }

    /// Attach an arithmetic probability model by name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    /// Name the sibling field context-sensitive codecs consult.
    pub fn with_context_field(mut self, field: impl Into<String>) -> Self {
        self.options.context_field = Some(field.into());
        self
    }
}

/// Per-message options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageOptions {
    /// Hard limit on the encoded size in bytes; enforced by the validator.
    pub max_bytes: Option<u32>,
    /// Codec group the message encodes under; the configured default group
    /// applies when absent.
    pub codec_group: Option<String>,
    /// Keep the body cleartext even when a crypto key is configured.
    pub disable_crypto: bool,
}

/// Schema of one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    /// Full name, unique per [`crate::SchemaSet`].
    pub full_name: String,
    /// Wire id discriminating this message in a received byte string.
    /// Messages without an id can only be decoded with an explicit
    /// descriptor.
    pub id: Option<u32>,
    /// Per-message options.
    pub options: MessageOptions,
    /// Ordered field list; encode order is declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    /// An empty message schema.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            id: None,
            options: MessageOptions::default(),
            fields: Vec::new(),
        }
    }

    /// Set the wire id.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the maximum encoded size in bytes.
    pub fn with_max_bytes(mut self, max_bytes: u32) -> Self {
        self.options.max_bytes = Some(max_bytes);
        self
    }

    /// Select the codec group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.options.codec_group = Some(group.into());
        self
    }

    /// Keep the body cleartext even when a crypto key is configured.
    pub fn without_crypto(mut self) -> Self {
        self.options.disable_crypto = true;
        self
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields in the fixed-width header partition, in declaration order.
    pub fn header_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.options.in_header)
    }

    /// Fields in the body partition, in declaration order.
    pub fn body_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.options.in_header)
    }
}
