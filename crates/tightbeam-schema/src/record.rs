//! Dynamic message values.
//!
//! A [`Record`] is the runtime value of a message described by a
//! [`crate::MessageDescriptor`]: a map from field name to [`FieldValue`].
//! Records are what the codec encodes and what decode rebuilds; they carry
//! no schema themselves beyond the message type name.
//!
//! Absent optional fields are simply missing from the map. Repeated fields
//! hold a [`FieldValue::List`], which may be empty.

use std::collections::BTreeMap;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer (int32/int64 fields).
    Int(i64),
    /// Unsigned integer (uint32/uint64 fields).
    UInt(u64),
    /// Floating point (float/double fields).
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Enumeration value, by declared name.
    Enum(String),
    /// Embedded message.
    Message(Record),
}

impl Value {
    /// Short type label for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Message(_) => "message",
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(u64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Message(v)
    }
}

/// Value slot of one field: a single value or a repeated list.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Required/optional field.
    Single(Value),
    /// Repeated field, possibly empty.
    List(Vec<Value>),
}

/// Runtime value of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// An empty record of the named message type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), fields: BTreeMap::new() }
    }

    /// Full name of the message type this record conforms to.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Set a required/optional field, replacing any previous value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a required/optional field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), FieldValue::Single(value.into()));
    }

    /// Append an element to a repeated field, creating the list on first use.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let slot = self
            .fields
            .entry(name.into())
            .or_insert_with(|| FieldValue::List(Vec::new()));
        match slot {
            FieldValue::List(items) => items.push(value.into()),
            // A single value under the same name is replaced by a list so
            // decode can rebuild repeated fields incrementally.
            FieldValue::Single(prev) => {
                let prev = prev.clone();
                *slot = FieldValue::List(vec![prev, value.into()]);
            },
        }
    }

    /// Store a whole repeated field at once.
    pub fn set_list(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.fields.insert(name.into(), FieldValue::List(values));
    }

    /// Raw field slot, if set.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Single value of a required/optional field, if set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name) {
            Some(FieldValue::Single(v)) => Some(v),
            _ => None,
        }
    }

    /// Elements of a repeated field, if set.
    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        match self.fields.get(name) {
            Some(FieldValue::List(items)) => Some(items),
            _ => None,
        }
    }

    /// True when the field has a value (possibly an empty list).
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Remove a field value.
    pub fn clear(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Iterate over set fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Signed integer value of a field.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Unsigned integer value of a field.
    pub fn uint(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(Value::UInt(v)) => Some(*v),
            _ => None,
        }
    }

    /// Floating-point value of a field.
    pub fn float(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Boolean value of a field.
    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(Value::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// String value of a field.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Byte-string value of a field.
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        match self.get(name) {
            Some(Value::Bytes(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Enumeration value name of a field.
    pub fn enum_value(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Enum(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Embedded message value of a field.
    pub fn message(&self, name: &str) -> Option<&Record> {
        match self.get(name) {
            Some(Value::Message(v)) => Some(v),
            _ => None,
        }
    }
}
