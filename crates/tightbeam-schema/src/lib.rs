//! Tightbeam schema model.
//!
//! Message and field descriptors for the Tightbeam marshalling codec, plus
//! the dynamic [`Record`]/[`Value`] model that encode and decode operate on.
//! Descriptors are the compile-time-free analogue of a generated message
//! type: an ordered list of typed fields enriched with the numeric-range,
//! precision and length hints the bit-level codecs exploit.
//!
//! # Invariants
//!
//! - Descriptors are immutable once registered in a [`SchemaSet`]; the codec
//!   layer holds `Arc` references and never mutates them.
//! - Message ids are unique across the whole set, regardless of codec group.
//! - Field names are unique within one message.
//!
//! Both peers of a link must register identical descriptors; the wire format
//! carries no self-description.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod descriptor;
mod error;
mod record;
mod set;

pub use descriptor::{
    EnumDescriptor, FieldDescriptor, FieldKind, FieldOptions, Label, MessageDescriptor,
    MessageOptions, TypeFamily,
};
pub use error::SchemaError;
pub use record::{FieldValue, Record, Value};
pub use set::SchemaSet;
