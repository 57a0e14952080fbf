//! Schema-level error types.

use thiserror::Error;

/// Errors raised while building or registering descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A message with this full name is already registered.
    #[error("duplicate message: {name:?} is already registered")]
    DuplicateMessage {
        /// Full name of the offending message.
        name: String,
    },

    /// A message id is already taken, possibly by another codec group.
    #[error("duplicate id {id}: already used by {existing:?}")]
    DuplicateId {
        /// The colliding numeric id.
        id: u32,
        /// Full name of the message that already owns the id.
        existing: String,
    },

    /// Two fields of one message share a name.
    #[error("duplicate field {field:?} in message {message:?}")]
    DuplicateField {
        /// Full name of the enclosing message.
        message: String,
        /// The repeated field name.
        field: String,
    },

    /// Lookup of a message that was never registered.
    #[error("unknown message: {name:?}")]
    UnknownMessage {
        /// The requested full name.
        name: String,
    },

    /// Lookup of a message id that was never registered.
    #[error("unknown message id: {id}")]
    UnknownId {
        /// The requested numeric id.
        id: u32,
    },
}
