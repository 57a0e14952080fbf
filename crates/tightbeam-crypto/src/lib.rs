//! Tightbeam body envelope.
//!
//! Optional symmetric encryption for the body section of an encoded
//! message. The header section (id plus header fields) always travels in
//! the clear so receivers can route before decrypting; the body is XORed
//! with a ChaCha20 keystream whose nonce is derived deterministically from
//! the header bytes, so the receiver reconstructs the nonce from the part
//! of the message it has already read.
//!
//! The envelope is length-preserving and unauthenticated by design: the
//! channels this codec targets budget tens of bits per message, and the
//! schema-driven decoder rejects garbage on its own. Applying the keystream
//! twice is the identity, so encrypt and decrypt are the same operation.
//!
//! # Key lifecycle
//!
//! ```text
//! passphrase ──SHA-256──▶ EnvelopeKey (32 bytes, zeroized on drop)
//!                              │
//! header bytes ──pad/trunc──▶ nonce (12 bytes)
//!                              │
//!                         ChaCha20 keystream XOR body
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;

pub use envelope::{EnvelopeKey, NONCE_SIZE, nonce_from_header};
