//! Codec configuration.

use std::collections::BTreeSet;

use crate::codecs;

/// How the codec picks the id codec that frames every message.
///
/// One id codec is active per [`crate::Codec`] instance: the receiver must
/// know how to read the id before it knows anything else about the
/// message, so the choice cannot vary per message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdCodecSelection {
    /// Use the id codec of the configured default group.
    #[default]
    Group,
    /// Use a specific registered id codec for every message.
    Named(String),
    /// No id prefix on the wire; decoding requires
    /// [`crate::Codec::decode_as`] with an explicit message name.
    Disabled,
}

/// Options consumed by [`crate::Codec::set_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Passphrase the body-envelope key is derived from; `None` disables
    /// encryption entirely.
    pub passphrase: Option<Vec<u8>>,

    /// Message ids whose bodies stay cleartext even when a passphrase is
    /// set (e.g. broadcast telemetry a whole fleet must read).
    pub skip_crypto_ids: BTreeSet<u32>,

    /// Id codec selection.
    pub id_codec: IdCodecSelection,

    /// Codec group used by messages that do not select one themselves.
    pub group: String,

    /// Overrides every message's `max_bytes` budget when set.
    pub max_bytes: Option<u32>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            passphrase: None,
            skip_crypto_ids: BTreeSet::new(),
            id_codec: IdCodecSelection::Group,
            group: codecs::STANDARD_GROUP.to_string(),
            max_bytes: None,
        }
    }
}

impl CodecConfig {
    /// Set the crypto passphrase.
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<Vec<u8>>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Exempt a message id from body encryption.
    #[must_use]
    pub fn skip_crypto_for(mut self, id: u32) -> Self {
        self.skip_crypto_ids.insert(id);
        self
    }

    /// Force a specific id codec for every message.
    #[must_use]
    pub fn with_id_codec(mut self, name: impl Into<String>) -> Self {
        self.id_codec = IdCodecSelection::Named(name.into());
        self
    }

    /// Disable the id prefix.
    #[must_use]
    pub fn without_id_codec(mut self) -> Self {
        self.id_codec = IdCodecSelection::Disabled;
        self
    }

    /// Select the default codec group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Cap every message at `max_bytes` regardless of its own budget.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u32) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }
}
