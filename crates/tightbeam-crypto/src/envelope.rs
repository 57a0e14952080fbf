//! Keystream envelope over the message body.

use chacha20::ChaCha20;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// ChaCha20 nonce width in bytes.
pub const NONCE_SIZE: usize = 12;

/// Derive the body nonce from the cleartext header bytes.
///
/// The header byte string is zero-padded or truncated to [`NONCE_SIZE`].
/// Both peers compute this from the same bytes, so no nonce travels on the
/// wire.
pub fn nonce_from_header(header: &[u8]) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    let n = header.len().min(NONCE_SIZE);
    nonce[..n].copy_from_slice(&header[..n]);
    nonce
}

/// Symmetric key for the body envelope.
///
/// Derived once from the configured passphrase and held for the codec
/// lifetime. The raw key bytes are zeroized when the key is dropped.
pub struct EnvelopeKey {
    key: [u8; 32],
}

impl EnvelopeKey {
    /// Derive a key as the SHA-256 digest of a passphrase.
    pub fn derive(passphrase: &[u8]) -> Self {
        let digest = Sha256::digest(passphrase);
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// XOR the body with the keystream selected by the header bytes.
    ///
    /// Length-preserving and self-inverse: applying twice with the same
    /// header restores the plaintext.
    pub fn apply(&self, header: &[u8], body: &mut [u8]) {
        if body.is_empty() {
            return;
        }
        let nonce = nonce_from_header(header);
        let mut cipher = ChaCha20::new((&self.key).into(), (&nonce).into());
        cipher.apply_keystream(body);
    }
}

impl Drop for EnvelopeKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("EnvelopeKey").finish_non_exhaustive()
    }
}
