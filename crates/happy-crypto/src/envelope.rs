//! AES-256-GCM envelope encryption for the relay wire protocol.
//!
//! The relay never sees plaintext session content: every `update` and
//! `ephemeral` payload is sealed client-side before it is published and
//! opened only by other clients holding the same account master key. The
//! wire format is `version_byte || nonce (12 bytes) || ciphertext`, where
//! `ciphertext` includes the GCM authentication tag.
//!
//! Per-message keys are not derived; instead a single AES-256 key is
//! derived once per account via HKDF-SHA256 from the account master
//! secret, using [`derive_envelope_key`]. The 12-byte nonce is drawn fresh
//! from the OS RNG for every seal, which is safe under AES-GCM as long as
//! a single key does not seal more than ~2^32 messages (far beyond a
//! single account's lifetime update volume).

use aes_gcm::aead::{Aead, KeyInit, OsRng, rand_core::RngCore};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};

/// Current envelope wire format version.
///
/// Bumped if the AEAD scheme or framing ever changes; `open` rejects any
/// version byte it does not recognize rather than guessing.
pub const ENVELOPE_VERSION: u8 = 1;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// A derived AES-256 key for sealing and opening envelopes.
///
/// Distinct from [`crate::KeyPair`]: that type is an Ed25519 signing
/// identity, this is a symmetric content-encryption key scoped to one
/// account.
#[derive(Clone)]
pub struct EnvelopeKey([u8; KEY_LEN]);

impl EnvelopeKey {
    /// Wrap raw key bytes directly (e.g. for tests or migration).
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Seal `plaintext`, producing `version || nonce || ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::CryptoError`] if the underlying AEAD seal
    /// fails (it does not fail for any input this API accepts; the error
    /// path exists because the `aes-gcm` API is fallible).
    pub fn seal(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::CryptoError(format!("seal failed: {e}")))?;

        let mut out = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        out.push(ENVELOPE_VERSION);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Open an envelope produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::CryptoError`] if the envelope is too short,
    /// carries an unrecognized version byte, or fails authentication
    /// (wrong key, or tampered ciphertext).
    pub fn open(&self, envelope: &[u8]) -> CryptoResult<Vec<u8>> {
        if envelope.len() < 1 + NONCE_LEN {
            return Err(CryptoError::CryptoError("envelope too short".into()));
        }
        let version = envelope[0];
        if version != ENVELOPE_VERSION {
            return Err(CryptoError::CryptoError(format!(
                "unsupported envelope version: {version}"
            )));
        }

        let nonce = Nonce::from_slice(&envelope[1..1 + NONCE_LEN]);
        let ciphertext = &envelope[1 + NONCE_LEN..];

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0));
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::CryptoError("envelope authentication failed".into()))
    }
}

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeKey").finish_non_exhaustive()
    }
}

/// Derive an account's symmetric envelope key from its master secret via
/// HKDF-SHA256, domain-separated by `info` so the same master secret can
/// safely derive keys for other purposes without cross-use.
///
/// # Errors
///
/// Returns [`CryptoError::CryptoError`] if HKDF's output-length expansion
/// fails, which only happens for pathologically long `info` strings far
/// beyond what this crate ever passes.
pub fn derive_envelope_key(master_secret: &[u8], info: &str) -> CryptoResult<EnvelopeKey> {
    let hk = Hkdf::<Sha256>::new(None, master_secret);
    let mut out = [0u8; KEY_LEN];
    hk.expand(info.as_bytes(), &mut out)
        .map_err(|e| CryptoError::CryptoError(format!("key derivation failed: {e}")))?;
    Ok(EnvelopeKey::from_bytes(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_roundtrips() {
        let key = derive_envelope_key(b"account-master-secret", "happy-envelope-v1").unwrap();
        let plaintext = b"{\"type\":\"update\",\"seq\":42}";

        let envelope = key.seal(plaintext).unwrap();
        assert_eq!(envelope[0], ENVELOPE_VERSION);

        let opened = key.open(&envelope).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn each_seal_uses_a_fresh_nonce() {
        let key = derive_envelope_key(b"secret", "info").unwrap();
        let a = key.seal(b"same plaintext").unwrap();
        let b = key.seal(b"same plaintext").unwrap();
        assert_ne!(a, b, "nonces (and therefore ciphertexts) must differ");
    }

    #[test]
    fn open_rejects_wrong_key() {
        let key_a = derive_envelope_key(b"secret-a", "info").unwrap();
        let key_b = derive_envelope_key(b"secret-b", "info").unwrap();

        let envelope = key_a.seal(b"content").unwrap();
        assert!(key_b.open(&envelope).is_err());
    }

    #[test]
    fn open_rejects_tampered_ciphertext() {
        let key = derive_envelope_key(b"secret", "info").unwrap();
        let mut envelope = key.seal(b"content").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0xFF;
        assert!(key.open(&envelope).is_err());
    }

    #[test]
    fn open_rejects_unknown_version() {
        let key = derive_envelope_key(b"secret", "info").unwrap();
        let mut envelope = key.seal(b"content").unwrap();
        envelope[0] = 99;
        assert!(key.open(&envelope).is_err());
    }

    #[test]
    fn different_info_strings_derive_different_keys() {
        let a = derive_envelope_key(b"secret", "scope-a").unwrap();
        let b = derive_envelope_key(b"secret", "scope-b").unwrap();
        let envelope = a.seal(b"content").unwrap();
        assert!(b.open(&envelope).is_err());
    }
}
