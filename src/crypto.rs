//! Encryption of persisted bytes.
//!
//! An [`Encryptor`] is a symmetric byte transform applied below the
//! codec: the cell persists `encrypt(encode(state))` and reads back
//! `decode(decrypt(bytes))`. The [`Passthrough`] variant is the
//! identity, so plain stores carry no crypto cost.
//!
//! The TTL store can additionally encrypt individual values; those are
//! base64-wrapped because preference values are strings on the wire.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Symmetric transform applied to a store's persisted bytes.
///
/// `decrypt(encrypt(bytes))` must round-trip for any byte sequence.
pub trait Encryptor: Send + Sync + 'static {
    /// Encrypt a plaintext buffer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encrypt`] if the transform fails; nothing
    /// is persisted in that case.
    fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a ciphertext buffer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decrypt`] if the buffer is not valid
    /// ciphertext for this encryptor. On the read path the cell logs
    /// the failure and falls back to decoding the raw bytes, so a store
    /// written without encryption stays readable after an encryptor is
    /// configured.
    fn decrypt(&self, cipher: &[u8]) -> Result<Vec<u8>>;
}

/// Identity transform; the default for unencrypted stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Encryptor for Passthrough {
    fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>> {
        Ok(plain.to_vec())
    }

    fn decrypt(&self, cipher: &[u8]) -> Result<Vec<u8>> {
        Ok(cipher.to_vec())
    }
}

/// AES-256-GCM encryptor keyed from a caller-supplied passphrase.
///
/// The key is the SHA-256 digest of the passphrase. Output layout is
/// `nonce || ciphertext || tag` with a fresh random nonce per call, so
/// encrypting the same plaintext twice yields different bytes.
pub struct AesGcmEncryptor {
    cipher: Aes256Gcm,
}

impl AesGcmEncryptor {
    /// Derive a 256-bit key from the passphrase and build the cipher.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(digest.as_slice());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }
}

impl Encryptor for AesGcmEncryptor {
    fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plain)
            .map_err(|e| StoreError::encrypt(e))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, cipher: &[u8]) -> Result<Vec<u8>> {
        if cipher.len() < NONCE_LEN {
            return Err(StoreError::decrypt("buffer shorter than nonce"));
        }
        let (nonce, ciphertext) = cipher.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| StoreError::decrypt(e))
    }
}

/// Encrypt a textual value and wrap it as base64 for string embedding.
pub(crate) fn seal_text(encryptor: &dyn Encryptor, text: &str) -> Result<String> {
    let cipher = encryptor.encrypt(text.as_bytes())?;
    Ok(BASE64.encode(cipher))
}

/// Reverse of [`seal_text`]: base64-decode, decrypt, and re-validate as
/// UTF-8.
pub(crate) fn open_text(encryptor: &dyn Encryptor, sealed: &str) -> Result<String> {
    let cipher = BASE64
        .decode(sealed)
        .map_err(|e| StoreError::decrypt(format!("invalid base64: {e}")))?;
    let plain = encryptor.decrypt(&cipher)?;
    String::from_utf8(plain).map_err(|e| StoreError::decrypt(e))
}
