//! # Encryption Context
//!
//! A derived symmetric key plus cipher, computed once per (salt, passphrase)
//! pair. Derivation is intentionally expensive; see [`crate::KeyContextCache`]
//! for session-lifetime reuse.

use crate::{CryptoError, Salt, KDF_ITERATIONS, KEY_LEN};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

/// XChaCha20 nonce length in bytes.
const NONCE_LEN: usize = 24;

/// A symmetric key derived from the shared salt and a caller passphrase.
///
/// Holds the key for the lifetime of a session; the key material is wiped
/// on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct EncryptionContext {
    key: [u8; KEY_LEN],
}

impl EncryptionContext {
    /// Derive a context from the shared salt and a caller passphrase.
    ///
    /// Runs PBKDF2-HMAC-SHA256 with [`KDF_ITERATIONS`] iterations, which
    /// takes noticeable wall time; cache the result per passphrase rather
    /// than deriving per request.
    #[must_use]
    pub fn derive(salt: &Salt, passphrase: &str) -> Self {
        let mut key = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(
            passphrase.as_bytes(),
            salt.as_bytes(),
            KDF_ITERATIONS,
            &mut key,
        );
        Self { key }
    }

    /// Encrypt `plaintext`, returning base64(nonce || ciphertext).
    ///
    /// A fresh random 24-byte nonce is generated per call; the 192-bit nonce
    /// space makes random nonces collision-safe.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encryption` if the cipher fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let cipher = XChaCha20Poly1305::new((&self.key).into());
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(framed))
    }

    /// Decrypt base64(nonce || ciphertext) produced by [`Self::encrypt`].
    ///
    /// # Errors
    ///
    /// - `CryptoError::MalformedCiphertext` if the input is not base64 or is
    ///   too short to hold a nonce.
    /// - `CryptoError::Decryption` on authentication failure (wrong key or
    ///   tampered ciphertext).
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, CryptoError> {
        let framed = BASE64
            .decode(encoded)
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
        if framed.len() < NONCE_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "ciphertext too short: {} bytes",
                framed.len()
            )));
        }
        let (nonce, ciphertext) = framed.split_at(NONCE_LEN);

        let cipher = XChaCha20Poly1305::new((&self.key).into());
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decryption("authentication failed".into()))
    }
}

// Manual Debug so key material never leaks into logs.
impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionContext(..)")
    }
}
