//! Password-based file encryption
//!
//! Envelope layout: `salt (16) || nonce (12) || ciphertext || tag (16)`.
//! The key is PBKDF2-HMAC-SHA256 over the password and the per-file salt;
//! the cipher is AES-256-GCM with no associated data. Stored files hold
//! the base64 text of the envelope.

use crate::config::MIN_PBKDF2_ITERATIONS;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const KEY_LEN: usize = 32;
pub const TAG_LEN: usize = 16;

/// Shortest well-formed envelope (empty plaintext)
pub const MIN_ENVELOPE_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Tag mismatch, truncated envelope or undecodable text.
    /// Wrong passwords and corruption are indistinguishable.
    #[error("authentication failed")]
    Authentication,

    #[error("encryption failed")]
    Encryption,
}

impl From<CryptoError> for crate::AppError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Authentication => crate::AppError::Authentication,
            CryptoError::Encryption => crate::AppError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "encryption failed",
            )),
        }
    }
}

/// Password cipher with a fixed key-derivation cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCipher {
    iterations: u32,
}

impl Default for PasswordCipher {
    fn default() -> Self {
        Self::new(MIN_PBKDF2_ITERATIONS)
    }
}

impl PasswordCipher {
    /// Iteration counts below the supported minimum are raised to it
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(MIN_PBKDF2_ITERATIONS),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn derive_key(&self, password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, self.iterations, key.as_mut_slice());
        key
    }

    /// Encrypt `plaintext` into a binary envelope.
    /// Salt and nonce are fresh random values on every call.
    pub fn seal(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let key = self.derive_key(password, &salt);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encryption)?;

        let mut envelope = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&salt);
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);

        Ok(envelope)
    }

    /// Decrypt and verify a binary envelope
    pub fn open(&self, envelope: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
        if envelope.len() < MIN_ENVELOPE_LEN {
            return Err(CryptoError::Authentication);
        }

        let (salt, rest) = envelope.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let key = self.derive_key(password, salt);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice()));

        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Authentication)
    }

    /// Encrypt into the base64 text stored on disk
    pub fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
        let envelope = self.seal(plaintext, password)?;
        Ok(STANDARD.encode(envelope).into_bytes())
    }

    /// Decrypt the base64 text stored on disk
    pub fn decrypt(&self, stored: &[u8], password: &str) -> Result<Vec<u8>, CryptoError> {
        let text = std::str::from_utf8(stored).map_err(|_| CryptoError::Authentication)?;
        let envelope = STANDARD
            .decode(text.trim())
            .map_err(|_| CryptoError::Authentication)?;
        self.open(&envelope, password)
    }
}
