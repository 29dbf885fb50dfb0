//! Credential encryption at rest
//!
//! Auth data is sealed before it is attached to a job and opened only on
//! the worker that claimed the job. Two transformations are supported:
//!
//! - [`CryptoTransformation::Aes256Gcm`]: a shared 32-byte master key. Each
//!   message gets a fresh random salt block which is prepended to the
//!   ciphertext, so no IV is stored anywhere else.
//! - [`CryptoTransformation::X25519`]: a sealed box for the worker's public
//!   key. Sealing needs only the public key; opening needs the private key.
//!
//! Every failure surfaces as a [`CryptoError`]. There is no plaintext
//! fallback.
//!
//! # Example
//!
//! ```rust
//! use porta::crypto::{create_decrypter, create_encrypter, generate_symmetric_key, CryptoTransformation};
//!
//! # fn main() -> Result<(), porta::crypto::CryptoError> {
//! let key = generate_symmetric_key().to_encoded();
//! let encrypter = create_encrypter(CryptoTransformation::Aes256Gcm, &key)?;
//! let decrypter = create_decrypter(CryptoTransformation::Aes256Gcm, &key)?;
//!
//! let blob = encrypter.encrypt(b"refresh-token")?;
//! assert_eq!(&decrypter.decrypt(&blob)?[..], b"refresh-token");
//! # Ok(())
//! # }
//! ```

pub mod asymmetric;
pub mod keys;
pub mod symmetric;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

pub use asymmetric::{SealedBoxDecrypter, SealedBoxEncrypter};
pub use keys::{generate_key_pair, generate_symmetric_key, KeyPair, SymmetricKey};
pub use symmetric::SymmetricCipher;

/// Cryptographic failures
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(&'static str),

    #[error("encryption failure")]
    Encrypt,

    #[error("decryption failure")]
    Decrypt,

    #[error("key derivation failure")]
    KeyDerivation,

    #[error("invalid encoding: {0}")]
    Encoding(String),
}

/// Authenticated ciphertext in its persisted text form (unpadded base64url)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedBlob(String);

impl EncryptedBlob {
    /// Encodes raw ciphertext bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wraps an already-encoded blob as read from storage
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Decodes the raw ciphertext bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        URL_SAFE_NO_PAD
            .decode(self.0.as_bytes())
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seals plaintext into an [`EncryptedBlob`]
pub trait Encrypter: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedBlob, CryptoError>;
}

/// Opens an [`EncryptedBlob`]; the plaintext is zeroed when dropped
pub trait Decrypter: Send + Sync {
    fn decrypt(&self, blob: &EncryptedBlob) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// Supported encryption schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CryptoTransformation {
    /// Shared-key AES-256-GCM with a per-message salt
    #[default]
    #[serde(rename = "aes256-gcm")]
    Aes256Gcm,

    /// X25519 sealed box
    #[serde(rename = "x25519")]
    X25519,
}

impl CryptoTransformation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CryptoTransformation::Aes256Gcm => "aes256-gcm",
            CryptoTransformation::X25519 => "x25519",
        }
    }

    pub fn is_asymmetric(&self) -> bool {
        matches!(self, CryptoTransformation::X25519)
    }
}

impl fmt::Display for CryptoTransformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CryptoTransformation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aes256-gcm" | "aes" | "symmetric" => Ok(CryptoTransformation::Aes256Gcm),
            "x25519" | "asymmetric" => Ok(CryptoTransformation::X25519),
            other => Err(format!(
                "Unknown crypto transformation '{other}' (expected aes256-gcm or x25519)"
            )),
        }
    }
}

/// Builds an encrypter
///
/// `encoded_key` is the base64url master key for `Aes256Gcm` and the
/// recipient's public key for `X25519`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKey` or `CryptoError::Encoding` if the key
/// cannot be decoded.
pub fn create_encrypter(
    transformation: CryptoTransformation,
    encoded_key: &str,
) -> Result<Box<dyn Encrypter>, CryptoError> {
    match transformation {
        CryptoTransformation::Aes256Gcm => Ok(Box::new(SymmetricCipher::new(
            SymmetricKey::from_encoded(encoded_key)?,
        ))),
        CryptoTransformation::X25519 => Ok(Box::new(SealedBoxEncrypter::from_encoded(
            encoded_key,
        )?)),
    }
}

/// Builds a decrypter
///
/// `encoded_key` is the base64url master key for `Aes256Gcm` and the
/// private key for `X25519`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKey` or `CryptoError::Encoding` if the key
/// cannot be decoded.
pub fn create_decrypter(
    transformation: CryptoTransformation,
    encoded_key: &str,
) -> Result<Box<dyn Decrypter>, CryptoError> {
    match transformation {
        CryptoTransformation::Aes256Gcm => Ok(Box::new(SymmetricCipher::new(
            SymmetricKey::from_encoded(encoded_key)?,
        ))),
        CryptoTransformation::X25519 => Ok(Box::new(SealedBoxDecrypter::new(
            KeyPair::from_encoded_private(encoded_key)?,
        ))),
    }
}

/// Public key a worker advertises when it claims a job, if the scheme has one
pub fn advertised_public_key(
    transformation: CryptoTransformation,
    encoded_key: &str,
) -> Result<Option<String>, CryptoError> {
    match transformation {
        CryptoTransformation::Aes256Gcm => Ok(None),
        CryptoTransformation::X25519 => Ok(Some(
            KeyPair::from_encoded_private(encoded_key)?.public_key_encoded(),
        )),
    }
}
