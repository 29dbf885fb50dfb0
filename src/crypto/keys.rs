//! Key material generation and encoding

use super::CryptoError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub(crate) const KEY_SIZE: usize = 32;

fn decode_key(encoded: &str, what: &str) -> Result<[u8; KEY_SIZE], CryptoError> {
    let mut bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim().as_bytes())
        .map_err(|e| CryptoError::Encoding(format!("{what}: {e}")))?;
    if bytes.len() != KEY_SIZE {
        let len = bytes.len();
        bytes.zeroize();
        return Err(CryptoError::InvalidKey(format!(
            "{what} must be {KEY_SIZE} bytes, got {len}"
        )));
    }
    let mut key = [0_u8; KEY_SIZE];
    key.copy_from_slice(&bytes);
    bytes.zeroize();
    Ok(key)
}

/// A 32-byte AES-256 master key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decodes a base64url key
    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        decode_key(encoded, "symmetric key").map(Self)
    }

    pub fn to_encoded(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// An X25519 key pair; the private half is zeroed on drop
#[derive(Clone)]
pub struct KeyPair {
    private: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    pub fn from_private(private: StaticSecret) -> Self {
        let public = PublicKey::from(&private);
        Self { private, public }
    }

    /// Decodes a base64url private key and derives its public half
    pub fn from_encoded_private(encoded: &str) -> Result<Self, CryptoError> {
        let mut bytes = decode_key(encoded, "private key")?;
        let private = StaticSecret::from(bytes);
        bytes.zeroize();
        Ok(Self::from_private(private))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn private_key(&self) -> &StaticSecret {
        &self.private
    }

    pub fn public_key_encoded(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.public.as_bytes())
    }

    pub fn private_key_encoded(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.private.to_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key_encoded())
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Decodes a base64url X25519 public key
pub fn decode_public_key(encoded: &str) -> Result<PublicKey, CryptoError> {
    decode_key(encoded, "public key").map(PublicKey::from)
}

/// Generates a fresh random AES-256 master key
pub fn generate_symmetric_key() -> SymmetricKey {
    let mut key = [0_u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    SymmetricKey(key)
}

/// Generates a fresh X25519 key pair
pub fn generate_key_pair() -> KeyPair {
    KeyPair::from_private(StaticSecret::random_from_rng(OsRng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_key_encoding_roundtrip() {
        let key = generate_symmetric_key();
        let decoded = SymmetricKey::from_encoded(&key.to_encoded()).unwrap();
        assert_eq!(decoded.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_symmetric_key_wrong_length() {
        let encoded = URL_SAFE_NO_PAD.encode([7_u8; 16]);
        let err = SymmetricKey::from_encoded(&encoded).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[test]
    fn test_key_pair_private_roundtrip() {
        let pair = generate_key_pair();
        let restored = KeyPair::from_encoded_private(&pair.private_key_encoded()).unwrap();
        assert_eq!(restored.public_key_encoded(), pair.public_key_encoded());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = generate_symmetric_key();
        assert!(!format!("{key:?}").contains(&key.to_encoded()));

        let pair = generate_key_pair();
        assert!(!format!("{pair:?}").contains(&pair.private_key_encoded()));
    }
}
