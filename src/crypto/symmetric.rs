//! Shared-key encryption with a random salt block per message
//!
//! Layout: `salt (16 bytes) || AES-256-GCM ciphertext+tag`.
//!
//! The salt feeds HKDF-SHA256 together with the master key, giving every
//! message its own content key. A content key is used exactly once, so the
//! GCM nonce is fixed at zero and never stored.

use super::keys::{SymmetricKey, KEY_SIZE};
use super::{CryptoError, Decrypter, EncryptedBlob, Encrypter};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

/// One AES block
pub const SALT_SIZE: usize = 16;
const TAG_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const CONTENT_KEY_INFO: &[u8] = b"porta-credential-v1";

/// AES-256-GCM cipher keyed by a shared master key
#[derive(Debug, Clone)]
pub struct SymmetricCipher {
    key: SymmetricKey,
}

impl SymmetricCipher {
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }

    fn cipher_for(&self, salt: &[u8]) -> Result<Aes256Gcm, CryptoError> {
        let mut content_key = Zeroizing::new([0_u8; KEY_SIZE]);
        Hkdf::<Sha256>::new(Some(salt), self.key.as_bytes())
            .expand(CONTENT_KEY_INFO, &mut content_key[..])
            .map_err(|_| CryptoError::KeyDerivation)?;
        Aes256Gcm::new_from_slice(&content_key[..])
            .map_err(|_| CryptoError::InvalidKey("derived key has the wrong length".to_string()))
    }
}

impl Encrypter for SymmetricCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedBlob, CryptoError> {
        let mut salt = [0_u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);

        let ciphertext = self
            .cipher_for(&salt)?
            .encrypt(Nonce::from_slice(&[0_u8; NONCE_SIZE]), plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut output = Vec::with_capacity(SALT_SIZE + ciphertext.len());
        output.extend_from_slice(&salt);
        output.extend_from_slice(&ciphertext);
        Ok(EncryptedBlob::from_bytes(&output))
    }
}

impl Decrypter for SymmetricCipher {
    fn decrypt(&self, blob: &EncryptedBlob) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let bytes = blob.to_bytes()?;
        if bytes.len() < SALT_SIZE + TAG_SIZE {
            return Err(CryptoError::InvalidCiphertext("shorter than salt and tag"));
        }
        let (salt, ciphertext) = bytes.split_at(SALT_SIZE);

        self.cipher_for(salt)?
            .decrypt(Nonce::from_slice(&[0_u8; NONCE_SIZE]), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_symmetric_key;

    fn cipher() -> SymmetricCipher {
        SymmetricCipher::new(generate_symmetric_key())
    }

    #[test]
    fn test_roundtrip_arbitrary_lengths() {
        let cipher = cipher();
        for len in [0_usize, 1, 15, 16, 17, 1000] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let blob = cipher.encrypt(&plaintext).unwrap();
            assert_eq!(&cipher.decrypt(&blob).unwrap()[..], &plaintext[..]);
        }
    }

    #[test]
    fn test_salt_is_prepended_and_fresh() {
        let cipher = cipher();
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a, b);

        let bytes = a.to_bytes().unwrap();
        assert_eq!(bytes.len(), SALT_SIZE + 4 + TAG_SIZE);
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = cipher().encrypt(b"secret").unwrap();
        let err = cipher().decrypt(&blob).unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = cipher();
        let mut bytes = cipher.encrypt(b"secret").unwrap().to_bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let tampered = EncryptedBlob::from_bytes(&bytes);
        assert!(cipher.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_truncated_blob_fails() {
        let truncated = EncryptedBlob::from_bytes(&[0_u8; SALT_SIZE]);
        let err = cipher().decrypt(&truncated).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidCiphertext(_)));
    }
}
