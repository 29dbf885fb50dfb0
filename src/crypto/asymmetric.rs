//! X25519 sealed box
//!
//! Layout: `ephemeral public key (32 bytes) || AES-256-GCM ciphertext+tag`.
//!
//! The sender generates an ephemeral key pair, agrees on a shared secret
//! with the recipient's public key and derives the content key with
//! HKDF-SHA256 over both public keys. Only the holder of the recipient's
//! private key can reproduce it.

use super::keys::{decode_public_key, KeyPair, KEY_SIZE};
use super::{CryptoError, Decrypter, EncryptedBlob, Encrypter};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret};
use zeroize::Zeroizing;

const TAG_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const SEAL_INFO: &[u8] = b"porta-sealed-box-v1";

fn content_cipher(
    shared: &SharedSecret,
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> Result<Aes256Gcm, CryptoError> {
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKey(
            "public key is a low-order point".to_string(),
        ));
    }

    let mut salt = [0_u8; 2 * KEY_SIZE];
    salt[..KEY_SIZE].copy_from_slice(ephemeral.as_bytes());
    salt[KEY_SIZE..].copy_from_slice(recipient.as_bytes());

    let mut content_key = Zeroizing::new([0_u8; KEY_SIZE]);
    Hkdf::<Sha256>::new(Some(&salt), shared.as_bytes())
        .expand(SEAL_INFO, &mut content_key[..])
        .map_err(|_| CryptoError::KeyDerivation)?;
    Aes256Gcm::new_from_slice(&content_key[..])
        .map_err(|_| CryptoError::InvalidKey("derived key has the wrong length".to_string()))
}

/// Seals payloads for one recipient public key
#[derive(Debug, Clone)]
pub struct SealedBoxEncrypter {
    recipient: PublicKey,
}

impl SealedBoxEncrypter {
    pub fn new(recipient: PublicKey) -> Self {
        Self { recipient }
    }

    /// Builds an encrypter from a base64url public key
    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        decode_public_key(encoded).map(Self::new)
    }
}

impl Encrypter for SealedBoxEncrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedBlob, CryptoError> {
        let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = PublicKey::from(&ephemeral_secret);
        let shared = ephemeral_secret.diffie_hellman(&self.recipient);

        let ciphertext = content_cipher(&shared, &ephemeral_public, &self.recipient)?
            .encrypt(Nonce::from_slice(&[0_u8; NONCE_SIZE]), plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut output = Vec::with_capacity(KEY_SIZE + ciphertext.len());
        output.extend_from_slice(ephemeral_public.as_bytes());
        output.extend_from_slice(&ciphertext);
        Ok(EncryptedBlob::from_bytes(&output))
    }
}

/// Opens sealed boxes addressed to a key pair
#[derive(Debug, Clone)]
pub struct SealedBoxDecrypter {
    key_pair: KeyPair,
}

impl SealedBoxDecrypter {
    pub fn new(key_pair: KeyPair) -> Self {
        Self { key_pair }
    }
}

impl Decrypter for SealedBoxDecrypter {
    fn decrypt(&self, blob: &EncryptedBlob) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let bytes = blob.to_bytes()?;
        if bytes.len() < KEY_SIZE + TAG_SIZE {
            return Err(CryptoError::InvalidCiphertext(
                "shorter than ephemeral key and tag",
            ));
        }
        let (ephemeral_bytes, ciphertext) = bytes.split_at(KEY_SIZE);

        let mut ephemeral = [0_u8; KEY_SIZE];
        ephemeral.copy_from_slice(ephemeral_bytes);
        let ephemeral = PublicKey::from(ephemeral);

        let shared = self.key_pair.private_key().diffie_hellman(&ephemeral);
        content_cipher(&shared, &ephemeral, self.key_pair.public_key())?
            .decrypt(Nonce::from_slice(&[0_u8; NONCE_SIZE]), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key_pair;

    #[test]
    fn test_seal_and_open() {
        let pair = generate_key_pair();
        let encrypter = SealedBoxEncrypter::new(*pair.public_key());
        let decrypter = SealedBoxDecrypter::new(pair);

        let blob = encrypter.encrypt(b"access-token").unwrap();
        assert_eq!(&decrypter.decrypt(&blob).unwrap()[..], b"access-token");
    }

    #[test]
    fn test_each_seal_uses_a_fresh_ephemeral_key() {
        let pair = generate_key_pair();
        let encrypter = SealedBoxEncrypter::new(*pair.public_key());

        let a = encrypter.encrypt(b"x").unwrap().to_bytes().unwrap();
        let b = encrypter.encrypt(b"x").unwrap().to_bytes().unwrap();
        assert_ne!(a[..KEY_SIZE], b[..KEY_SIZE]);
    }

    #[test]
    fn test_other_recipient_cannot_open() {
        let intended = generate_key_pair();
        let other = generate_key_pair();
        let blob = SealedBoxEncrypter::new(*intended.public_key())
            .encrypt(b"secret")
            .unwrap();

        let err = SealedBoxDecrypter::new(other).decrypt(&blob).unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt));
    }

    #[test]
    fn test_low_order_recipient_is_rejected() {
        let encrypter = SealedBoxEncrypter::new(PublicKey::from([0_u8; KEY_SIZE]));
        let err = encrypter.encrypt(b"secret").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }
}
