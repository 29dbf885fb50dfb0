//! Integration tests for credential encryption
//!
//! These tests verify that:
//! - Sealed credentials open only with the matching key
//! - Tampered blobs are rejected instead of returning garbage
//! - Each encryption of the same plaintext differs

use porta::core::worker::{seal_credentials_with_key, CredentialDecrypter};
use porta::crypto::{
    create_decrypter, create_encrypter, generate_key_pair, generate_symmetric_key,
    CryptoTransformation, EncryptedBlob,
};
use porta::domain::{AuthData, DataVertical, PortaError, PortabilityJob};
use test_case::test_case;

fn keys(transformation: CryptoTransformation) -> (String, String) {
    match transformation {
        CryptoTransformation::Aes256Gcm => {
            let key = generate_symmetric_key().to_encoded();
            (key.clone(), key)
        }
        CryptoTransformation::X25519 => {
            let pair = generate_key_pair();
            (pair.public_key_encoded(), pair.private_key_encoded())
        }
    }
}

#[test_case(CryptoTransformation::Aes256Gcm ; "symmetric")]
#[test_case(CryptoTransformation::X25519 ; "asymmetric")]
fn test_job_credentials_roundtrip(transformation: CryptoTransformation) {
    let (seal_key, open_key) = keys(transformation);
    let export = AuthData::tokens_and_url(
        "access",
        Some("refresh".to_string()),
        Some("https://auth.example.com/token".to_string()),
    );
    let import = AuthData::token("import-key");

    let mut job = PortabilityJob::new(DataVertical::Photos, "source", "archive");
    job.attach_credentials(seal_credentials_with_key(transformation, &seal_key, &export, &import).unwrap())
        .unwrap();

    let opened = CredentialDecrypter::from_key(transformation, &open_key)
        .unwrap()
        .decrypt(&job)
        .unwrap();
    assert_eq!(opened.export.bearer_token(), "access");
    assert_eq!(opened.import.bearer_token(), "import-key");
}

#[test_case(CryptoTransformation::Aes256Gcm ; "symmetric")]
#[test_case(CryptoTransformation::X25519 ; "asymmetric")]
fn test_wrong_key_fails(transformation: CryptoTransformation) {
    let (seal_key, _) = keys(transformation);
    let (_, other_open_key) = keys(transformation);

    let blob = create_encrypter(transformation, &seal_key)
        .unwrap()
        .encrypt(b"secret")
        .unwrap();
    let result = create_decrypter(transformation, &other_open_key)
        .unwrap()
        .decrypt(&blob);
    assert!(result.is_err());
}

#[test_case(CryptoTransformation::Aes256Gcm ; "symmetric")]
#[test_case(CryptoTransformation::X25519 ; "asymmetric")]
fn test_tampered_blob_is_rejected(transformation: CryptoTransformation) {
    let (seal_key, open_key) = keys(transformation);
    let blob = create_encrypter(transformation, &seal_key)
        .unwrap()
        .encrypt(b"refresh-token")
        .unwrap();

    let mut bytes = blob.to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let tampered = EncryptedBlob::from_bytes(&bytes);

    let decrypter = create_decrypter(transformation, &open_key).unwrap();
    assert!(decrypter.decrypt(&tampered).is_err());
    assert!(decrypter.decrypt(&EncryptedBlob::from_bytes(&bytes[..4])).is_err());
}

#[test]
fn test_encryption_is_randomized() {
    let key = generate_symmetric_key().to_encoded();
    let encrypter = create_encrypter(CryptoTransformation::Aes256Gcm, &key).unwrap();

    let a = encrypter.encrypt(b"same plaintext").unwrap();
    let b = encrypter.encrypt(b"same plaintext").unwrap();
    assert_ne!(a, b);
    assert!(!a.as_str().contains("same"));
}

#[test]
fn test_decrypter_error_maps_to_crypto_error() {
    let key = generate_symmetric_key().to_encoded();
    let other = generate_symmetric_key().to_encoded();
    let mut job = PortabilityJob::new(DataVertical::Videos, "source", "archive");
    job.attach_credentials(
        seal_credentials_with_key(
            CryptoTransformation::Aes256Gcm,
            &key,
            &AuthData::token("e"),
            &AuthData::token("i"),
        )
        .unwrap(),
    )
    .unwrap();

    let err = CredentialDecrypter::from_key(CryptoTransformation::Aes256Gcm, &other)
        .unwrap()
        .decrypt(&job)
        .unwrap_err();
    assert!(matches!(err, PortaError::Crypto(_)));
    assert!(!err.is_recoverable());
}
