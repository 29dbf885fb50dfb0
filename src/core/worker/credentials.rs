//! Credential sealing and unsealing
//!
//! Auth data only ever reaches the job store encrypted. The worker turns
//! the two blobs on a claimed job back into typed [`AuthData`].

use crate::crypto::{create_decrypter, create_encrypter, CryptoTransformation, Decrypter, Encrypter};
use crate::domain::{AuthData, EncryptedCredentials, PortabilityJob, PortaError, Result};

/// Decrypted credentials for both sides of a job
#[derive(Debug, Clone)]
pub struct JobCredentials {
    pub export: AuthData,
    pub import: AuthData,
}

/// Opens the encrypted credentials stored on a job
pub struct CredentialDecrypter {
    decrypter: Box<dyn Decrypter>,
}

impl CredentialDecrypter {
    pub fn new(decrypter: Box<dyn Decrypter>) -> Self {
        Self { decrypter }
    }

    /// Builds a decrypter from a configured scheme and key
    ///
    /// # Errors
    ///
    /// Returns `PortaError::Crypto` if the key cannot be decoded.
    pub fn from_key(transformation: CryptoTransformation, encoded_key: &str) -> Result<Self> {
        Ok(Self::new(create_decrypter(transformation, encoded_key)?))
    }

    /// Decrypts both credential blobs of `job`
    ///
    /// # Errors
    ///
    /// Returns `PortaError::Validation` if a blob is missing or does not hold
    /// auth data, and `PortaError::Crypto` if a blob cannot be opened.
    pub fn decrypt(&self, job: &PortabilityJob) -> Result<JobCredentials> {
        let authorization = &job.job_authorization;
        let export_blob = authorization
            .encrypted_export_auth_data
            .as_ref()
            .ok_or_else(|| PortaError::Validation(format!("Job {} has no export credentials", job.id)))?;
        let import_blob = authorization
            .encrypted_import_auth_data
            .as_ref()
            .ok_or_else(|| PortaError::Validation(format!("Job {} has no import credentials", job.id)))?;

        let export = AuthData::from_bytes(&self.decrypter.decrypt(export_blob)?)?;
        let import = AuthData::from_bytes(&self.decrypter.decrypt(import_blob)?)?;
        Ok(JobCredentials { export, import })
    }
}

impl std::fmt::Debug for CredentialDecrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDecrypter").finish_non_exhaustive()
    }
}

/// Seals both sides' auth data for attaching to a job
///
/// # Errors
///
/// Returns `PortaError::Crypto` on any encryption failure; nothing is ever
/// returned unencrypted.
pub fn seal_credentials(
    encrypter: &dyn Encrypter,
    export: &AuthData,
    import: &AuthData,
) -> Result<EncryptedCredentials> {
    Ok(EncryptedCredentials {
        export_auth_data: encrypter.encrypt(&export.to_bytes()?)?,
        import_auth_data: encrypter.encrypt(&import.to_bytes()?)?,
    })
}

/// Seals credentials with a configured scheme and key
pub fn seal_credentials_with_key(
    transformation: CryptoTransformation,
    encoded_key: &str,
    export: &AuthData,
    import: &AuthData,
) -> Result<EncryptedCredentials> {
    let encrypter = create_encrypter(transformation, encoded_key)?;
    seal_credentials(encrypter.as_ref(), export, import)
}
