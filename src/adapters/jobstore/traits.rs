//! Job store abstraction
//!
//! This module defines the trait every job store backend implements. The
//! store is the only component mutated by several worker processes at once,
//! so every state transition is atomic on the backend.

use crate::domain::{
    AuthState, EncryptedCredentials, ErrorDetail, JobId, JobState, PortabilityJob, Result,
    WorkerClaim,
};
use async_trait::async_trait;
use std::fmt;
use tokio::io::AsyncRead;

/// Boxed async byte source
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// A staged payload read back from the store
pub struct InputStream {
    /// Payload bytes
    pub reader: ByteReader,

    /// Payload size in bytes
    pub size: u64,
}

impl InputStream {
    pub fn new(reader: ByteReader, size: u64) -> Self {
        Self { reader, size }
    }
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Durable registry of transfer jobs and their staged payloads
///
/// Errors come back as `PortaError::JobStore`: `InvalidState` for illegal
/// transitions, `AlreadyClaimed` for lost claims, `NotFound` and
/// `AlreadyExists` for addressing, and `Io` for storage failures. Only `Io`
/// is worth retrying.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job in the `Created` state
    ///
    /// # Errors
    ///
    /// Returns `JobStoreError::AlreadyExists` if `id` is taken.
    async fn create_job(&self, id: JobId, job: PortabilityJob) -> Result<()>;

    /// Atomically assign an unclaimed job to a worker
    ///
    /// Returns the job as stored after the claim.
    ///
    /// # Errors
    ///
    /// Returns `JobStoreError::AlreadyClaimed` if another worker holds the
    /// job, `JobStoreError::InvalidState` if the job is terminal or its
    /// credentials are not available.
    async fn claim_job(&self, id: JobId, claim: &WorkerClaim) -> Result<PortabilityJob>;

    /// Mark both credential blobs as present and the job ready for claiming
    ///
    /// # Errors
    ///
    /// Returns `JobStoreError::InvalidState` unless both blobs are attached
    /// and the auth state is `Initial`.
    async fn update_job_auth_state_to_creds_available(&self, id: JobId) -> Result<()>;

    /// Store encrypted export and import credentials
    ///
    /// Never changes the worker assignment of a claimed job.
    async fn update_job_with_credentials(
        &self,
        id: JobId,
        credentials: EncryptedCredentials,
    ) -> Result<()>;

    /// Append errors to the job's error list
    async fn add_errors_to_job(&self, id: JobId, errors: Vec<ErrorDetail>) -> Result<()>;

    /// Record a failure reason, appending to an existing one
    async fn add_failure_reason_to_job(&self, id: JobId, reason: &str) -> Result<()>;

    /// Move a claimed job to `InProgress`
    async fn mark_job_as_started(&self, id: JobId) -> Result<()>;

    /// Move the job to a terminal state
    ///
    /// # Errors
    ///
    /// Returns `JobStoreError::InvalidState` if `state` is not terminal or
    /// the job already is.
    async fn mark_job_as_finished(&self, id: JobId, state: JobState) -> Result<()>;

    /// End a non-terminal job as timed out
    async fn mark_job_as_timed_out(&self, id: JobId) -> Result<()>;

    /// Current job record
    ///
    /// # Errors
    ///
    /// Returns `JobStoreError::NotFound` if no such job exists.
    async fn find_job(&self, id: JobId) -> Result<PortabilityJob>;

    /// Oldest unclaimed, non-terminal job in the given auth state
    async fn find_first(&self, auth_state: AuthState) -> Result<Option<JobId>>;

    /// Stage a payload under `key` for the job, replacing any earlier one
    ///
    /// Returns the number of bytes written.
    async fn create_stream(&self, id: JobId, key: &str, stream: ByteReader) -> Result<u64>;

    /// Open a staged payload
    ///
    /// # Errors
    ///
    /// Returns `JobStoreError::StreamNotFound` if nothing is staged under `key`.
    async fn get_stream(&self, id: JobId, key: &str) -> Result<InputStream>;

    /// Delete the job and all its payloads; irreversible
    async fn remove(&self, id: JobId) -> Result<()>;
}
