//! In-memory job store
//!
//! Every check-and-set runs under one async mutex, which gives the same
//! atomicity a database row lock would. Used for tests, single-process
//! deployments and as the reference behavior for other backends.

use super::streams::PayloadStreams;
use super::traits::{ByteReader, InputStream, JobStore};
use crate::domain::{
    AuthState, EncryptedCredentials, ErrorDetail, JobId, JobState, JobStoreError, PortabilityJob,
    Result, WorkerClaim,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Job store holding records in process memory
#[derive(Debug)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<JobId, PortabilityJob>>,
    streams: PayloadStreams,
}

impl InMemoryJobStore {
    /// Creates an empty store with in-memory payload streams
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            streams: PayloadStreams::memory(),
        }
    }

    /// Creates an empty store staging payloads under `stream_dir`
    pub fn with_stream_dir(stream_dir: impl Into<PathBuf>) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            streams: PayloadStreams::disk(stream_dir),
        }
    }

    /// Number of stored jobs
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    /// Applies `change` to a copy of the record and commits it only on success
    async fn update<T, F>(&self, id: JobId, change: F) -> Result<T>
    where
        F: FnOnce(&mut PortabilityJob) -> std::result::Result<T, JobStoreError> + Send,
        T: Send,
    {
        let mut jobs = self.jobs.lock().await;
        let current = jobs.get(&id).ok_or(JobStoreError::NotFound(id))?;

        let mut updated = current.clone();
        let value = change(&mut updated)?;
        jobs.insert(id, updated);
        Ok(value)
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, id: JobId, mut job: PortabilityJob) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&id) {
            return Err(JobStoreError::AlreadyExists(id).into());
        }
        job.prepare_for_insert(id);
        jobs.insert(id, job);

        tracing::debug!(job_id = %id, "Job created");
        Ok(())
    }

    async fn claim_job(&self, id: JobId, claim: &WorkerClaim) -> Result<PortabilityJob> {
        self.update(id, |job| {
            job.claim(claim, Utc::now())?;
            Ok(job.clone())
        })
        .await
    }

    async fn update_job_auth_state_to_creds_available(&self, id: JobId) -> Result<()> {
        self.update(id, |job| job.mark_creds_available()).await
    }

    async fn update_job_with_credentials(
        &self,
        id: JobId,
        credentials: EncryptedCredentials,
    ) -> Result<()> {
        self.update(id, |job| job.attach_credentials(credentials))
            .await
    }

    async fn add_errors_to_job(&self, id: JobId, errors: Vec<ErrorDetail>) -> Result<()> {
        self.update(id, |job| {
            job.add_errors(errors);
            Ok(())
        })
        .await
    }

    async fn add_failure_reason_to_job(&self, id: JobId, reason: &str) -> Result<()> {
        self.update(id, |job| {
            job.add_failure_reason(reason);
            Ok(())
        })
        .await
    }

    async fn mark_job_as_started(&self, id: JobId) -> Result<()> {
        self.update(id, |job| job.start(Utc::now())).await
    }

    async fn mark_job_as_finished(&self, id: JobId, state: JobState) -> Result<()> {
        self.update(id, |job| job.finish(state, Utc::now())).await
    }

    async fn mark_job_as_timed_out(&self, id: JobId) -> Result<()> {
        self.update(id, |job| job.time_out(Utc::now())).await
    }

    async fn find_job(&self, id: JobId) -> Result<PortabilityJob> {
        self.jobs
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(id).into())
    }

    async fn find_first(&self, auth_state: AuthState) -> Result<Option<JobId>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .values()
            .filter(|job| job.is_claimable_in(auth_state))
            .min_by_key(|job| (job.created_at, job.id))
            .map(|job| job.id))
    }

    async fn create_stream(&self, id: JobId, key: &str, stream: ByteReader) -> Result<u64> {
        // Held across the write so a concurrent remove cannot orphan the payload
        let jobs = self.jobs.lock().await;
        if !jobs.contains_key(&id) {
            return Err(JobStoreError::NotFound(id).into());
        }
        self.streams.write(id, key, stream).await
    }

    async fn get_stream(&self, id: JobId, key: &str) -> Result<InputStream> {
        self.streams.open(id, key).await
    }

    async fn remove(&self, id: JobId) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.remove(&id).is_none() {
            return Err(JobStoreError::NotFound(id).into());
        }
        self.streams.remove_all(id).await?;
        drop(jobs);

        tracing::debug!(job_id = %id, "Job removed");
        Ok(())
    }
}
