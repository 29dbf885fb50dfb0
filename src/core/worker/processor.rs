//! Drives one claimed job to a terminal state

use super::credentials::{CredentialDecrypter, JobCredentials};
use crate::adapters::jobstore::JobStore;
use crate::adapters::transfer::{Exporter, Importer, TransferRegistry};
use crate::core::copier::{CopyOutcome, PortabilityCopier};
use crate::core::executor::InMemoryIdempotentImportExecutor;
use crate::domain::{JobId, JobState, PortaError, PortabilityJob, Result};
use crate::log_job_finished;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Attempts per job store call when recording a job's outcome
const MAX_STORE_ATTEMPTS: u32 = 5;
const STORE_RETRY_DELAY: Duration = Duration::from_millis(50);

struct PreparedJob {
    exporter: Arc<dyn Exporter>,
    importer: Arc<dyn Importer>,
    credentials: JobCredentials,
}

/// Runs claimed jobs
pub struct JobProcessor {
    job_store: Arc<dyn JobStore>,
    registry: Arc<TransferRegistry>,
    credentials: Arc<CredentialDecrypter>,
    copier: PortabilityCopier,
}

impl JobProcessor {
    pub fn new(
        job_store: Arc<dyn JobStore>,
        registry: Arc<TransferRegistry>,
        credentials: Arc<CredentialDecrypter>,
        copier: PortabilityCopier,
    ) -> Self {
        Self {
            job_store,
            registry,
            credentials,
            copier,
        }
    }

    /// Process a job this worker has claimed
    ///
    /// Marks the job started, opens its credentials, resolves adapters and
    /// runs the copier with a fresh executor. Setup failures (credentials,
    /// crypto, unknown adapters) end the job in `Error` with a failure
    /// reason rather than returning an error.
    ///
    /// Returns the job's final state.
    ///
    /// # Errors
    ///
    /// Job store failures propagate.
    pub async fn process(&self, job_id: JobId, shutdown: &watch::Receiver<bool>) -> Result<JobState> {
        let start_time = Instant::now();

        self.job_store.mark_job_as_started(job_id).await?;
        let job = self.job_store.find_job(job_id).await?;
        tracing::info!(
            job_id = %job_id,
            vertical = %job.data_vertical,
            export_service = %job.export_service,
            import_service = %job.import_service,
            "Processing job"
        );

        let prepared = match self.prepare(&job) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Job setup failed");
                let state = self
                    .finish(job_id, CopyOutcome::failed("job setup failed", Some(e.to_string())))
                    .await?;
                log_job_finished!(job_id, state, 0, start_time.elapsed());
                return Ok(state);
            }
        };

        let executor = InMemoryIdempotentImportExecutor::new(job_id, self.job_store.clone());
        let (outcome, summary) = self
            .copier
            .copy(
                prepared.exporter.as_ref(),
                prepared.importer.as_ref(),
                &prepared.credentials.export,
                &prepared.credentials.import,
                job_id,
                &executor,
                shutdown,
            )
            .await;

        let state = self.finish(job_id, outcome).await?;
        log_job_finished!(job_id, state, summary.errors.len(), start_time.elapsed());
        Ok(state)
    }

    fn prepare(&self, job: &PortabilityJob) -> Result<PreparedJob> {
        let credentials = self.credentials.decrypt(job)?;
        let exporter = self.registry.exporter(&job.export_service, job.data_vertical)?;
        let importer = self.registry.importer(&job.import_service, job.data_vertical)?;
        Ok(PreparedJob {
            exporter,
            importer,
            credentials,
        })
    }

    /// Records the outcome on the job and returns its final state
    async fn finish(&self, job_id: JobId, outcome: CopyOutcome) -> Result<JobState> {
        if let CopyOutcome::Failed { reason, error } = &outcome {
            let current = self
                .retry_io(job_id, || self.job_store.find_job(job_id))
                .await?;
            if current.is_terminal() {
                tracing::warn!(
                    job_id = %job_id,
                    actual = %current.state,
                    reason = %reason,
                    "Job was already terminal, failure reason dropped"
                );
                return Ok(current.state);
            }

            let reason = match error {
                Some(error) => format!("{reason}: {error}"),
                None => reason.clone(),
            };
            self.retry_io(job_id, || {
                self.job_store.add_failure_reason_to_job(job_id, &reason)
            })
            .await?;
        }

        let Some(state) = outcome.final_state() else {
            return Ok(self.job_store.find_job(job_id).await?.state);
        };

        match self
            .retry_io(job_id, || self.job_store.mark_job_as_finished(job_id, state))
            .await
        {
            Ok(()) => Ok(state),
            // Ended externally while the last page was in flight
            Err(PortaError::JobStore(e)) if e.is_state_error() => {
                let current = self.job_store.find_job(job_id).await?.state;
                tracing::warn!(
                    job_id = %job_id,
                    wanted = %state,
                    actual = %current,
                    "Job was already terminal"
                );
                Ok(current)
            }
            Err(e) => Err(e),
        }
    }

    /// Repeats a job store call while it fails with a storage error
    ///
    /// Claims are never released; a lost terminal write strands the job.
    async fn retry_io<T, F, Fut>(&self, job_id: JobId, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(PortaError::JobStore(ref e)) if e.is_io() && attempt < MAX_STORE_ATTEMPTS => {
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        error = %e,
                        "Job store call failed, retrying"
                    );
                    tokio::time::sleep(STORE_RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl std::fmt::Debug for JobProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobProcessor")
            .field("registry", &self.registry)
            .field("copier", &self.copier)
            .finish_non_exhaustive()
    }
}
