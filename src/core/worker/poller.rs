//! Claim-and-poll work queue on top of the job store

use crate::adapters::jobstore::JobStore;
use crate::domain::{AuthState, PortaError, PortabilityJob, Result, WorkerClaim};
use crate::log_job_claimed;
use std::sync::Arc;

/// Finds a ready job and claims it for this worker
pub struct JobPoller {
    job_store: Arc<dyn JobStore>,
    claim: WorkerClaim,
}

impl JobPoller {
    pub fn new(job_store: Arc<dyn JobStore>, claim: WorkerClaim) -> Self {
        Self { job_store, claim }
    }

    pub fn claim(&self) -> &WorkerClaim {
        &self.claim
    }

    /// Try to claim one job whose credentials are available
    ///
    /// Returns `Ok(None)` when nothing is ready or another worker won the
    /// race for the job found.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn poll_once(&self) -> Result<Option<PortabilityJob>> {
        let Some(job_id) = self.job_store.find_first(AuthState::CredsAvailable).await? else {
            return Ok(None);
        };

        match self.job_store.claim_job(job_id, &self.claim).await {
            Ok(job) => {
                log_job_claimed!(job_id, self.claim.worker_id);
                Ok(Some(job))
            }
            Err(PortaError::JobStore(e)) if e.is_contention() || e.is_state_error() => {
                tracing::debug!(
                    job_id = %job_id,
                    worker_id = %self.claim.worker_id,
                    reason = %e,
                    "Lost claim race; continuing to poll"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::jobstore::InMemoryJobStore;
    use crate::crypto::EncryptedBlob;
    use crate::domain::{DataVertical, EncryptedCredentials, JobId, WorkerId};

    async fn ready_job(store: &InMemoryJobStore) -> JobId {
        let id = JobId::new();
        store
            .create_job(id, PortabilityJob::new(DataVertical::Photos, "a", "b"))
            .await
            .unwrap();
        store
            .update_job_with_credentials(
                id,
                EncryptedCredentials {
                    export_auth_data: EncryptedBlob::from_encoded("ZQ"),
                    import_auth_data: EncryptedBlob::from_encoded("aQ"),
                },
            )
            .await
            .unwrap();
        store.update_job_auth_state_to_creds_available(id).await.unwrap();
        id
    }

    fn poller(store: Arc<InMemoryJobStore>, worker: &str) -> JobPoller {
        JobPoller::new(
            store,
            WorkerClaim::new(WorkerId::new(worker).unwrap()).with_public_key("pk"),
        )
    }

    #[tokio::test]
    async fn test_poll_claims_ready_job() {
        let store = Arc::new(InMemoryJobStore::new());
        let id = ready_job(&store).await;

        let job = poller(store.clone(), "w1").poll_once().await.unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.worker_id().unwrap().as_str(), "w1");
        assert_eq!(job.job_authorization.worker_public_key.as_deref(), Some("pk"));

        // Nothing left to claim
        assert!(poller(store, "w2").poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_poll_empty_store() {
        let store = Arc::new(InMemoryJobStore::new());
        assert!(poller(store, "w1").poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_pollers_claim_once() {
        let store = Arc::new(InMemoryJobStore::new());
        ready_job(&store).await;

        let a = poller(store.clone(), "w1");
        let b = poller(store.clone(), "w2");
        let (ra, rb) = tokio::join!(a.poll_once(), b.poll_once());
        let claimed = [ra.unwrap(), rb.unwrap()].into_iter().flatten().count();
        assert_eq!(claimed, 1);
    }
}
