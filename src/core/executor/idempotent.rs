//! In-memory idempotent import executor
//!
//! The memo table lives for one execution of one job and is never shared.
//! It does not survive a worker crash: a restarted attempt starts empty and
//! may re-create objects the crashed attempt already created.

use super::{IdempotentImportExecutor, ImportOperation};
use crate::adapters::jobstore::JobStore;
use crate::domain::{ErrorDetail, JobId, PortaError, Result};
use crate::log_item_failure;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Outcome {
    Created(String),
    Failed(ErrorDetail),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Swallow,
    Throw,
}

/// Executor whose memo table is held in process memory
pub struct InMemoryIdempotentImportExecutor {
    job_id: JobId,
    job_store: Arc<dyn JobStore>,
    outcomes: Mutex<HashMap<String, Outcome>>,
    errors: Mutex<Vec<ErrorDetail>>,
    // One lock per key so concurrent calls for the same item run it once
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InMemoryIdempotentImportExecutor {
    /// Creates an empty executor for one job
    pub fn new(job_id: JobId, job_store: Arc<dyn JobStore>) -> Self {
        Self {
            job_id,
            job_store,
            outcomes: Mutex::new(HashMap::new()),
            errors: Mutex::new(Vec::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    async fn key_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.in_flight
            .lock()
            .await
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    async fn execute(
        &self,
        id: &str,
        name: &str,
        operation: ImportOperation<'_>,
        mode: Mode,
    ) -> Result<Option<String>> {
        let key_lock = self.key_lock(id).await;
        let _guard = key_lock.lock().await;

        let cached = self.outcomes.lock().await.get(id).cloned();
        match cached {
            Some(Outcome::Created(value)) => {
                tracing::trace!(job_id = %self.job_id, item_id = id, "Using cached import result");
                return Ok(Some(value));
            }
            Some(Outcome::Failed(detail)) => {
                return match mode {
                    Mode::Swallow => Ok(None),
                    Mode::Throw => Err(PortaError::Transfer(format!(
                        "Item {id} ({name}) previously failed: {}",
                        detail.message
                    ))),
                };
            }
            None => {}
        }

        match operation.await {
            Ok(value) => {
                self.outcomes
                    .lock()
                    .await
                    .insert(id.to_string(), Outcome::Created(value.clone()));
                Ok(Some(value))
            }
            Err(err) => {
                let detail = ErrorDetail::from_error(id, name, &err);
                self.record(detail.clone()).await;

                if !err.is_recoverable() {
                    tracing::error!(
                        job_id = %self.job_id,
                        item_id = id,
                        error = %err,
                        "Unrecoverable item failure"
                    );
                    return Err(err);
                }

                self.outcomes
                    .lock()
                    .await
                    .insert(id.to_string(), Outcome::Failed(detail));

                match mode {
                    Mode::Swallow => {
                        log_item_failure!(self.job_id, id, &err);
                        Ok(None)
                    }
                    Mode::Throw => Err(err),
                }
            }
        }
    }

    async fn record(&self, detail: ErrorDetail) {
        self.errors.lock().await.push(detail.clone());
        if let Err(e) = self.job_store.add_errors_to_job(self.job_id, vec![detail]).await {
            tracing::warn!(
                job_id = %self.job_id,
                error = %e,
                "Failed to record item error on job"
            );
        }
    }
}

#[async_trait]
impl IdempotentImportExecutor for InMemoryIdempotentImportExecutor {
    async fn execute_and_swallow_io_errors<'a>(
        &'a self,
        id: &'a str,
        name: &'a str,
        operation: ImportOperation<'a>,
    ) -> Result<Option<String>> {
        self.execute(id, name, operation, Mode::Swallow).await
    }

    async fn execute_or_throw<'a>(
        &'a self,
        id: &'a str,
        name: &'a str,
        operation: ImportOperation<'a>,
    ) -> Result<String> {
        self.execute(id, name, operation, Mode::Throw)
            .await?
            .ok_or_else(|| PortaError::Transfer(format!("Item {id} ({name}) has no result")))
    }

    async fn get_cached_value(&self, id: &str) -> Result<String> {
        self.lookup(id).await.ok_or_else(|| {
            PortaError::NotFound(format!(
                "No imported value for key '{id}' in job {}",
                self.job_id
            ))
        })
    }

    async fn lookup(&self, id: &str) -> Option<String> {
        match self.outcomes.lock().await.get(id) {
            Some(Outcome::Created(value)) => Some(value.clone()),
            _ => None,
        }
    }

    async fn is_key_cached(&self, id: &str) -> bool {
        self.lookup(id).await.is_some()
    }

    async fn errors(&self) -> Vec<ErrorDetail> {
        self.errors.lock().await.clone()
    }

    fn job_id(&self) -> JobId {
        self.job_id
    }
}

impl std::fmt::Debug for InMemoryIdempotentImportExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIdempotentImportExecutor")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}
