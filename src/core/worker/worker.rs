//! The worker loop: poll, claim, process, repeat

use super::poller::JobPoller;
use super::processor::JobProcessor;
use crate::domain::{JobState, Result};
use std::time::Duration;
use tokio::sync::watch;

/// Worker loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Pause between polls that found nothing
    pub poll_interval: Duration,

    /// Stop after this many jobs (0 = run until shutdown)
    pub max_jobs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            max_jobs: 0,
        }
    }
}

/// Jobs handled by one worker run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub claimed: u64,
    pub completed: u64,
    pub failed: u64,
    pub canceled: u64,
}

impl WorkerStats {
    fn record(&mut self, state: JobState) {
        match state {
            JobState::Complete => self.completed += 1,
            JobState::Canceled => self.canceled += 1,
            _ => self.failed += 1,
        }
    }
}

/// Processes at most one job at a time until shutdown
pub struct Worker {
    poller: JobPoller,
    processor: JobProcessor,
    settings: WorkerSettings,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(
        poller: JobPoller,
        processor: JobProcessor,
        settings: WorkerSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            poller,
            processor,
            settings,
            shutdown,
        }
    }

    /// Run until shutdown is signalled or `max_jobs` jobs were handled
    ///
    /// Poll failures are logged and retried after the poll interval. A job
    /// whose processing fails with a store error is counted as failed; the
    /// loop moves on.
    pub async fn run(&self) -> Result<WorkerStats> {
        let mut stats = WorkerStats::default();
        let mut shutdown = self.shutdown.clone();
        let worker_id = &self.poller.claim().worker_id;

        tracing::info!(
            worker_id = %worker_id,
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            max_jobs = self.settings.max_jobs,
            "Worker started"
        );

        loop {
            if *shutdown.borrow() {
                tracing::info!(worker_id = %worker_id, "Shutdown requested; worker stopping");
                break;
            }
            if self.settings.max_jobs > 0 && stats.claimed >= self.settings.max_jobs {
                tracing::info!(worker_id = %worker_id, jobs = stats.claimed, "Job limit reached");
                break;
            }

            match self.poller.poll_once().await {
                Ok(Some(job)) => {
                    stats.claimed += 1;
                    match self.processor.process(job.id, &shutdown).await {
                        Ok(state) => stats.record(state),
                        Err(e) => {
                            tracing::error!(job_id = %job.id, error = %e, "Job processing failed");
                            stats.failed += 1;
                        }
                    }
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(worker_id = %worker_id, error = %e, "Polling for jobs failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender dropped; nobody can signal shutdown any more
                        tracing::debug!(worker_id = %worker_id, "Shutdown channel closed");
                        break;
                    }
                }
            }
        }

        tracing::info!(
            worker_id = %worker_id,
            claimed = stats.claimed,
            completed = stats.completed,
            failed = stats.failed,
            canceled = stats.canceled,
            "Worker stopped"
        );
        Ok(stats)
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("worker_id", &self.poller.claim().worker_id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
