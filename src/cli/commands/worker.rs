//! Worker command implementation
//!
//! This module implements the `worker` command: it wires the configured job
//! store, credential decrypter and adapter registry into a [`Worker`] and
//! runs it until shutdown.

use crate::adapters::generic;
use crate::adapters::jobstore::create_job_store;
use crate::adapters::transfer::TransferRegistry;
use crate::config::{load_config, PortaConfig};
use crate::core::copier::{PortabilityCopier, TransferLimits};
use crate::core::worker::{CredentialDecrypter, JobPoller, JobProcessor, Worker, WorkerSettings};
use crate::crypto::advertised_public_key;
use crate::domain::{WorkerClaim, WorkerId};
use clap::Args;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Arguments for the worker command
#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Override the configured worker identifier
    #[arg(long)]
    pub worker_id: Option<String>,

    /// Stop after this many jobs (0 = run until shutdown)
    #[arg(long)]
    pub max_jobs: Option<u64>,
}

impl WorkerArgs {
    /// Execute the worker command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting worker command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        // Apply CLI overrides
        if let Some(ref worker_id) = self.worker_id {
            tracing::info!(worker_id = %worker_id, "Overriding worker ID from CLI");
            config.worker.worker_id = Some(worker_id.clone());
        }
        if let Some(max_jobs) = self.max_jobs {
            tracing::info!(max_jobs, "Overriding job limit from CLI");
            config.worker.max_jobs = max_jobs;
        }

        let claim = match worker_claim(&config) {
            Ok(claim) => claim,
            Err(e) => {
                tracing::error!(error = %e, "Invalid worker identity");
                eprintln!("Invalid worker configuration: {e}");
                return Ok(2);
            }
        };

        let credentials = match CredentialDecrypter::from_key(
            config.crypto.transformation,
            config.crypto.key.expose_secret().as_ref(),
        ) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load credential key");
                eprintln!("Failed to load credential key: {e}");
                return Ok(2);
            }
        };

        let job_store = match create_job_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create job store");
                eprintln!("Failed to connect to job store: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        let mut registry = TransferRegistry::new();
        if let Some(ref generic_config) = config.generic {
            if let Err(e) = generic::register(&mut registry, generic_config, job_store.clone()) {
                tracing::error!(error = %e, "Failed to register generic importer");
                eprintln!("Failed to register generic importer: {e}");
                return Ok(2);
            }
        }
        let registrations = registry.registrations();
        if registrations.is_empty() {
            tracing::warn!("No transfer adapters registered; every claimed job will fail setup");
        } else {
            tracing::info!(adapters = ?registrations, "Transfer adapters registered");
        }

        let limits = TransferLimits {
            max_export_pages: config.transfer.max_export_pages,
            max_job_duration: Duration::from_secs(config.transfer.max_job_duration_secs),
        };
        let settings = WorkerSettings {
            poll_interval: Duration::from_millis(config.worker.poll_interval_ms),
            max_jobs: config.worker.max_jobs,
        };
        let shutdown_timeout = Duration::from_secs(config.worker.shutdown_timeout_secs);

        let processor = JobProcessor::new(
            job_store.clone(),
            Arc::new(registry),
            credentials,
            PortabilityCopier::new(job_store.clone(), limits),
        );
        let poller = JobPoller::new(job_store, claim);
        let worker = Worker::new(poller, processor, settings, shutdown_signal.clone());

        println!("🚀 Worker running (Ctrl+C to stop)...");

        // The copier stops at the next page boundary after shutdown; give it
        // `shutdown_timeout` to get there before abandoning the job.
        let run = worker.run();
        tokio::pin!(run);
        let result = tokio::select! {
            result = &mut run => result,
            _ = shutdown_deadline(shutdown_signal, shutdown_timeout) => {
                tracing::warn!(
                    timeout_secs = shutdown_timeout.as_secs(),
                    "Worker did not stop within the shutdown timeout"
                );
                eprintln!("⚠️  Shutdown timeout exceeded; the current job was abandoned");
                return Ok(130);
            }
        };

        let stats = match result {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "Worker failed");
                eprintln!("Worker failed: {e}");
                return Ok(5); // Fatal error exit code
            }
        };

        println!();
        println!("📊 Worker Summary:");
        println!("  Jobs Claimed: {}", stats.claimed);
        println!("  Completed: {}", stats.completed);
        println!("  Failed: {}", stats.failed);
        println!("  Canceled: {}", stats.canceled);
        println!();
        Ok(0)
    }
}

/// Claim presented by this worker, with its public key when the scheme has one
fn worker_claim(config: &PortaConfig) -> anyhow::Result<WorkerClaim> {
    let worker_id = match config.worker.worker_id {
        Some(ref id) => WorkerId::new(id.clone()).map_err(anyhow::Error::msg)?,
        None => WorkerId::generate(),
    };

    let mut claim = WorkerClaim::new(worker_id);
    if let Some(public_key) = advertised_public_key(
        config.crypto.transformation,
        config.crypto.key.expose_secret().as_ref(),
    )? {
        claim = claim.with_public_key(public_key);
    }
    Ok(claim)
}

/// Resolves `timeout` after shutdown is signalled; never resolves otherwise
async fn shutdown_deadline(mut shutdown: watch::Receiver<bool>, timeout: Duration) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{generate_key_pair, generate_symmetric_key, CryptoTransformation};
    use crate::config::secret_string;

    #[test]
    fn test_claim_uses_configured_worker_id() {
        let mut config = PortaConfig::default();
        config.worker.worker_id = Some("worker-a".to_string());
        config.crypto.key = secret_string(generate_symmetric_key().to_encoded());

        let claim = worker_claim(&config).unwrap();
        assert_eq!(claim.worker_id.as_str(), "worker-a");
        assert!(claim.public_key.is_none());
    }

    #[test]
    fn test_claim_advertises_public_key_for_sealed_box() {
        let pair = generate_key_pair();
        let mut config = PortaConfig::default();
        config.crypto.transformation = CryptoTransformation::X25519;
        config.crypto.key = secret_string(pair.private_key_encoded());

        let claim = worker_claim(&config).unwrap();
        assert_eq!(claim.public_key, Some(pair.public_key_encoded()));
    }

    #[tokio::test]
    async fn test_shutdown_deadline_waits_for_signal() {
        let (tx, rx) = watch::channel(false);
        let deadline = shutdown_deadline(rx, Duration::from_millis(10));
        tokio::pin!(deadline);

        let early = tokio::time::timeout(Duration::from_millis(50), &mut deadline).await;
        assert!(early.is_err());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), &mut deadline)
            .await
            .unwrap();
    }
}
