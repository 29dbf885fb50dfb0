//! Status command implementation
//!
//! This module implements the `status` command for displaying one job's
//! lifecycle state, claim and recorded errors.

use crate::adapters::jobstore::create_job_store;
use crate::config::load_config;
use crate::domain::{JobId, JobStoreError, PortaError, PortabilityJob};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Job identifier (UUID)
    pub job_id: JobId,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(job_id = %self.job_id, "Checking job status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let job_store = match create_job_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to job store");
                println!("   Error: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        let job = match job_store.find_job(self.job_id).await {
            Ok(job) => job,
            Err(PortaError::JobStore(JobStoreError::NotFound(_))) => {
                println!("No job found with ID {}", self.job_id);
                return Ok(1);
            }
            Err(e) => {
                println!("❌ Failed to load job");
                println!("   Error: {e}");
                return Ok(5); // Fatal error exit code
            }
        };

        print_job(&job);
        Ok(0)
    }
}

fn print_job(job: &PortabilityJob) {
    let auth = &job.job_authorization;

    println!("📊 Job {}", job.id);
    println!();
    println!("  State: {}", job.state);
    println!("  Auth State: {}", auth.state);
    println!("  Data Vertical: {}", job.data_vertical);
    println!("  Export Service: {}", job.export_service);
    println!("  Import Service: {}", job.import_service);
    println!(
        "  Worker: {}",
        auth.worker_id
            .as_ref()
            .map(|w| w.to_string())
            .unwrap_or_else(|| "unclaimed".to_string())
    );
    println!("  Created: {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    for (label, at) in [
        ("Claimed", job.claimed_at),
        ("Started", job.started_at),
        ("Finished", job.finished_at),
    ] {
        if let Some(at) = at {
            println!("  {label}: {}", at.format("%Y-%m-%d %H:%M:%S"));
        }
    }

    if let Some(ref reason) = job.failure_reason {
        println!("  Failure Reason: {reason}");
    }

    if !job.errors.is_empty() {
        println!();
        println!("⚠️  {} item error(s):", job.errors.len());
        for (i, error) in job.errors.iter().enumerate() {
            if i >= 10 {
                println!("  ... and {} more", job.errors.len() - 10);
                break;
            }
            println!("  - {} ({}): {}", error.title, error.id, error.message);
        }
    }
    println!();
}
