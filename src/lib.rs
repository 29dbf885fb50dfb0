// Porta - Data Portability Transfer Worker
// Copyright (c) 2025 Porta Contributors
// Licensed under the MIT License

//! # Porta - data portability transfer worker
//!
//! Porta moves a user's data from one online service to another. A transfer
//! is a *job*: it is created with encrypted credentials for both services,
//! claimed by exactly one worker, and driven page by page from the export
//! service into the import service until the export is exhausted.
//!
//! ## Architecture
//!
//! - [`domain`] - Job record, lifecycle state machine, ids and errors
//! - [`crypto`] - Credential encryption at rest
//! - [`adapters`] - Job store backends, the transfer adapter contract and a
//!   generic HTTP importer
//! - [`core`] - Idempotent import executor, copier loop and worker
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//! - [`cli`] - Command-line interface
//!
//! ## Quick Start
//!
//! ```rust
//! use porta::adapters::jobstore::{InMemoryJobStore, JobStore};
//! use porta::core::worker::{seal_credentials_with_key, JobPoller};
//! use porta::crypto::{generate_symmetric_key, CryptoTransformation};
//! use porta::domain::{AuthData, DataVertical, JobId, PortabilityJob, WorkerClaim, WorkerId};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), porta::domain::PortaError> {
//! let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
//! let key = generate_symmetric_key().to_encoded();
//!
//! // Create a job, seal both credentials and mark them available
//! let job_id = JobId::new();
//! store
//!     .create_job(job_id, PortabilityJob::new(DataVertical::Photos, "source", "archive"))
//!     .await?;
//! let sealed = seal_credentials_with_key(
//!     CryptoTransformation::Aes256Gcm,
//!     &key,
//!     &AuthData::token("export-token"),
//!     &AuthData::token("import-token"),
//! )?;
//! store.update_job_with_credentials(job_id, sealed).await?;
//! store.update_job_auth_state_to_creds_available(job_id).await?;
//!
//! // A worker claims it
//! let poller = JobPoller::new(store.clone(), WorkerClaim::new(WorkerId::generate()));
//! let claimed = poller.poll_once().await?.expect("job is claimable");
//! assert_eq!(claimed.id, job_id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All library errors are [`domain::PortaError`]. Failures are classified:
//! I/O-class failures are recoverable and recorded against the job, state
//! errors and provider failures are fatal.
//!
//! ## Logging
//!
//! Porta uses structured logging with the `tracing` crate:
//!
//! ```rust
//! use porta::domain::JobId;
//!
//! let job_id = JobId::new();
//! tracing::info!(job_id = %job_id, "Job created");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod domain;
pub mod logging;
