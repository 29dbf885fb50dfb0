//! Core transfer logic for Porta.
//!
//! # Modules
//!
//! - [`executor`] - Idempotent import execution (at-most-once creation)
//! - [`copier`] - The export/import continuation loop for one job
//! - [`worker`] - Claim-and-poll worker driving jobs to a terminal state
//!
//! # Job workflow
//!
//! 1. **Poll**: find the oldest job whose credentials are available
//! 2. **Claim**: atomically assign it to this worker
//! 3. **Start**: mark it in progress and decrypt its credentials
//! 4. **Copy**: export page by page, importing each page through the
//!    idempotent executor, following continuation data until END
//! 5. **Finish**: record failures and mark the job `COMPLETE` or `ERROR`
//!
//! # Example
//!
//! ```rust,no_run
//! use porta::adapters::jobstore::InMemoryJobStore;
//! use porta::adapters::transfer::TransferRegistry;
//! use porta::core::copier::{PortabilityCopier, TransferLimits};
//! use porta::core::worker::{CredentialDecrypter, JobPoller, JobProcessor, Worker, WorkerSettings};
//! use porta::crypto::{generate_symmetric_key, CryptoTransformation};
//! use porta::domain::{WorkerClaim, WorkerId};
//! use std::sync::Arc;
//!
//! # async fn example() -> porta::domain::Result<()> {
//! let store = Arc::new(InMemoryJobStore::new());
//! let key = generate_symmetric_key().to_encoded();
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let worker = Worker::new(
//!     JobPoller::new(store.clone(), WorkerClaim::new(WorkerId::generate())),
//!     JobProcessor::new(
//!         store.clone(),
//!         Arc::new(TransferRegistry::new()),
//!         Arc::new(CredentialDecrypter::from_key(CryptoTransformation::Aes256Gcm, &key)?),
//!         PortabilityCopier::new(store, TransferLimits::default()),
//!     ),
//!     WorkerSettings::default(),
//!     shutdown_rx,
//! );
//!
//! let stats = worker.run().await?;
//! println!("Completed: {}", stats.completed);
//! # Ok(())
//! # }
//! ```

pub mod copier;
pub mod executor;
pub mod worker;
