//! Idempotent import execution
//!
//! Importers route every destination-side creation through an
//! [`IdempotentImportExecutor`]. The executor remembers, per job, which
//! items were already created and what destination id they got, so a
//! retried page never creates the same object twice.
//!
//! # Example
//!
//! ```rust,no_run
//! use porta::adapters::jobstore::InMemoryJobStore;
//! use porta::core::executor::{IdempotentImportExecutor, InMemoryIdempotentImportExecutor};
//! use porta::domain::JobId;
//! use std::sync::Arc;
//!
//! # async fn example() -> porta::domain::Result<()> {
//! let executor = InMemoryIdempotentImportExecutor::new(JobId::new(), Arc::new(InMemoryJobStore::new()));
//!
//! let album_id = executor
//!     .execute_or_throw("album-1", "Summer", Box::pin(async { Ok::<_, porta::domain::PortaError>("dest-album-9".to_string()) }))
//!     .await?;
//! assert_eq!(executor.get_cached_value("album-1").await?, album_id);
//! # Ok(())
//! # }
//! ```

pub mod idempotent;

pub use idempotent::InMemoryIdempotentImportExecutor;

use crate::domain::{ErrorDetail, JobId, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;

/// A not-yet-polled destination call that yields the created object's id
pub type ImportOperation<'a> = BoxFuture<'a, Result<String>>;

/// Per-job memo of destination-side creations
#[async_trait]
pub trait IdempotentImportExecutor: Send + Sync {
    /// Run `operation` unless `id` already has a cached outcome
    ///
    /// Recoverable failures are cached, recorded against the job and turned
    /// into `Ok(None)` so the rest of the batch can continue.
    ///
    /// # Errors
    ///
    /// Unrecoverable failures propagate.
    async fn execute_and_swallow_io_errors<'a>(
        &'a self,
        id: &'a str,
        name: &'a str,
        operation: ImportOperation<'a>,
    ) -> Result<Option<String>>;

    /// Run `operation` unless `id` already has a cached outcome
    ///
    /// # Errors
    ///
    /// Any failure propagates. A key whose earlier attempt failed
    /// recoverably yields `PortaError::Transfer` without running again.
    async fn execute_or_throw<'a>(
        &'a self,
        id: &'a str,
        name: &'a str,
        operation: ImportOperation<'a>,
    ) -> Result<String>;

    /// Destination id created for `id`
    ///
    /// # Errors
    ///
    /// Returns `PortaError::NotFound` if `id` was never created.
    async fn get_cached_value(&self, id: &str) -> Result<String>;

    /// Destination id created for `id`, if any
    async fn lookup(&self, id: &str) -> Option<String>;

    /// Whether `id` was already created
    async fn is_key_cached(&self, id: &str) -> bool;

    /// Failures captured so far, in the order they happened
    async fn errors(&self) -> Vec<ErrorDetail>;

    /// Job this executor belongs to
    fn job_id(&self) -> JobId;
}
