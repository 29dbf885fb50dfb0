//! Job store factory
//!
//! Creates the configured job store backend.

use super::memory::InMemoryJobStore;
use super::postgres::PostgresJobStore;
use super::traits::JobStore;
use crate::config::schema::{JobStoreBackend, PortaConfig};
use crate::domain::{PortaError, Result};
use std::sync::Arc;

/// Create a job store based on the configuration
///
/// The PostgreSQL backend is connection-tested and its schema applied
/// before it is returned.
///
/// # Errors
///
/// Returns an error if the backend cannot be created or reached.
pub async fn create_job_store(config: &PortaConfig) -> Result<Arc<dyn JobStore>> {
    let stream_dir = config.job_store.stream_dir.clone();

    match config.job_store.backend {
        JobStoreBackend::Memory => {
            tracing::info!(stream_dir = %stream_dir.display(), "Creating in-memory job store");
            Ok(Arc::new(InMemoryJobStore::with_stream_dir(stream_dir)))
        }
        JobStoreBackend::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                PortaError::Configuration(
                    "postgresql section is required when job_store.backend = \"postgresql\""
                        .to_string(),
                )
            })?;

            tracing::info!(stream_dir = %stream_dir.display(), "Creating PostgreSQL job store");
            let store = PostgresJobStore::new(pg_config, stream_dir)?;
            store.test_connection().await?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataVertical, JobId, PortabilityJob};

    #[tokio::test]
    async fn test_memory_backend() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = PortaConfig::default();
        config.job_store.stream_dir = temp.path().to_path_buf();

        let store = create_job_store(&config).await.unwrap();
        let id = JobId::new();
        store
            .create_job(id, PortabilityJob::new(DataVertical::Photos, "a", "b"))
            .await
            .unwrap();
        assert_eq!(store.find_job(id).await.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_postgresql_backend_requires_section() {
        let mut config = PortaConfig::default();
        config.job_store.backend = JobStoreBackend::PostgreSQL;
        config.postgresql = None;

        let err = create_job_store(&config).await.err().unwrap();
        assert!(matches!(err, PortaError::Configuration(_)));
    }
}
