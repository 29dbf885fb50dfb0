//! PostgreSQL job store
//!
//! Each job is one row: the full record as JSONB plus the columns the work
//! queue filters on. Every write is a compare-and-set on a `version`
//! column, so concurrent workers never overwrite each other. A claim adds
//! `worker_id IS NULL` to the same `UPDATE`, which makes it a single atomic
//! statement.

use super::streams::PayloadStreams;
use super::traits::{ByteReader, InputStream, JobStore};
use crate::config::PostgreSQLConfig;
use crate::domain::{
    AuthState, EncryptedCredentials, ErrorDetail, JobId, JobState, JobStoreError, PortaError,
    PortabilityJob, Result, WorkerClaim,
};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::Json;
use tokio_postgres::NoTls;
use uuid::Uuid;

/// Attempts before a contended update is reported as a storage failure
const MAX_UPDATE_ATTEMPTS: u32 = 5;

const UPDATE_SQL: &str = "UPDATE portability_jobs \
     SET state = $2, auth_state = $3, worker_id = $4, record = $5, \
         version = version + 1, updated_at = NOW() \
     WHERE job_id = $1 AND version = $6";

const CLAIM_SQL: &str = "UPDATE portability_jobs \
     SET state = $2, auth_state = $3, worker_id = $4, record = $5, \
         version = version + 1, updated_at = NOW() \
     WHERE job_id = $1 AND version = $6 \
       AND worker_id IS NULL AND auth_state = 'CREDS_AVAILABLE' \
     RETURNING job_id";

fn storage_error(context: &str, err: impl std::fmt::Display) -> PortaError {
    JobStoreError::Io(format!("{context}: {err}")).into()
}

/// Builds the TLS connector for an `ssl_mode`
///
/// `verify-ca` and `verify-full` check the server certificate; the weaker
/// modes only encrypt.
fn tls_connector(ssl_mode: &str) -> Result<MakeTlsConnector> {
    let mut builder = native_tls::TlsConnector::builder();
    match ssl_mode {
        "verify-full" => {}
        "verify-ca" => {
            builder.danger_accept_invalid_hostnames(true);
        }
        _ => {
            builder.danger_accept_invalid_certs(true);
        }
    }
    let connector = builder
        .build()
        .map_err(|e| PortaError::Configuration(format!("Failed to build TLS connector: {e}")))?;
    Ok(MakeTlsConnector::new(connector))
}

fn ssl_mode_for(ssl_mode: &str) -> SslMode {
    match ssl_mode {
        "disable" => SslMode::Disable,
        "allow" | "prefer" => SslMode::Prefer,
        _ => SslMode::Require,
    }
}

/// Connection string with credentials removed, for logging
pub fn redact_connection_string(connection_string: &str) -> String {
    connection_string
        .rsplit_once('@')
        .map(|(_, host)| format!("postgresql://***@{host}"))
        .unwrap_or_else(|| "postgresql://***".to_string())
}

/// Job store backed by PostgreSQL
pub struct PostgresJobStore {
    pool: Pool,
    streams: PayloadStreams,
    safe_connection: String,
}

impl PostgresJobStore {
    /// Creates the store; connections are opened lazily by the pool
    ///
    /// # Arguments
    ///
    /// * `config` - PostgreSQL configuration
    /// * `stream_dir` - Directory for staged payloads
    ///
    /// # Errors
    ///
    /// Returns `PortaError::Configuration` if the connection string or TLS
    /// setup is invalid.
    pub fn new(config: &PostgreSQLConfig, stream_dir: impl Into<PathBuf>) -> Result<Self> {
        let connection_string = config.connection_string.expose_secret().as_ref();
        let mut pg_config: tokio_postgres::Config = connection_string.parse().map_err(|e| {
            PortaError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
        })?;
        pg_config
            .options(&format!(
                "-c statement_timeout={}",
                config.statement_timeout_seconds * 1000
            ))
            .connect_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .ssl_mode(ssl_mode_for(&config.ssl_mode));

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = if config.ssl_mode == "disable" {
            Manager::from_config(pg_config, NoTls, manager_config)
        } else {
            Manager::from_config(pg_config, tls_connector(&config.ssl_mode)?, manager_config)
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .build()
            .map_err(|e| {
                PortaError::Configuration(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self {
            pool,
            streams: PayloadStreams::disk(stream_dir),
            safe_connection: redact_connection_string(connection_string),
        })
    }

    async fn client(&self) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| storage_error("Failed to get connection from pool", e))
    }

    /// Runs a trivial query to prove connectivity
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| storage_error("Connection test failed", e))?;

        tracing::info!(database = %self.safe_connection, "PostgreSQL connection test successful");
        Ok(())
    }

    /// Creates the jobs table and indexes if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .batch_execute(include_str!("../../../migrations/001_job_store.sql"))
            .await
            .map_err(|e| storage_error("Failed to apply job store schema", e))?;

        tracing::info!("Job store schema ready");
        Ok(())
    }

    async fn load(&self, client: &Object, id: JobId) -> Result<(PortabilityJob, i64)> {
        let row = client
            .query_opt(
                "SELECT record, version FROM portability_jobs WHERE job_id = $1",
                &[id.as_uuid()],
            )
            .await
            .map_err(|e| storage_error("Failed to load job", e))?
            .ok_or(JobStoreError::NotFound(id))?;

        let Json(job): Json<PortabilityJob> = row
            .try_get("record")
            .map_err(|e| PortaError::Serialization(format!("Corrupt job record {id}: {e}")))?;
        let version: i64 = row
            .try_get("version")
            .map_err(|e| storage_error("Failed to read job version", e))?;
        Ok((job, version))
    }

    /// Read-modify-write with optimistic concurrency
    ///
    /// `change` runs against the freshly loaded record on every attempt, so
    /// a lost race is re-evaluated against the winner's state.
    async fn transition<T, F>(&self, id: JobId, claim: bool, change: F) -> Result<T>
    where
        F: Fn(&mut PortabilityJob) -> std::result::Result<T, JobStoreError> + Send + Sync,
        T: Send,
    {
        let client = self.client().await?;

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let (mut job, version) = self.load(&client, id).await?;
            let value = change(&mut job)?;

            let worker_id = job.worker_id().map(|w| w.as_str());
            let params: [&(dyn tokio_postgres::types::ToSql + Sync); 6] = [
                id.as_uuid(),
                &job.state.as_str(),
                &job.job_authorization.state.as_str(),
                &worker_id,
                &Json(&job),
                &version,
            ];

            let updated = if claim {
                client
                    .query_opt(CLAIM_SQL, &params)
                    .await
                    .map_err(|e| storage_error("Failed to claim job", e))?
                    .is_some()
            } else {
                client
                    .execute(UPDATE_SQL, &params)
                    .await
                    .map_err(|e| storage_error("Failed to update job", e))?
                    == 1
            };

            if updated {
                return Ok(value);
            }
            tracing::debug!(job_id = %id, attempt, "Job changed concurrently, retrying update");
        }

        Err(JobStoreError::Io(format!("Job {id} kept changing during update")).into())
    }

    async fn exists(&self, id: JobId) -> Result<bool> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT 1 FROM portability_jobs WHERE job_id = $1",
                &[id.as_uuid()],
            )
            .await
            .map_err(|e| storage_error("Failed to look up job", e))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create_job(&self, id: JobId, mut job: PortabilityJob) -> Result<()> {
        job.prepare_for_insert(id);

        let client = self.client().await?;
        let inserted = client
            .execute(
                "INSERT INTO portability_jobs (job_id, state, auth_state, worker_id, record, created_at) \
                 VALUES ($1, $2, $3, NULL, $4, $5) \
                 ON CONFLICT (job_id) DO NOTHING",
                &[
                    id.as_uuid(),
                    &job.state.as_str(),
                    &job.job_authorization.state.as_str(),
                    &Json(&job),
                    &job.created_at,
                ],
            )
            .await
            .map_err(|e| storage_error("Failed to insert job", e))?;

        if inserted == 0 {
            return Err(JobStoreError::AlreadyExists(id).into());
        }
        tracing::debug!(job_id = %id, "Job created");
        Ok(())
    }

    async fn claim_job(&self, id: JobId, claim: &WorkerClaim) -> Result<PortabilityJob> {
        self.transition(id, true, |job| {
            job.claim(claim, Utc::now())?;
            Ok(job.clone())
        })
        .await
    }

    async fn update_job_auth_state_to_creds_available(&self, id: JobId) -> Result<()> {
        self.transition(id, false, |job| job.mark_creds_available())
            .await
    }

    async fn update_job_with_credentials(
        &self,
        id: JobId,
        credentials: EncryptedCredentials,
    ) -> Result<()> {
        self.transition(id, false, |job| job.attach_credentials(credentials.clone()))
            .await
    }

    async fn add_errors_to_job(&self, id: JobId, errors: Vec<ErrorDetail>) -> Result<()> {
        self.transition(id, false, |job| {
            job.add_errors(errors.iter().cloned());
            Ok(())
        })
        .await
    }

    async fn add_failure_reason_to_job(&self, id: JobId, reason: &str) -> Result<()> {
        self.transition(id, false, |job| {
            job.add_failure_reason(reason);
            Ok(())
        })
        .await
    }

    async fn mark_job_as_started(&self, id: JobId) -> Result<()> {
        self.transition(id, false, |job| job.start(Utc::now())).await
    }

    async fn mark_job_as_finished(&self, id: JobId, state: JobState) -> Result<()> {
        self.transition(id, false, |job| job.finish(state, Utc::now()))
            .await
    }

    async fn mark_job_as_timed_out(&self, id: JobId) -> Result<()> {
        self.transition(id, false, |job| job.time_out(Utc::now()))
            .await
    }

    async fn find_job(&self, id: JobId) -> Result<PortabilityJob> {
        let client = self.client().await?;
        self.load(&client, id).await.map(|(job, _)| job)
    }

    async fn find_first(&self, auth_state: AuthState) -> Result<Option<JobId>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT job_id FROM portability_jobs \
                 WHERE worker_id IS NULL AND auth_state = $1 \
                   AND state NOT IN ('COMPLETE', 'ERROR', 'CANCELED') \
                 ORDER BY created_at, job_id \
                 LIMIT 1",
                &[&auth_state.as_str()],
            )
            .await
            .map_err(|e| storage_error("Failed to poll for jobs", e))?;

        row.map(|row| {
            row.try_get::<_, Uuid>("job_id")
                .map(JobId::from_uuid)
                .map_err(|e| storage_error("Failed to read job id", e))
        })
        .transpose()
    }

    async fn create_stream(&self, id: JobId, key: &str, stream: ByteReader) -> Result<u64> {
        if !self.exists(id).await? {
            return Err(JobStoreError::NotFound(id).into());
        }
        let size = self.streams.write(id, key, stream).await?;

        // The job may have been removed while the payload was being written
        if !self.exists(id).await? {
            self.streams.remove_all(id).await?;
            return Err(JobStoreError::NotFound(id).into());
        }
        Ok(size)
    }

    async fn get_stream(&self, id: JobId, key: &str) -> Result<InputStream> {
        self.streams.open(id, key).await
    }

    async fn remove(&self, id: JobId) -> Result<()> {
        let client = self.client().await?;
        let deleted = client
            .execute(
                "DELETE FROM portability_jobs WHERE job_id = $1",
                &[id.as_uuid()],
            )
            .await
            .map_err(|e| storage_error("Failed to delete job", e))?;

        if deleted == 0 {
            return Err(JobStoreError::NotFound(id).into());
        }
        self.streams.remove_all(id).await?;

        tracing::info!(job_id = %id, "Job removed");
        Ok(())
    }
}
