//! Transfer job record and lifecycle state machine
//!
//! A [`PortabilityJob`] moves through two state axes:
//!
//! - [`JobState`]: `Created -> InProgress -> {Complete, Error, Canceled}`
//! - [`AuthState`]: `Initial -> CredsAvailable -> CredsClaimed`
//!
//! The transition methods here are the single source of truth for which
//! moves are legal. Job store backends apply them under their own atomicity
//! guarantee (a mutex, a row lock) and persist the result.

use crate::crypto::EncryptedBlob;
use crate::domain::errors::{ErrorDetail, JobStoreError};
use crate::domain::ids::{JobId, WorkerId};
use crate::domain::vertical::DataVertical;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure reason recorded when a job is timed out
pub const TIMED_OUT_REASON: &str = "job timed out";

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Created, not yet started by a worker
    Created,
    /// A worker is copying data
    InProgress,
    /// Finished successfully (possibly with skipped items)
    Complete,
    /// Finished with a fatal error or timed out
    Error,
    /// Canceled by the user
    Canceled,
}

impl JobState {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Error | JobState::Canceled)
    }

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "CREATED",
            JobState::InProgress => "IN_PROGRESS",
            JobState::Complete => "COMPLETE",
            JobState::Error => "ERROR",
            JobState::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential readiness sub-state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthState {
    /// Credentials not yet (fully) attached
    Initial,
    /// Both credential blobs are stored; the job is ready to be claimed
    CredsAvailable,
    /// A worker has claimed the job
    CredsClaimed,
}

impl AuthState {
    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Initial => "INITIAL",
            AuthState::CredsAvailable => "CREDS_AVAILABLE",
            AuthState::CredsClaimed => "CREDS_CLAIMED",
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encrypted export and import credentials for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCredentials {
    pub export_auth_data: EncryptedBlob,
    pub import_auth_data: EncryptedBlob,
}

/// A worker's claim on a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerClaim {
    /// The claiming worker
    pub worker_id: WorkerId,

    /// Public key the worker advertises for credential sealing, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl WorkerClaim {
    /// Creates a claim without a public key
    pub fn new(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            public_key: None,
        }
    }

    /// Sets the advertised public key
    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }
}

/// Authorization part of a job record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAuthorization {
    /// Credential readiness
    pub state: AuthState,

    /// Encrypted export-side credentials
    #[serde(default)]
    pub encrypted_export_auth_data: Option<EncryptedBlob>,

    /// Encrypted import-side credentials
    #[serde(default)]
    pub encrypted_import_auth_data: Option<EncryptedBlob>,

    /// Worker holding the claim (the claim token)
    #[serde(default)]
    pub worker_id: Option<WorkerId>,

    /// Public key advertised by the claiming worker
    #[serde(default)]
    pub worker_public_key: Option<String>,
}

impl JobAuthorization {
    fn has_both_credentials(&self) -> bool {
        self.encrypted_export_auth_data.is_some() && self.encrypted_import_auth_data.is_some()
    }
}

impl Default for JobAuthorization {
    fn default() -> Self {
        Self {
            state: AuthState::Initial,
            encrypted_export_auth_data: None,
            encrypted_import_auth_data: None,
            worker_id: None,
            worker_public_key: None,
        }
    }
}

/// One request to move one data vertical from an export service to an
/// import service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortabilityJob {
    /// Job identifier
    pub id: JobId,

    /// Lifecycle state
    pub state: JobState,

    /// Data vertical to transfer
    pub data_vertical: DataVertical,

    /// Service exported from
    pub export_service: String,

    /// Service imported into
    pub import_service: String,

    /// Credential state and encrypted credentials
    pub job_authorization: JobAuthorization,

    /// Ordered, append-only list of recorded errors
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,

    /// Why the job failed, if it did
    #[serde(default)]
    pub failure_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl PortabilityJob {
    /// Creates a new job in the `Created` state
    pub fn new(
        data_vertical: DataVertical,
        export_service: impl Into<String>,
        import_service: impl Into<String>,
    ) -> Self {
        Self {
            id: JobId::new(),
            state: JobState::Created,
            data_vertical,
            export_service: export_service.into(),
            import_service: import_service.into(),
            job_authorization: JobAuthorization::default(),
            errors: Vec::new(),
            failure_reason: None,
            created_at: Utc::now(),
            claimed_at: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Worker currently holding the claim
    pub fn worker_id(&self) -> Option<&WorkerId> {
        self.job_authorization.worker_id.as_ref()
    }

    /// Whether a worker holds the claim
    pub fn is_claimed(&self) -> bool {
        self.job_authorization.worker_id.is_some()
    }

    /// Whether the job is terminal
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether a worker could claim this job in the given auth state
    pub fn is_claimable_in(&self, auth_state: AuthState) -> bool {
        !self.is_terminal() && !self.is_claimed() && self.job_authorization.state == auth_state
    }

    /// Resets the record to a freshly created job with the given id
    pub(crate) fn prepare_for_insert(&mut self, id: JobId) {
        self.id = id;
        self.state = JobState::Created;
        self.job_authorization.state = AuthState::Initial;
        self.job_authorization.worker_id = None;
        self.job_authorization.worker_public_key = None;
        self.errors.clear();
        self.failure_reason = None;
        self.claimed_at = None;
        self.started_at = None;
        self.finished_at = None;
    }

    fn ensure_not_terminal(&self, operation: &str) -> Result<(), JobStoreError> {
        if self.is_terminal() {
            return Err(JobStoreError::invalid_state(
                self.id,
                format!("cannot {operation}: job is already {}", self.state),
            ));
        }
        Ok(())
    }

    /// Stores encrypted credentials; the worker claim is left untouched
    pub fn attach_credentials(
        &mut self,
        credentials: EncryptedCredentials,
    ) -> Result<(), JobStoreError> {
        self.ensure_not_terminal("attach credentials")?;
        self.job_authorization.encrypted_export_auth_data = Some(credentials.export_auth_data);
        self.job_authorization.encrypted_import_auth_data = Some(credentials.import_auth_data);
        Ok(())
    }

    /// Moves the auth state to `CredsAvailable`
    pub fn mark_creds_available(&mut self) -> Result<(), JobStoreError> {
        self.ensure_not_terminal("mark credentials available")?;
        if self.job_authorization.state != AuthState::Initial {
            return Err(JobStoreError::invalid_state(
                self.id,
                format!(
                    "cannot mark credentials available from auth state {}",
                    self.job_authorization.state
                ),
            ));
        }
        if !self.job_authorization.has_both_credentials() {
            return Err(JobStoreError::invalid_state(
                self.id,
                "both export and import credentials must be attached first",
            ));
        }
        self.job_authorization.state = AuthState::CredsAvailable;
        Ok(())
    }

    /// Assigns the job to a worker; the claim is exclusive and permanent
    pub fn claim(&mut self, claim: &WorkerClaim, now: DateTime<Utc>) -> Result<(), JobStoreError> {
        if let Some(owner) = &self.job_authorization.worker_id {
            return Err(JobStoreError::AlreadyClaimed {
                job_id: self.id,
                worker_id: owner.to_string(),
            });
        }
        self.ensure_not_terminal("claim")?;
        if self.job_authorization.state != AuthState::CredsAvailable {
            return Err(JobStoreError::invalid_state(
                self.id,
                format!(
                    "cannot claim job in auth state {}",
                    self.job_authorization.state
                ),
            ));
        }
        self.job_authorization.worker_id = Some(claim.worker_id.clone());
        self.job_authorization.worker_public_key = claim.public_key.clone();
        self.job_authorization.state = AuthState::CredsClaimed;
        self.claimed_at = Some(now);
        Ok(())
    }

    /// Moves a claimed job to `InProgress`
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), JobStoreError> {
        self.ensure_not_terminal("start")?;
        if !self.is_claimed() {
            return Err(JobStoreError::invalid_state(
                self.id,
                "cannot start a job no worker has claimed",
            ));
        }
        if self.state != JobState::Created {
            return Err(JobStoreError::invalid_state(
                self.id,
                format!("cannot start job in state {}", self.state),
            ));
        }
        self.state = JobState::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// Moves the job to a terminal state
    pub fn finish(&mut self, state: JobState, now: DateTime<Utc>) -> Result<(), JobStoreError> {
        if !state.is_terminal() {
            return Err(JobStoreError::invalid_state(
                self.id,
                format!("{state} is not a terminal state"),
            ));
        }
        self.ensure_not_terminal("finish")?;
        self.state = state;
        self.finished_at = Some(now);
        Ok(())
    }

    /// Ends a non-terminal job as timed out
    pub fn time_out(&mut self, now: DateTime<Utc>) -> Result<(), JobStoreError> {
        self.ensure_not_terminal("time out")?;
        self.add_failure_reason(TIMED_OUT_REASON);
        self.state = JobState::Error;
        self.finished_at = Some(now);
        Ok(())
    }

    /// Appends errors; prior errors are never removed
    pub fn add_errors(&mut self, errors: impl IntoIterator<Item = ErrorDetail>) {
        self.errors.extend(errors);
    }

    /// Records a failure reason, appending to any earlier one
    pub fn add_failure_reason(&mut self, reason: &str) {
        self.failure_reason = Some(match self.failure_reason.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}; {reason}"),
            _ => reason.to_string(),
        });
    }
}
