//! Domain error types
//!
//! This module defines the error hierarchy for Porta. State-invariant
//! violations, claim contention, storage I/O and provider failures are kept
//! as distinct kinds so callers can tell "retry the call" apart from "the
//! job is in the wrong state". No third-party error types are exposed.

use crate::crypto::CryptoError;
use crate::domain::ids::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main Porta error type
#[derive(Debug, Error)]
pub enum PortaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Job store errors (state, contention, storage I/O)
    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),

    /// Encryption or decryption failures
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Classified failures reported by an export or import service
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Transfer pipeline errors (bad export results, missing adapters, ...)
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Transient I/O and network errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// A looked-up value does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl PortaError {
    /// Whether the failure is I/O class and therefore safe to retry
    ///
    /// The idempotent executor downgrades recoverable per-item failures into
    /// recorded job errors; everything else is fatal to the item's batch.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PortaError::Io(_) => true,
            PortaError::JobStore(err) => err.is_io(),
            PortaError::Provider(err) => err.is_recoverable(),
            _ => false,
        }
    }

    /// Whether this is a job state error (never retried automatically)
    pub fn is_state_error(&self) -> bool {
        matches!(self, PortaError::JobStore(err) if err.is_state_error())
    }
}

/// Job store errors
///
/// `InvalidState` and `AlreadyClaimed` describe the job, not the storage, and
/// must not be retried. `Io` wraps storage failures and may be retried.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// A job with this id already exists
    #[error("Job {0} already exists")]
    AlreadyExists(JobId),

    /// No job with this id
    #[error("Job {0} not found")]
    NotFound(JobId),

    /// No payload stream under this key
    #[error("No stream '{key}' for job {job_id}")]
    StreamNotFound { job_id: JobId, key: String },

    /// Another worker already holds the claim on this job
    #[error("Job {job_id} is already claimed by worker {worker_id}")]
    AlreadyClaimed { job_id: JobId, worker_id: String },

    /// The requested transition is invalid from the job's current state
    #[error("Invalid state for job {job_id}: {message}")]
    InvalidState { job_id: JobId, message: String },

    /// Storage-layer failure
    #[error("Storage failure: {0}")]
    Io(String),
}

impl JobStoreError {
    /// Creates an invalid-state error
    pub fn invalid_state(job_id: JobId, message: impl Into<String>) -> Self {
        JobStoreError::InvalidState {
            job_id,
            message: message.into(),
        }
    }

    /// Whether this is a state error
    pub fn is_state_error(&self) -> bool {
        matches!(self, JobStoreError::InvalidState { .. })
    }

    /// Whether the claim was lost to another worker
    pub fn is_contention(&self) -> bool {
        matches!(self, JobStoreError::AlreadyClaimed { .. })
    }

    /// Whether this is a storage I/O failure
    pub fn is_io(&self) -> bool {
        matches!(self, JobStoreError::Io(_))
    }
}

/// Failures classified from a provider's response
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The user revoked or never granted access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The destination has no space left
    #[error("Destination full: {0}")]
    DestinationFull(String),

    /// Unrecognized fatal error
    #[error("Unrecognized provider error (status {status}): {message}")]
    Unspecified { status: u16, message: String },

    /// Access token expired; refresh and retry
    #[error("Token refresh required: {0}")]
    TokenRefreshRequired(String),
}

impl ProviderError {
    /// Only token expiry is recoverable; the rest of the taxonomy is fatal
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProviderError::TokenRefreshRequired(_))
    }
}

/// One failure recorded against a job
///
/// Persisted in the job record's ordered error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Item identifier the failure belongs to
    pub id: String,

    /// Human-readable item name
    pub title: String,

    /// Error message
    pub message: String,

    /// Underlying cause, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,

    /// Whether the transfer can go on without this item
    #[serde(default)]
    pub can_skip: bool,

    /// When the failure was recorded
    pub recorded_at: DateTime<Utc>,
}

impl ErrorDetail {
    /// Creates a new error detail for an item
    pub fn new(id: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            cause: None,
            can_skip: false,
            recorded_at: Utc::now(),
        }
    }

    /// Builds an error detail from a captured error
    pub fn from_error(id: impl Into<String>, title: impl Into<String>, err: &PortaError) -> Self {
        let cause = std::error::Error::source(err).map(|source| source.to_string());
        Self {
            cause,
            can_skip: err.is_recoverable(),
            ..Self::new(id, title, err.to_string())
        }
    }

    /// Sets the cause
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Marks the error as skippable
    pub fn skippable(mut self) -> Self {
        self.can_skip = true;
        self
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for PortaError {
    fn from(err: std::io::Error) -> Self {
        PortaError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PortaError {
    fn from(err: serde_json::Error) -> Self {
        PortaError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for PortaError {
    fn from(err: toml::de::Error) -> Self {
        PortaError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Network failures are I/O class
impl From<reqwest::Error> for PortaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PortaError::Serialization(err.to_string())
        } else {
            PortaError::Io(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_porta_error_display() {
        let err = PortaError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_job_store_error_conversion() {
        let store_err = JobStoreError::NotFound(JobId::new());
        let err: PortaError = store_err.into();
        assert!(matches!(err, PortaError::JobStore(JobStoreError::NotFound(_))));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(PortaError::Io("socket closed".to_string()).is_recoverable());
        assert!(PortaError::JobStore(JobStoreError::Io("timeout".to_string())).is_recoverable());
        assert!(
            PortaError::Provider(ProviderError::TokenRefreshRequired("401".to_string()))
                .is_recoverable()
        );

        assert!(
            !PortaError::Provider(ProviderError::DestinationFull("full".to_string()))
                .is_recoverable()
        );
        assert!(
            !PortaError::Provider(ProviderError::PermissionDenied("denied".to_string()))
                .is_recoverable()
        );
        assert!(!PortaError::Crypto(CryptoError::Decrypt).is_recoverable());
        assert!(!PortaError::Validation("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_state_and_contention_are_distinct_from_io() {
        let job_id = JobId::new();
        let state = JobStoreError::invalid_state(job_id, "already terminal");
        let claimed = JobStoreError::AlreadyClaimed {
            job_id,
            worker_id: "w-1".to_string(),
        };
        let io = JobStoreError::Io("connection reset".to_string());

        assert!(state.is_state_error() && !state.is_io() && !state.is_contention());
        assert!(claimed.is_contention() && !claimed.is_state_error());
        assert!(io.is_io() && !io.is_state_error());

        assert!(PortaError::from(state).is_state_error());
    }

    #[test]
    fn test_error_detail_from_error() {
        let err = PortaError::Io("connection reset".to_string());
        let detail = ErrorDetail::from_error("item-1", "Beach.jpg", &err);

        assert_eq!(detail.id, "item-1");
        assert_eq!(detail.title, "Beach.jpg");
        assert!(detail.message.contains("connection reset"));
        assert!(detail.can_skip);
    }

    #[test]
    fn test_error_detail_serialization() {
        let detail = ErrorDetail::new("a", "b", "c").with_cause("d");
        let json = serde_json::to_string(&detail).unwrap();
        let back: ErrorDetail = serde_json::from_str(&json).unwrap();
        assert_eq!(back, detail);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: PortaError = io_err.into();
        assert!(matches!(err, PortaError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: PortaError = toml_err.into();
        assert!(matches!(err, PortaError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
