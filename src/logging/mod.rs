//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - Human-readable console output
//! - Optional JSON log files with daily or hourly rotation
//! - Level from configuration, overridable with `RUST_LOG`
//!
//! # Example
//!
//! ```no_run
//! use porta::logging::init_logging;
//! use porta::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Worker started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a successful job claim
///
/// # Example
///
/// ```no_run
/// use porta::log_job_claimed;
/// use porta::domain::{JobId, WorkerId};
///
/// let job_id = JobId::new();
/// let worker_id = WorkerId::generate();
/// log_job_claimed!(job_id, worker_id);
/// ```
#[macro_export]
macro_rules! log_job_claimed {
    ($job_id:expr, $worker_id:expr) => {
        tracing::info!(
            job_id = %$job_id,
            worker_id = %$worker_id,
            "Job claimed"
        );
    };
}

/// Log a job reaching a terminal state
///
/// # Example
///
/// ```no_run
/// use porta::log_job_finished;
/// use porta::domain::{JobId, JobState};
/// use std::time::Duration;
///
/// log_job_finished!(JobId::new(), JobState::Complete, 2, Duration::from_secs(90));
/// ```
#[macro_export]
macro_rules! log_job_finished {
    ($job_id:expr, $state:expr, $error_count:expr, $duration:expr) => {
        tracing::info!(
            job_id = %$job_id,
            state = %$state,
            error_count = $error_count,
            duration_ms = $duration.as_millis() as u64,
            "Job finished"
        );
    };
}

/// Log an item whose import failed but did not stop the job
///
/// # Example
///
/// ```no_run
/// use porta::log_item_failure;
/// use porta::domain::{JobId, PortaError};
///
/// let err = PortaError::Io("connection reset".to_string());
/// log_item_failure!(JobId::new(), "album-1-photo-7", &err);
/// ```
#[macro_export]
macro_rules! log_item_failure {
    ($job_id:expr, $item_id:expr, $error:expr) => {
        tracing::warn!(
            job_id = %$job_id,
            item_id = %$item_id,
            error = %$error,
            "Item import failed; continuing"
        );
    };
}
