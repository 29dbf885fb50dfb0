//! Transfer worker
//!
//! - [`poller`] - [`JobPoller`]: find a ready job and claim it
//! - [`credentials`] - [`CredentialDecrypter`] and credential sealing
//! - [`processor`] - [`JobProcessor`]: run one claimed job to a terminal state
//! - [`worker`] - [`Worker`]: the poll/process loop

pub mod credentials;
pub mod poller;
pub mod processor;
#[allow(clippy::module_inception)]
pub mod worker;

pub use credentials::{
    seal_credentials, seal_credentials_with_key, CredentialDecrypter, JobCredentials,
};
pub use poller::JobPoller;
pub use processor::JobProcessor;
pub use worker::{Worker, WorkerSettings, WorkerStats};
