//! Domain models and types for Porta.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobId`], [`WorkerId`])
//! - **The job record and its state machine** ([`PortabilityJob`], [`JobState`], [`AuthState`])
//! - **Credentials and exported data** ([`AuthData`], [`ContainerResource`])
//! - **Error types** ([`PortaError`], [`JobStoreError`], [`ProviderError`])
//! - **Result type alias** ([`Result`])
//!
//! # Job lifecycle
//!
//! ```rust
//! use porta::domain::{DataVertical, JobState, PortabilityJob};
//!
//! let job = PortabilityJob::new(DataVertical::Photos, "source", "destination");
//! assert_eq!(job.state, JobState::Created);
//! assert!(!job.is_claimed());
//! ```

pub mod auth;
pub mod context;
pub mod errors;
pub mod ids;
pub mod job;
pub mod models;
pub mod result;
pub mod vertical;

// Re-export commonly used types for convenience
pub use auth::AuthData;
pub use errors::{ErrorDetail, JobStoreError, PortaError, ProviderError};
pub use ids::{JobId, WorkerId};
pub use job::{
    AuthState, EncryptedCredentials, JobAuthorization, JobState, PortabilityJob, WorkerClaim,
};
pub use models::{ContainerRef, ContainerResource, MediaAlbum, MediaItem, SocialPost};
pub use result::Result;
pub use vertical::DataVertical;
