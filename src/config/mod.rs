//! Configuration management for Porta.
//!
//! # Overview
//!
//! Porta uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PORTA_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use porta::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("porta.toml")?;
//!
//! println!("Backend: {:?}", config.job_store.backend);
//! println!("Poll interval: {}ms", config.worker.poll_interval_ms);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`WorkerConfig`] - Worker identity and poll loop
//! - [`TransferConfig`] - Per-job page and duration bounds
//! - [`JobStoreConfig`] - Job store backend and payload staging directory
//! - [`PostgreSQLConfig`] - PostgreSQL connection (postgresql backend only)
//! - [`CryptoConfig`] - Credential encryption scheme and key
//! - [`GenericConfig`] - Optional generic HTTP importer
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [worker]
//! poll_interval_ms = 1000
//!
//! [job_store]
//! backend = "postgresql"
//! stream_dir = "/var/lib/porta/streams"
//!
//! [postgresql]
//! connection_string = "${PORTA_PG_URL}"
//!
//! [crypto]
//! transformation = "aes256-gcm"
//! key = "${PORTA_CREDENTIAL_KEY}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CryptoConfig, GenericConfig, JobStoreBackend, JobStoreConfig,
    LoggingConfig, PortaConfig, PostgreSQLConfig, TransferConfig, WorkerConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
