//! External system integrations for Porta.
//!
//! - [`jobstore`] - Durable job records and staged payloads (in-memory and PostgreSQL)
//! - [`transfer`] - The exporter/importer contract and the adapter registry
//! - [`generic`] - A generic HTTP/JSON importer
//!
//! # Design Pattern
//!
//! Adapters isolate external systems behind traits so the core can be
//! tested with in-memory implementations. Provider adapters register
//! factories in a [`transfer::TransferRegistry`] keyed by service name and
//! data vertical; the worker resolves them per job.
//!
//! ```rust
//! use porta::adapters::jobstore::{InMemoryJobStore, JobStore};
//! use porta::adapters::transfer::TransferRegistry;
//! use porta::domain::DataVertical;
//! use std::sync::Arc;
//!
//! let _store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
//! let registry = TransferRegistry::new();
//! assert!(!registry.supports("source", "archive", DataVertical::Photos));
//! ```

pub mod generic;
pub mod jobstore;
pub mod transfer;
