//! Job store: durable job records and staged payloads
//!
//! - [`traits`] - The [`JobStore`] trait
//! - [`memory`] - Mutex-guarded in-process store
//! - [`postgres`] - PostgreSQL store with compare-and-set updates
//! - [`streams`] - Per-job payload staging
//! - [`factory`] - Backend selection from configuration

pub mod factory;
pub mod memory;
pub mod postgres;
pub mod streams;
pub mod traits;

pub use factory::create_job_store;
pub use memory::InMemoryJobStore;
pub use postgres::PostgresJobStore;
pub use traits::{ByteReader, InputStream, JobStore};
