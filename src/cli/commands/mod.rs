//! CLI command implementations
//!
//! Every command returns its process exit code: 0 success, 1 job not
//! found, 2 configuration error, 4 connection error, 5 fatal error.

pub mod keygen;
pub mod status;
pub mod validate;
pub mod worker;
