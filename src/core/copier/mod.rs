//! Copier: drives one job's export/import continuation loop
//!
//! - [`copier`] - [`PortabilityCopier`] and its [`TransferLimits`]
//! - [`summary`] - [`CopyOutcome`] and [`CopySummary`]

#[allow(clippy::module_inception)]
pub mod copier;
pub mod summary;

pub use copier::{PortabilityCopier, TransferLimits, SHUTDOWN_REASON};
pub use summary::{CopyOutcome, CopySummary};
