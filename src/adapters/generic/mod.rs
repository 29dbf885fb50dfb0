//! Generic HTTP/JSON destination adapter

pub mod importer;

pub use importer::GenericImporter;

use crate::adapters::jobstore::JobStore;
use crate::adapters::transfer::{Importer, TransferRegistry};
use crate::config::GenericConfig;
use crate::domain::{DataVertical, Result};
use std::sync::Arc;

/// Verticals the generic importer accepts
pub const SUPPORTED_VERTICALS: &[DataVertical] = &[
    DataVertical::Photos,
    DataVertical::Videos,
    DataVertical::SocialPosts,
];

/// Register the generic importer under its configured service name
///
/// The configuration is checked once here so the per-job factory cannot
/// fail. The importer keeps no per-job state, so jobs share one instance.
///
/// # Errors
///
/// Returns `PortaError::Configuration` if the base URL is invalid.
pub fn register(
    registry: &mut TransferRegistry,
    config: &GenericConfig,
    job_store: Arc<dyn JobStore>,
) -> Result<()> {
    let prototype = Arc::new(GenericImporter::new(config, job_store)?);
    for vertical in SUPPORTED_VERTICALS {
        let importer = prototype.clone();
        registry.register_importer(&config.service_name, *vertical, move || {
            importer.clone() as Arc<dyn Importer>
        });
    }
    tracing::info!(
        service = %config.service_name,
        base_url = %config.base_url,
        "Registered generic importer"
    );
    Ok(())
}
