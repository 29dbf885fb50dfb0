//! Adapter registry
//!
//! Exporters and importers are registered per (service, data vertical).
//! The registry stores factories rather than instances: every job gets its
//! own adapter instances, so any lazily populated cache an adapter keeps
//! (a root album id, a resolved folder) lives exactly as long as one job.

use super::traits::{Exporter, Importer};
use crate::domain::{DataVertical, PortaError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a fresh exporter for one job
pub type ExporterFactory = Arc<dyn Fn() -> Arc<dyn Exporter> + Send + Sync>;

/// Builds a fresh importer for one job
pub type ImporterFactory = Arc<dyn Fn() -> Arc<dyn Importer> + Send + Sync>;

type AdapterKey = (String, DataVertical);

fn key(service: &str, vertical: DataVertical) -> AdapterKey {
    (service.trim().to_lowercase(), vertical)
}

/// Lookup table of transfer adapters
#[derive(Default, Clone)]
pub struct TransferRegistry {
    exporters: HashMap<AdapterKey, ExporterFactory>,
    importers: HashMap<AdapterKey, ImporterFactory>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exporter factory; replaces an earlier registration
    pub fn register_exporter<F>(&mut self, service: &str, vertical: DataVertical, factory: F)
    where
        F: Fn() -> Arc<dyn Exporter> + Send + Sync + 'static,
    {
        tracing::debug!(service, vertical = %vertical, "Registered exporter");
        self.exporters
            .insert(key(service, vertical), Arc::new(factory));
    }

    /// Register an importer factory; replaces an earlier registration
    pub fn register_importer<F>(&mut self, service: &str, vertical: DataVertical, factory: F)
    where
        F: Fn() -> Arc<dyn Importer> + Send + Sync + 'static,
    {
        tracing::debug!(service, vertical = %vertical, "Registered importer");
        self.importers
            .insert(key(service, vertical), Arc::new(factory));
    }

    /// A fresh exporter for one job
    ///
    /// # Errors
    ///
    /// Returns `PortaError::Transfer` if no exporter is registered.
    pub fn exporter(&self, service: &str, vertical: DataVertical) -> Result<Arc<dyn Exporter>> {
        self.exporters
            .get(&key(service, vertical))
            .map(|factory| factory())
            .ok_or_else(|| {
                PortaError::Transfer(format!(
                    "No exporter registered for service '{service}' and vertical {vertical}"
                ))
            })
    }

    /// A fresh importer for one job
    ///
    /// # Errors
    ///
    /// Returns `PortaError::Transfer` if no importer is registered.
    pub fn importer(&self, service: &str, vertical: DataVertical) -> Result<Arc<dyn Importer>> {
        self.importers
            .get(&key(service, vertical))
            .map(|factory| factory())
            .ok_or_else(|| {
                PortaError::Transfer(format!(
                    "No importer registered for service '{service}' and vertical {vertical}"
                ))
            })
    }

    /// Whether a job from `export_service` to `import_service` can run
    pub fn supports(&self, export_service: &str, import_service: &str, vertical: DataVertical) -> bool {
        self.exporters.contains_key(&key(export_service, vertical))
            && self.importers.contains_key(&key(import_service, vertical))
    }

    /// Registered (service, vertical) pairs, sorted, for diagnostics
    pub fn registrations(&self) -> Vec<String> {
        let mut entries: Vec<String> = self
            .exporters
            .keys()
            .map(|(s, v)| format!("export:{s}:{v}"))
            .chain(self.importers.keys().map(|(s, v)| format!("import:{s}:{v}")))
            .collect();
        entries.sort();
        entries
    }
}

impl std::fmt::Debug for TransferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRegistry")
            .field("registrations", &self.registrations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::transfer::traits::{ExportInformation, ExportResult};
    use crate::domain::{AuthData, JobId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EmptyExporter;

    #[async_trait]
    impl Exporter for EmptyExporter {
        async fn export(
            &self,
            _job_id: JobId,
            _auth: &AuthData,
            _info: Option<&ExportInformation>,
        ) -> Result<ExportResult> {
            Ok(ExportResult::end(None))
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = TransferRegistry::new();
        registry.register_exporter("Flickr", DataVertical::Photos, || Arc::new(EmptyExporter));

        assert!(registry.exporter("flickr", DataVertical::Photos).is_ok());
        assert!(registry.exporter(" FLICKR ", DataVertical::Photos).is_ok());
        assert!(registry.exporter("flickr", DataVertical::Videos).is_err());
        assert!(registry.importer("flickr", DataVertical::Photos).is_err());
    }

    #[test]
    fn test_each_lookup_builds_a_new_instance() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();

        let mut registry = TransferRegistry::new();
        registry.register_exporter("svc", DataVertical::Photos, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(EmptyExporter)
        });

        let a = registry.exporter("svc", DataVertical::Photos).unwrap();
        let b = registry.exporter("svc", DataVertical::Photos).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_supports_requires_both_sides() {
        let mut registry = TransferRegistry::new();
        registry.register_exporter("src", DataVertical::Photos, || Arc::new(EmptyExporter));
        assert!(!registry.supports("src", "dst", DataVertical::Photos));
        assert_eq!(registry.registrations(), vec!["export:src:PHOTOS".to_string()]);
    }
}
