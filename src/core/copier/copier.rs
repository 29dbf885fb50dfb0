//! The job-driving continuation loop
//!
//! Pages are processed strictly in the order the exporter hands out
//! continuation data. Within one page, the next page of the current
//! container is exported before any sub-container it announced, and
//! sub-containers are exported depth-first in the order given.

use super::summary::{CopyOutcome, CopySummary};
use crate::adapters::jobstore::JobStore;
use crate::adapters::transfer::{ExportInformation, Exporter, Importer, ResultType};
use crate::core::executor::IdempotentImportExecutor;
use crate::domain::{AuthData, JobId};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Failure reason recorded when the worker stops mid-job
pub const SHUTDOWN_REASON: &str = "worker shutdown";

/// Hard bounds on one copy run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLimits {
    /// Maximum export pages per job
    pub max_export_pages: u64,

    /// Maximum wall-clock time per job
    pub max_job_duration: Duration,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            max_export_pages: 10_000,
            max_job_duration: Duration::from_secs(86_400),
        }
    }
}

/// Drives one job from export through import
pub struct PortabilityCopier {
    job_store: Arc<dyn JobStore>,
    limits: TransferLimits,
}

impl PortabilityCopier {
    pub fn new(job_store: Arc<dyn JobStore>, limits: TransferLimits) -> Self {
        Self { job_store, limits }
    }

    pub fn limits(&self) -> TransferLimits {
        self.limits
    }

    /// Copy all data of one job
    ///
    /// Never returns an error: every failure becomes
    /// [`CopyOutcome::Failed`] so the caller can record it on the job.
    /// The job record is re-read before each page; if it turned terminal
    /// (timed out or canceled) no further page is started.
    #[allow(clippy::too_many_arguments)]
    pub async fn copy(
        &self,
        exporter: &dyn Exporter,
        importer: &dyn Importer,
        export_auth: &AuthData,
        import_auth: &AuthData,
        job_id: JobId,
        executor: &dyn IdempotentImportExecutor,
        shutdown: &watch::Receiver<bool>,
    ) -> (CopyOutcome, CopySummary) {
        let start_time = Instant::now();
        let mut summary = CopySummary::new();

        let outcome = self
            .run(
                exporter,
                importer,
                export_auth,
                import_auth,
                job_id,
                executor,
                shutdown,
                start_time,
                &mut summary,
            )
            .await;

        summary.errors = executor.errors().await;
        summary.duration = start_time.elapsed();
        summary.log_summary(&outcome);
        (outcome, summary)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        exporter: &dyn Exporter,
        importer: &dyn Importer,
        export_auth: &AuthData,
        import_auth: &AuthData,
        job_id: JobId,
        executor: &dyn IdempotentImportExecutor,
        shutdown: &watch::Receiver<bool>,
        start_time: Instant,
        summary: &mut CopySummary,
    ) -> CopyOutcome {
        // Stack of pending export calls; `None` is the first call of the job
        let mut pending: Vec<Option<ExportInformation>> = vec![None];

        while let Some(info) = pending.pop() {
            if *shutdown.borrow() {
                tracing::warn!(job_id = %job_id, "Shutdown requested; stopping copy");
                return CopyOutcome::failed(SHUTDOWN_REASON, None);
            }
            if summary.pages_exported >= self.limits.max_export_pages {
                return CopyOutcome::failed(
                    format!(
                        "export exceeded the limit of {} pages",
                        self.limits.max_export_pages
                    ),
                    None,
                );
            }
            if start_time.elapsed() > self.limits.max_job_duration {
                return CopyOutcome::failed(
                    format!(
                        "job exceeded the maximum duration of {}s",
                        self.limits.max_job_duration.as_secs()
                    ),
                    None,
                );
            }

            match self.job_store.find_job(job_id).await {
                Ok(job) if job.is_terminal() => {
                    tracing::info!(job_id = %job_id, state = %job.state, "Job ended externally; stopping copy");
                    return CopyOutcome::Canceled;
                }
                Ok(_) => {}
                Err(e) => {
                    return CopyOutcome::failed("could not re-read job record", Some(e.to_string()));
                }
            }

            tracing::debug!(
                job_id = %job_id,
                page = summary.pages_exported + 1,
                token = ?info.as_ref().and_then(|i| i.pagination_token.as_deref()),
                container = ?info.as_ref().and_then(|i| i.container.as_ref()).map(|c| c.id.as_str()),
                "Exporting page"
            );

            let result = match exporter.export(job_id, export_auth, info.as_ref()).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Export failed");
                    return CopyOutcome::failed("export failed", Some(e.to_string()));
                }
            };
            if let Err(e) = result.validate() {
                return CopyOutcome::failed("exporter returned an invalid result", Some(e.to_string()));
            }
            summary.pages_exported += 1;

            if result.result_type == ResultType::Error {
                let reason = result
                    .message
                    .unwrap_or_else(|| "exporter reported an error".to_string());
                tracing::error!(job_id = %job_id, reason = %reason, "Export page returned ERROR");
                return CopyOutcome::failed(reason, result.error);
            }

            if let Some(data) = result.exported_data.as_ref().filter(|d| !d.is_empty()) {
                summary.items_exported += data.item_count() as u64;
                match importer.import_item(job_id, executor, import_auth, data).await {
                    Ok(import) if import.is_ok() => {
                        if let Some(counts) = &import.counts {
                            summary.add_counts(counts);
                        }
                    }
                    Ok(import) => {
                        return CopyOutcome::failed(
                            import
                                .message
                                .unwrap_or_else(|| "importer reported an error".to_string()),
                            None,
                        );
                    }
                    Err(e) => {
                        tracing::error!(job_id = %job_id, error = %e, "Import failed");
                        return CopyOutcome::failed("import failed", Some(e.to_string()));
                    }
                }
            }

            if result.result_type == ResultType::End {
                continue;
            }

            let Some(continuation) = result.continuation_data else {
                continue;
            };
            let current_container = info.as_ref().and_then(|i| i.container.clone());

            for container in continuation.containers.into_iter().rev() {
                let next = ExportInformation::container(container);
                if info.as_ref() == Some(&next) {
                    return non_advancing(job_id);
                }
                pending.push(Some(next));
            }
            if let Some(token) = continuation.pagination_token {
                let next = ExportInformation::page(token, current_container);
                if info.as_ref() == Some(&next) {
                    return non_advancing(job_id);
                }
                pending.push(Some(next));
            }
        }

        CopyOutcome::Completed
    }
}

fn non_advancing(job_id: JobId) -> CopyOutcome {
    tracing::error!(job_id = %job_id, "Exporter returned the same continuation twice");
    CopyOutcome::failed("export did not advance past its continuation", None)
}

impl std::fmt::Debug for PortabilityCopier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortabilityCopier")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::jobstore::InMemoryJobStore;
    use crate::adapters::transfer::{ContinuationData, ExportResult, ImportResult};
    use crate::core::executor::InMemoryIdempotentImportExecutor;
    use crate::domain::{
        ContainerRef, ContainerResource, DataVertical, MediaItem, PortabilityJob, Result,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays scripted results and remembers what it was asked for
    struct ScriptedExporter {
        script: Mutex<Vec<ExportResult>>,
        calls: Mutex<Vec<Option<ExportInformation>>>,
    }

    impl ScriptedExporter {
        fn new(mut script: Vec<ExportResult>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Option<ExportInformation>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Exporter for ScriptedExporter {
        async fn export(
            &self,
            _job_id: JobId,
            _auth: &AuthData,
            info: Option<&ExportInformation>,
        ) -> Result<ExportResult> {
            self.calls.lock().unwrap().push(info.cloned());
            Ok(self
                .script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| ExportResult::end(None)))
        }
    }

    struct CountingImporter;

    #[async_trait]
    impl Importer for CountingImporter {
        async fn import_item(
            &self,
            _job_id: JobId,
            _executor: &dyn IdempotentImportExecutor,
            _auth: &AuthData,
            data: &ContainerResource,
        ) -> Result<ImportResult> {
            let mut counts = std::collections::BTreeMap::new();
            counts.insert("items".to_string(), data.item_count() as u64);
            Ok(ImportResult::ok().with_counts(counts))
        }
    }

    fn page(ids: &[&str]) -> Option<ContainerResource> {
        Some(ContainerResource::Photos {
            albums: vec![],
            photos: ids.iter().map(|id| MediaItem::new(*id, *id)).collect(),
        })
    }

    async fn run(
        exporter: &ScriptedExporter,
        limits: TransferLimits,
    ) -> (Arc<InMemoryJobStore>, CopyOutcome, CopySummary) {
        let store = Arc::new(InMemoryJobStore::new());
        let job_id = JobId::new();
        store
            .create_job(job_id, PortabilityJob::new(DataVertical::Photos, "a", "b"))
            .await
            .unwrap();
        let executor = InMemoryIdempotentImportExecutor::new(job_id, store.clone());
        let copier = PortabilityCopier::new(store.clone(), limits);
        let (_tx, rx) = watch::channel(false);
        let auth = AuthData::token("t");

        let (outcome, summary) = copier
            .copy(exporter, &CountingImporter, &auth, &auth, job_id, &executor, &rx)
            .await;
        (store, outcome, summary)
    }

    #[tokio::test]
    async fn test_sub_containers_follow_next_page() {
        let exporter = ScriptedExporter::new(vec![
            ExportResult::continue_with(
                page(&["p1"]),
                ContinuationData {
                    pagination_token: Some("T1".to_string()),
                    containers: vec![ContainerRef::new("a1"), ContainerRef::new("a2")],
                },
            ),
            ExportResult::end(page(&["p2"])),
            ExportResult::end(page(&["a1-p"])),
            ExportResult::end(page(&["a2-p"])),
        ]);

        let (_store, outcome, summary) = run(&exporter, TransferLimits::default()).await;
        assert_eq!(outcome, CopyOutcome::Completed);
        assert_eq!(summary.pages_exported, 4);
        assert_eq!(summary.import_counts["items"], 4);

        let calls = exporter.calls();
        assert_eq!(calls[0], None);
        assert_eq!(calls[1], Some(ExportInformation::page("T1", None)));
        assert_eq!(calls[2], Some(ExportInformation::container(ContainerRef::new("a1"))));
        assert_eq!(calls[3], Some(ExportInformation::container(ContainerRef::new("a2"))));
    }

    #[tokio::test]
    async fn test_non_advancing_token_fails() {
        let exporter = ScriptedExporter::new(vec![
            ExportResult::continue_with(None, ContinuationData::with_token("T1")),
            ExportResult::continue_with(None, ContinuationData::with_token("T1")),
        ]);

        let (_store, outcome, _summary) = run(&exporter, TransferLimits::default()).await;
        assert!(matches!(outcome, CopyOutcome::Failed { ref reason, .. } if reason.contains("did not advance")));
        assert_eq!(exporter.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_page_limit() {
        let script = (0..10)
            .map(|i| ExportResult::continue_with(None, ContinuationData::with_token(format!("T{i}"))))
            .collect();
        let exporter = ScriptedExporter::new(script);
        let limits = TransferLimits {
            max_export_pages: 3,
            ..TransferLimits::default()
        };

        let (_store, outcome, summary) = run(&exporter, limits).await;
        assert!(matches!(outcome, CopyOutcome::Failed { ref reason, .. } if reason.contains("3 pages")));
        assert_eq!(summary.pages_exported, 3);
    }

    #[tokio::test]
    async fn test_shutdown_stops_before_first_page() {
        let store = Arc::new(InMemoryJobStore::new());
        let job_id = JobId::new();
        store
            .create_job(job_id, PortabilityJob::new(DataVertical::Photos, "a", "b"))
            .await
            .unwrap();
        let executor = InMemoryIdempotentImportExecutor::new(job_id, store.clone());
        let copier = PortabilityCopier::new(store.clone(), TransferLimits::default());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let exporter = ScriptedExporter::new(vec![]);
        let auth = AuthData::token("t");
        let (outcome, _) = copier
            .copy(&exporter, &CountingImporter, &auth, &auth, job_id, &executor, &rx)
            .await;

        assert_eq!(outcome, CopyOutcome::failed(SHUTDOWN_REASON, None));
        assert!(exporter.calls().is_empty());
    }
}
