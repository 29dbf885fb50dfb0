//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use porta::adapters::jobstore::JobStore;
use porta::adapters::transfer::{ExportInformation, ExportResult, Exporter, ImportResult, Importer};
use porta::core::executor::IdempotentImportExecutor;
use porta::core::worker::seal_credentials_with_key;
use porta::crypto::CryptoTransformation;
use porta::domain::{
    AuthData, ContainerResource, DataVertical, JobId, MediaItem, PortaError, PortabilityJob,
    Result,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

pub const SOURCE: &str = "source";
pub const DESTINATION: &str = "archive";

/// Creates a photos job with sealed credentials that a worker can claim
pub async fn ready_job(store: &dyn JobStore, key: &str) -> JobId {
    let job_id = JobId::new();
    store
        .create_job(
            job_id,
            PortabilityJob::new(DataVertical::Photos, SOURCE, DESTINATION),
        )
        .await
        .unwrap();
    let sealed = seal_credentials_with_key(
        CryptoTransformation::Aes256Gcm,
        key,
        &AuthData::token("export-token"),
        &AuthData::token("import-token"),
    )
    .unwrap();
    store.update_job_with_credentials(job_id, sealed).await.unwrap();
    store
        .update_job_auth_state_to_creds_available(job_id)
        .await
        .unwrap();
    job_id
}

/// A page of photos with the given ids
pub fn photos(ids: &[&str]) -> Option<ContainerResource> {
    Some(ContainerResource::Photos {
        albums: vec![],
        photos: ids
            .iter()
            .map(|id| MediaItem::new(*id, format!("Photo {id}")))
            .collect(),
    })
}

/// Replays scripted export results and records every request
///
/// Once the script runs out it answers END with no data.
pub struct ScriptedExporter {
    script: Mutex<Vec<ExportResult>>,
    calls: Mutex<Vec<Option<ExportInformation>>>,
}

impl ScriptedExporter {
    pub fn new(mut script: Vec<ExportResult>) -> Self {
        script.reverse();
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Option<ExportInformation>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exporter for ScriptedExporter {
    async fn export(
        &self,
        _job_id: JobId,
        auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult> {
        assert_eq!(auth.bearer_token(), "export-token");
        self.calls.lock().unwrap().push(info.cloned());
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| ExportResult::end(None)))
    }
}

/// Imports photos through the executor; listed ids fail with an I/O error
#[derive(Default)]
pub struct FlakyImporter {
    failing: HashSet<String>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl FlakyImporter {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// How often the destination was actually called for an item
    pub fn attempts(&self, id: &str) -> u32 {
        self.attempts.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    async fn create(&self, id: String) -> Result<String> {
        *self.attempts.lock().unwrap().entry(id.clone()).or_insert(0) += 1;
        if self.failing.contains(&id) {
            return Err(PortaError::Io(format!("connection reset while uploading {id}")));
        }
        Ok(format!("dest-{id}"))
    }
}

#[async_trait]
impl Importer for FlakyImporter {
    async fn import_item(
        &self,
        _job_id: JobId,
        executor: &dyn IdempotentImportExecutor,
        auth: &AuthData,
        data: &ContainerResource,
    ) -> Result<ImportResult> {
        assert_eq!(auth.bearer_token(), "import-token");
        let ContainerResource::Photos { photos, .. } = data else {
            return Ok(ImportResult::error("unsupported page"));
        };

        let mut imported = 0;
        for photo in photos {
            let key = photo.idempotent_id();
            let created = executor
                .execute_and_swallow_io_errors(
                    &key,
                    &photo.title,
                    Box::pin(self.create(key.clone())),
                )
                .await?;
            if created.is_some() {
                imported += 1;
            }
        }
        Ok(ImportResult::ok().with_counts(BTreeMap::from([("photos".to_string(), imported)])))
    }
}
