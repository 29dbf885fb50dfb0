//! Generic HTTP/JSON importer
//!
//! Writes exported pages into any destination that exposes three JSON
//! endpoints, each answering with `{"id": "<destination id>"}`:
//!
//! - `POST {base_url}/albums` - `{title, description}`
//! - `POST {base_url}/media` - `{title, description, album_id, media_type, url | content}`
//! - `POST {base_url}/posts` - `{content, url, published_at}`
//!
//! Albums are created with [`IdempotentImportExecutor::execute_or_throw`]
//! since their items depend on them; items and posts go through the
//! swallowing variant so one bad item does not stop the page.

use crate::adapters::jobstore::JobStore;
use crate::adapters::transfer::{ImportResult, Importer, ProviderResponse};
use crate::config::GenericConfig;
use crate::core::executor::IdempotentImportExecutor;
use crate::domain::{
    AuthData, ContainerResource, JobId, MediaAlbum, MediaItem, PortaError, Result, SocialPost,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, ClientBuilder};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use url::Url;

/// Importer for a generic JSON destination
pub struct GenericImporter {
    base_url: Url,
    client: Client,
    job_store: Arc<dyn JobStore>,
}

impl GenericImporter {
    /// Create an importer for the configured destination
    ///
    /// # Errors
    ///
    /// Returns `PortaError::Configuration` if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &GenericConfig, job_store: Arc<dyn JobStore>) -> Result<Self> {
        // Url::join drops the last path segment unless it ends with a slash
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            PortaError::Configuration(format!("Invalid generic base_url '{}': {e}", config.base_url))
        })?;

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PortaError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            client,
            job_store,
        })
    }

    /// POST a JSON body and return the `id` of the created object
    async fn create(&self, auth: &AuthData, path: &str, body: Value) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PortaError::Configuration(format!("Invalid endpoint '{path}': {e}")))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(auth.bearer_token())
            .json(&body)
            .send()
            .await?;
        let response = ProviderResponse::from_reqwest(response).await?;
        response.error_for_status(&format!("POST {path}"), true)?;
        response.json_value("id")
    }

    async fn create_album(&self, auth: &AuthData, album: &MediaAlbum) -> Result<String> {
        self.create(
            auth,
            "albums",
            json!({ "title": album.name, "description": album.description }),
        )
        .await
    }

    async fn create_media(
        &self,
        job_id: JobId,
        auth: &AuthData,
        item: &MediaItem,
        album_id: Option<String>,
    ) -> Result<String> {
        let mut body = json!({
            "title": item.title,
            "description": item.description,
            "album_id": album_id,
            "media_type": item.media_type,
        });

        if item.in_temp_store {
            let mut stream = self.job_store.get_stream(job_id, &item.data_id).await?;
            let mut content = Vec::with_capacity(stream.size as usize);
            stream.reader.read_to_end(&mut content).await?;
            body["content"] = Value::String(general_purpose::STANDARD.encode(&content));
        } else if let Some(url) = &item.fetchable_url {
            body["url"] = Value::String(url.clone());
        } else {
            return Err(PortaError::Validation(format!(
                "Item {} has neither staged content nor a URL",
                item.data_id
            )));
        }

        self.create(auth, "media", body).await
    }

    async fn create_post(&self, auth: &AuthData, post: &SocialPost) -> Result<String> {
        self.create(
            auth,
            "posts",
            json!({
                "content": post.content,
                "url": post.url,
                "published_at": post.published_at,
            }),
        )
        .await
    }

    async fn import_media(
        &self,
        job_id: JobId,
        executor: &dyn IdempotentImportExecutor,
        auth: &AuthData,
        albums: &[MediaAlbum],
        items: &[MediaItem],
        kind: &str,
    ) -> Result<BTreeMap<String, u64>> {
        let mut counts = BTreeMap::new();

        for album in albums {
            executor
                .execute_or_throw(&album.id, &album.name, Box::pin(self.create_album(auth, album)))
                .await?;
            *counts.entry("albums".to_string()).or_insert(0) += 1;
        }

        for item in items {
            let album_id = match &item.album_id {
                Some(id) => executor.lookup(id).await,
                None => None,
            };
            let key = item.idempotent_id();
            let created = executor
                .execute_and_swallow_io_errors(
                    &key,
                    &item.title,
                    Box::pin(self.create_media(job_id, auth, item, album_id)),
                )
                .await?;
            if created.is_some() {
                *counts.entry(kind.to_string()).or_insert(0) += 1;
            }
        }

        Ok(counts)
    }
}

#[async_trait]
impl Importer for GenericImporter {
    async fn import_item(
        &self,
        job_id: JobId,
        executor: &dyn IdempotentImportExecutor,
        auth: &AuthData,
        data: &ContainerResource,
    ) -> Result<ImportResult> {
        let counts = match data {
            ContainerResource::Photos { albums, photos } => {
                self.import_media(job_id, executor, auth, albums, photos, "photos")
                    .await?
            }
            ContainerResource::Videos { albums, videos } => {
                self.import_media(job_id, executor, auth, albums, videos, "videos")
                    .await?
            }
            ContainerResource::SocialActivity { posts } => {
                let mut imported = 0;
                for post in posts {
                    let created = executor
                        .execute_and_swallow_io_errors(
                            &post.id,
                            &post.id,
                            Box::pin(self.create_post(auth, post)),
                        )
                        .await?;
                    if created.is_some() {
                        imported += 1;
                    }
                }
                BTreeMap::from([("posts".to_string(), imported)])
            }
            ContainerResource::IdOnly(_) => BTreeMap::new(),
        };

        tracing::debug!(job_id = %job_id, counts = ?counts, "Imported page");
        Ok(ImportResult::ok().with_counts(counts))
    }
}

impl std::fmt::Debug for GenericImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericImporter")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
