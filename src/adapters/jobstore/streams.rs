//! Per-job payload staging
//!
//! Large media payloads are staged between export and import so the copier
//! never holds them in memory. Each job owns one directory; file names are
//! the SHA-256 of the caller's key so arbitrary keys are safe on disk.

use super::traits::{ByteReader, InputStream};
use crate::domain::context::ResultExt;
use crate::domain::{JobId, JobStoreError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// Where staged payloads live
#[derive(Debug)]
pub enum PayloadStreams {
    /// Held in process memory; for tests and the in-memory store
    Memory(Mutex<HashMap<(JobId, String), Arc<Vec<u8>>>>),

    /// Files under `<root>/<job-id>/`
    Disk(PathBuf),
}

impl PayloadStreams {
    pub fn memory() -> Self {
        PayloadStreams::Memory(Mutex::new(HashMap::new()))
    }

    pub fn disk(root: impl Into<PathBuf>) -> Self {
        PayloadStreams::Disk(root.into())
    }

    fn job_dir(root: &Path, id: JobId) -> PathBuf {
        root.join(id.to_string())
    }

    fn file_name(key: &str) -> String {
        format!("{:x}", Sha256::digest(key.as_bytes()))
    }

    /// Writes a payload, replacing any earlier one under the same key
    pub async fn write(&self, id: JobId, key: &str, mut reader: ByteReader) -> Result<u64> {
        match self {
            PayloadStreams::Memory(streams) => {
                let mut buffer = Vec::new();
                reader
                    .read_to_end(&mut buffer)
                    .await
                    .with_context(|| format!("Failed to read payload '{key}' for job {id}"))?;
                let size = buffer.len() as u64;
                streams
                    .lock()
                    .await
                    .insert((id, key.to_string()), Arc::new(buffer));
                Ok(size)
            }
            PayloadStreams::Disk(root) => {
                let dir = Self::job_dir(root, id);
                tokio::fs::create_dir_all(&dir)
                    .await
                    .with_context(|| format!("Failed to create stream directory {}", dir.display()))?;

                let target = dir.join(Self::file_name(key));
                let partial = target.with_extension("partial");
                let mut file = tokio::fs::File::create(&partial)
                    .await
                    .with_context(|| format!("Failed to create {}", partial.display()))?;
                let size = tokio::io::copy(&mut reader, &mut file)
                    .await
                    .with_context(|| format!("Failed to stage payload '{key}' for job {id}"))?;
                file.flush().await?;
                file.sync_all().await?;
                drop(file);

                tokio::fs::rename(&partial, &target)
                    .await
                    .with_context(|| format!("Failed to commit {}", target.display()))?;
                Ok(size)
            }
        }
    }

    /// Opens a staged payload
    pub async fn open(&self, id: JobId, key: &str) -> Result<InputStream> {
        let not_found = || JobStoreError::StreamNotFound {
            job_id: id,
            key: key.to_string(),
        };

        match self {
            PayloadStreams::Memory(streams) => {
                let bytes = streams
                    .lock()
                    .await
                    .get(&(id, key.to_string()))
                    .cloned()
                    .ok_or_else(not_found)?;
                let size = bytes.len() as u64;
                let reader = Cursor::new(bytes.as_ref().clone());
                Ok(InputStream::new(Box::new(reader), size))
            }
            PayloadStreams::Disk(root) => {
                let path = Self::job_dir(root, id).join(Self::file_name(key));
                let file = match tokio::fs::File::open(&path).await {
                    Ok(file) => file,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        return Err(not_found().into())
                    }
                    Err(e) => return Err(e).context(format!("Failed to open {}", path.display())),
                };
                let size = file.metadata().await?.len();
                Ok(InputStream::new(Box::new(file), size))
            }
        }
    }

    /// Deletes every payload of the job
    pub async fn remove_all(&self, id: JobId) -> Result<()> {
        match self {
            PayloadStreams::Memory(streams) => {
                streams.lock().await.retain(|(job_id, _), _| *job_id != id);
                Ok(())
            }
            PayloadStreams::Disk(root) => {
                let dir = Self::job_dir(root, id);
                match tokio::fs::remove_dir_all(&dir).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e).context(format!("Failed to remove {}", dir.display())),
                }
            }
        }
    }
}
