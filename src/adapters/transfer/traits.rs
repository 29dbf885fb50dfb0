//! Adapter contract between the core and provider connectors
//!
//! An [`Exporter`] pages through the user's data on the source service; an
//! [`Importer`] writes one page into the destination service. Importers
//! route every creation through the [`IdempotentImportExecutor`] so a
//! retried page never creates the same object twice.

use crate::core::executor::IdempotentImportExecutor;
use crate::domain::{AuthData, ContainerRef, ContainerResource, JobId, PortaError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome kind of one export page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    /// More data follows; continuation data says where
    Continue,
    /// Export is exhausted
    End,
    /// Unrecoverable failure; the job is aborted
    Error,
}

/// Where the next export call should resume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationData {
    /// Token for the next page of the current container
    #[serde(default)]
    pub pagination_token: Option<String>,

    /// Sub-containers still to be exported
    #[serde(default)]
    pub containers: Vec<ContainerRef>,
}

impl ContinuationData {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            pagination_token: Some(token.into()),
            containers: Vec::new(),
        }
    }

    pub fn with_containers(containers: Vec<ContainerRef>) -> Self {
        Self {
            pagination_token: None,
            containers,
        }
    }

    /// Whether there is anything left to export
    pub fn has_work(&self) -> bool {
        self.pagination_token.is_some() || !self.containers.is_empty()
    }
}

/// What an exporter receives: a page token and/or the container to export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportInformation {
    #[serde(default)]
    pub pagination_token: Option<String>,
    #[serde(default)]
    pub container: Option<ContainerRef>,
}

impl ExportInformation {
    pub fn page(token: impl Into<String>, container: Option<ContainerRef>) -> Self {
        Self {
            pagination_token: Some(token.into()),
            container,
        }
    }

    pub fn container(container: ContainerRef) -> Self {
        Self {
            pagination_token: None,
            container: Some(container),
        }
    }
}

/// Result of one export call
#[derive(Debug, Clone)]
pub struct ExportResult<T = ContainerResource> {
    pub result_type: ResultType,
    pub exported_data: Option<T>,
    pub continuation_data: Option<ContinuationData>,
    pub message: Option<String>,
    /// Captured failure text for `Error` results
    pub error: Option<String>,
}

impl<T> ExportResult<T> {
    /// A page with more data to follow
    pub fn continue_with(data: Option<T>, continuation: ContinuationData) -> Self {
        Self {
            result_type: ResultType::Continue,
            exported_data: data,
            continuation_data: Some(continuation),
            message: None,
            error: None,
        }
    }

    /// The final page
    pub fn end(data: Option<T>) -> Self {
        Self {
            result_type: ResultType::End,
            exported_data: data,
            continuation_data: None,
            message: None,
            error: None,
        }
    }

    /// An unrecoverable export failure
    pub fn error(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            result_type: ResultType::Error,
            exported_data: None,
            continuation_data: None,
            message: Some(message.into()),
            error,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Checks the result-type invariants
    ///
    /// # Errors
    ///
    /// Returns `PortaError::Transfer` for a `Continue` result without
    /// continuation data.
    pub fn validate(&self) -> Result<()> {
        match self.result_type {
            ResultType::Continue if self.continuation_data.is_none() => Err(PortaError::Transfer(
                "exporter returned CONTINUE without continuation data".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Outcome kind of one import call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportResultType {
    Ok,
    Error,
}

/// Result of importing one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub result_type: ImportResultType,

    /// Imported item counts keyed by item kind (e.g. `albums`, `photos`)
    #[serde(default)]
    pub counts: Option<BTreeMap<String, u64>>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ImportResult {
    pub fn ok() -> Self {
        Self {
            result_type: ImportResultType::Ok,
            counts: None,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result_type: ImportResultType::Error,
            counts: None,
            message: Some(message.into()),
        }
    }

    pub fn with_counts(mut self, counts: BTreeMap<String, u64>) -> Self {
        self.counts = Some(counts);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.result_type == ImportResultType::Ok
    }
}

/// Reads pages of data from a source service
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Export one page
    ///
    /// `info` is `None` for the first call of a job.
    async fn export(
        &self,
        job_id: JobId,
        auth: &AuthData,
        info: Option<&ExportInformation>,
    ) -> Result<ExportResult>;
}

/// Writes pages of data into a destination service
#[async_trait]
pub trait Importer: Send + Sync {
    /// Import one exported page
    ///
    /// Per-item failures should go through
    /// [`IdempotentImportExecutor::execute_and_swallow_io_errors`] so the rest
    /// of the page still imports. An `Err` return aborts the job.
    async fn import_item(
        &self,
        job_id: JobId,
        executor: &dyn IdempotentImportExecutor,
        auth: &AuthData,
        data: &ContainerResource,
    ) -> Result<ImportResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue_requires_continuation() {
        let mut result: ExportResult =
            ExportResult::continue_with(None, ContinuationData::with_token("T1"));
        assert!(result.validate().is_ok());

        result.continuation_data = None;
        assert!(matches!(result.validate(), Err(PortaError::Transfer(_))));
    }

    #[test]
    fn test_end_and_error_validate() {
        assert!(ExportResult::<ContainerResource>::end(None).validate().is_ok());
        let err = ExportResult::<ContainerResource>::error("boom", Some("io".to_string()));
        assert_eq!(err.result_type, ResultType::Error);
        assert!(err.validate().is_ok());
    }

    #[test]
    fn test_continuation_has_work() {
        assert!(!ContinuationData::default().has_work());
        assert!(ContinuationData::with_token("t").has_work());
        assert!(ContinuationData::with_containers(vec![ContainerRef::new("a")]).has_work());
    }

    #[test]
    fn test_import_result_counts() {
        let mut counts = BTreeMap::new();
        counts.insert("photos".to_string(), 3);
        let result = ImportResult::ok().with_counts(counts);
        assert!(result.is_ok());
        assert_eq!(result.counts.unwrap()["photos"], 3);
        assert!(!ImportResult::error("nope").is_ok());
    }
}
