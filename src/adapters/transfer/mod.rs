//! Transfer adapter contract
//!
//! - [`traits`] - [`Exporter`], [`Importer`] and their result types
//! - [`registry`] - Adapter factories keyed by service and data vertical
//! - [`response`] - Provider response classification

pub mod registry;
pub mod response;
pub mod traits;

pub use registry::{ExporterFactory, ImporterFactory, TransferRegistry};
pub use response::{ProviderResponse, ResponseClass};
pub use traits::{
    ContinuationData, ExportInformation, ExportResult, Exporter, ImportResult, ImportResultType,
    Importer, ResultType,
};
