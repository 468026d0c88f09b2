//! Core services: CSV ingestion, batch submission, review, export

pub mod csv_ingest;
pub mod export;
pub mod registry;
pub mod review;
pub mod submission;

pub use csv_ingest::{parse_csv, validate_config, ParseError, ParsedCsv, SubmissionConfig, ValidationError};
pub use export::{export_batch, ExportError};
pub use registry::CategoryRegistry;
pub use review::{ReviewEngine, ReviewError};
pub use submission::{BatchWriter, SqliteBatchWriter, SubmissionEngine, SubmissionError};

use rostra_common::Error;
use std::future::Future;
use std::time::Duration;

/// Bound a store write; expiry is reported as the corresponding failure
pub(crate) async fn with_write_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = rostra_common::Result<T>>,
) -> rostra_common::Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(timeout.as_millis() as u64)),
    }
}
