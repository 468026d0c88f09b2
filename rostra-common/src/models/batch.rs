//! Bulk tagging batches and their owned records

use crate::models::{IngestState, ReviewStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A named bulk-tagging operation created from an uploaded CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkBatch {
    pub id: Uuid,
    /// Defaults to the source filename when the operator leaves it blank
    pub batch_name: String,
    pub category_key: String,
    pub tag_value: String,
    /// CSV column used as the external record identifier
    pub id_column_name: String,
    /// Declared row count at submission time
    pub record_count: i64,
    /// Resume cursor: number of whole chunks acknowledged by the store
    pub chunks_committed: i64,
    pub ingest_state: IngestState,
    pub notes: Option<String>,
    pub submitted_by: Uuid,
    pub submitted_by_email: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

impl BulkBatch {
    /// True when the declared count disagrees with what was persisted
    pub fn is_partial(&self, persisted_records: i64) -> bool {
        self.record_count != persisted_records
    }
}

/// One row of an ingested CSV, owned exclusively by its batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRecord {
    pub id: Uuid,
    pub batch_id: Uuid,
    /// Textual value of the ID-column cell; empty when the cell was empty
    pub record_identifier: String,
    /// Full source row, column name to cell value
    pub original_row: BTreeMap<String, String>,
}

impl BulkRecord {
    /// Build a record from a parsed CSV row and the configured ID column
    pub fn from_row(batch_id: Uuid, id_column: &str, row: BTreeMap<String, String>) -> Self {
        let record_identifier = row.get(id_column).cloned().unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            batch_id,
            record_identifier,
            original_row: row,
        }
    }
}
