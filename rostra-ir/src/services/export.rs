//! Batch CSV export
//!
//! Reconstructs a delimited file from the stored `original_row` maps. The
//! header set is the union of keys across the batch's records; column order
//! is sorted, not the originally uploaded order.

use crate::db;
use rostra_common::Error;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use thiserror::Error as ThisError;
use uuid::Uuid;

#[derive(Debug, ThisError)]
pub enum ExportError {
    #[error("batch {0} not found")]
    NotFound(Uuid),

    #[error("failed to load records: {0}")]
    Store(#[from] Error),

    #[error("failed to encode CSV: {0}")]
    Encode(#[from] csv::Error),
}

/// Rebuild CSV bytes for a batch from its persisted records
pub async fn export_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<Vec<u8>, ExportError> {
    if db::batches::get_batch(pool, batch_id).await?.is_none() {
        return Err(ExportError::NotFound(batch_id));
    }

    let records = db::records::list_all(pool, batch_id).await?;
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let headers: Vec<String> = records
        .iter()
        .flat_map(|r| r.original_row.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;

    for record in &records {
        let row: Vec<&str> = headers
            .iter()
            .map(|h| {
                record
                    .original_row
                    .get(h)
                    .map(String::as_str)
                    .unwrap_or("")
            })
            .collect();
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Encode(csv::Error::from(e.into_error())))
}
