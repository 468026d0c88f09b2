//! Bulk record persistence
//!
//! Records are owned by their batch and written in chunk-sized bulk
//! inserts; there is no single-record write path.

use rostra_common::models::BulkRecord;
use rostra_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Write one chunk of records as a single multi-row insert.
///
/// Generic over the executor so the submission writer can run it inside
/// the same transaction that advances the batch's chunk cursor.
pub async fn insert_chunk<'e, E>(executor: E, records: &[BulkRecord]) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    if records.is_empty() {
        return Ok(());
    }

    // Serialize row maps up front so the bulk insert below cannot fail
    // halfway through binding
    let mut prepared = Vec::with_capacity(records.len());
    for record in records {
        let original_row = serde_json::to_string(&record.original_row)
            .map_err(|e| Error::Internal(format!("Failed to serialize row: {e}")))?;
        prepared.push((
            record.id.to_string(),
            record.batch_id.to_string(),
            record.record_identifier.clone(),
            original_row,
        ));
    }

    let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
        "INSERT INTO bulk_records (id, batch_id, record_identifier, original_row) ",
    );
    qb.push_values(prepared, |mut b, (id, batch_id, identifier, original_row)| {
        b.push_bind(id)
            .push_bind(batch_id)
            .push_bind(identifier)
            .push_bind(original_row);
    });

    qb.build().execute(executor).await?;

    Ok(())
}

/// Number of records actually persisted for a batch
pub async fn count_for_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bulk_records WHERE batch_id = ?")
        .bind(batch_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// First `limit` records of a batch, for review display
pub async fn list_sample(pool: &SqlitePool, batch_id: Uuid, limit: i64) -> Result<Vec<BulkRecord>> {
    let rows = sqlx::query("SELECT * FROM bulk_records WHERE batch_id = ? LIMIT ?")
        .bind(batch_id.to_string())
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_record).collect()
}

/// Every record of a batch, for export
pub async fn list_all(pool: &SqlitePool, batch_id: Uuid) -> Result<Vec<BulkRecord>> {
    let rows = sqlx::query("SELECT * FROM bulk_records WHERE batch_id = ?")
        .bind(batch_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_record).collect()
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<BulkRecord> {
    let id: String = row.get("id");
    let batch_id: String = row.get("batch_id");
    let original_row: String = row.get("original_row");

    let original_row: BTreeMap<String, String> = serde_json::from_str(&original_row)
        .map_err(|e| Error::Internal(format!("Failed to deserialize row: {e}")))?;

    Ok(BulkRecord {
        id: Uuid::parse_str(&id).map_err(|e| Error::Internal(format!("bad record id: {e}")))?,
        batch_id: Uuid::parse_str(&batch_id)
            .map_err(|e| Error::Internal(format!("bad batch id: {e}")))?,
        record_identifier: row.get("record_identifier"),
        original_row,
    })
}
