//! Bulk batch persistence

use rostra_common::models::{BulkBatch, IngestState, ReviewStatus};
use rostra_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Insert the batch row. Must happen before any record chunk is written.
pub async fn insert_batch(pool: &SqlitePool, batch: &BulkBatch) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bulk_batches (
            id, batch_name, category_key, tag_value, id_column_name,
            record_count, chunks_committed, ingest_state, notes,
            submitted_by, submitted_by_email, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(batch.id.to_string())
    .bind(&batch.batch_name)
    .bind(&batch.category_key)
    .bind(&batch.tag_value)
    .bind(&batch.id_column_name)
    .bind(batch.record_count)
    .bind(batch.chunks_committed)
    .bind(batch.ingest_state.as_str())
    .bind(&batch.notes)
    .bind(batch.submitted_by.to_string())
    .bind(&batch.submitted_by_email)
    .bind(batch.status.as_str())
    .bind(batch.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one batch by id
pub async fn get_batch(pool: &SqlitePool, id: Uuid) -> Result<Option<BulkBatch>> {
    let row = sqlx::query("SELECT * FROM bulk_batches WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_batch(&r)).transpose()
}

/// Newest-first batch list
pub async fn list_batches(pool: &SqlitePool) -> Result<Vec<BulkBatch>> {
    let rows = sqlx::query("SELECT * FROM bulk_batches ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_batch).collect()
}

/// Record the batch's ingestion state transition
pub async fn set_ingest_state(pool: &SqlitePool, id: Uuid, state: IngestState) -> Result<()> {
    sqlx::query("UPDATE bulk_batches SET ingest_state = ? WHERE id = ?")
        .bind(state.as_str())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Current review status, if the batch exists
pub async fn get_status(pool: &SqlitePool, id: Uuid) -> Result<Option<ReviewStatus>> {
    let status = sqlx::query_scalar::<_, String>("SELECT status FROM bulk_batches WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    status.map(|s| s.parse()).transpose()
}

/// Compare-and-set status transition out of `pending`
pub async fn update_status_if_pending(
    pool: &SqlitePool,
    id: Uuid,
    status: ReviewStatus,
) -> Result<bool> {
    let result = sqlx::query("UPDATE bulk_batches SET status = ? WHERE id = ? AND status = 'pending'")
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn row_to_batch(row: &sqlx::sqlite::SqliteRow) -> Result<BulkBatch> {
    let id: String = row.get("id");
    let submitted_by: String = row.get("submitted_by");
    let ingest_state: String = row.get("ingest_state");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(BulkBatch {
        id: Uuid::parse_str(&id).map_err(|e| Error::Internal(format!("bad batch id: {e}")))?,
        batch_name: row.get("batch_name"),
        category_key: row.get("category_key"),
        tag_value: row.get("tag_value"),
        id_column_name: row.get("id_column_name"),
        record_count: row.get("record_count"),
        chunks_committed: row.get("chunks_committed"),
        ingest_state: ingest_state.parse::<IngestState>()?,
        notes: row.get("notes"),
        submitted_by: Uuid::parse_str(&submitted_by)
            .map_err(|e| Error::Internal(format!("bad submitter id: {e}")))?,
        submitted_by_email: row.get("submitted_by_email"),
        status: status.parse::<ReviewStatus>()?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Internal(format!("bad created_at: {e}")))?
            .with_timezone(&chrono::Utc),
    })
}
