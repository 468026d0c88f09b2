//! Review audit log persistence
//!
//! Append-only: entries are inserted and listed, never updated or deleted.

use rostra_common::models::{ReviewDecision, ReviewEntry, SubjectRef};
use rostra_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Append one review entry
pub async fn insert_entry(pool: &SqlitePool, entry: &ReviewEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO review_entries (
            id, observation_id, batch_id, reviewer_id, reviewer_email,
            decision, comment, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.observation_id.map(|id| id.to_string()))
    .bind(entry.batch_id.map(|id| id.to_string()))
    .bind(entry.reviewer_id.to_string())
    .bind(&entry.reviewer_email)
    .bind(entry.decision.as_str())
    .bind(&entry.comment)
    .bind(entry.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// All entries for one subject, newest first
pub async fn list_for_subject(pool: &SqlitePool, subject: SubjectRef) -> Result<Vec<ReviewEntry>> {
    let (column, id) = subject_column(subject);
    let sql = format!(
        "SELECT * FROM review_entries WHERE {column} = ? ORDER BY created_at DESC"
    );

    let rows = sqlx::query(&sql).bind(id.to_string()).fetch_all(pool).await?;
    rows.iter().map(row_to_entry).collect()
}

/// Most recent entry for one subject, if any
pub async fn latest_for_subject(
    pool: &SqlitePool,
    subject: SubjectRef,
) -> Result<Option<ReviewEntry>> {
    let (column, id) = subject_column(subject);
    let sql = format!(
        "SELECT * FROM review_entries WHERE {column} = ? ORDER BY created_at DESC LIMIT 1"
    );

    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.map(|r| row_to_entry(&r)).transpose()
}

/// Most recent entries across all subjects
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<ReviewEntry>> {
    let rows = sqlx::query("SELECT * FROM review_entries ORDER BY created_at DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_entry).collect()
}

fn subject_column(subject: SubjectRef) -> (&'static str, Uuid) {
    match subject {
        SubjectRef::Observation(id) => ("observation_id", id),
        SubjectRef::Batch(id) => ("batch_id", id),
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<ReviewEntry> {
    let id: String = row.get("id");
    let observation_id: Option<String> = row.get("observation_id");
    let batch_id: Option<String> = row.get("batch_id");
    let reviewer_id: String = row.get("reviewer_id");
    let decision: String = row.get("decision");
    let created_at: String = row.get("created_at");

    let parse_uuid = |s: &str, what: &str| {
        Uuid::parse_str(s).map_err(|e| Error::Internal(format!("bad {what}: {e}")))
    };

    Ok(ReviewEntry {
        id: parse_uuid(&id, "entry id")?,
        observation_id: observation_id
            .as_deref()
            .map(|s| parse_uuid(s, "observation id"))
            .transpose()?,
        batch_id: batch_id
            .as_deref()
            .map(|s| parse_uuid(s, "batch id"))
            .transpose()?,
        reviewer_id: parse_uuid(&reviewer_id, "reviewer id")?,
        reviewer_email: row.get("reviewer_email"),
        decision: decision.parse::<ReviewDecision>()?,
        comment: row.get("comment"),
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Internal(format!("bad created_at: {e}")))?
            .with_timezone(&chrono::Utc),
    })
}
