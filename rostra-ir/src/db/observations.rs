//! Observation persistence

use rostra_common::models::{EvidenceType, FieldObserved, Observation, ReviewStatus};
use rostra_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Optional filters for the observation list
#[derive(Debug, Clone, Default)]
pub struct ObservationFilter {
    pub status: Option<ReviewStatus>,
    pub field: Option<FieldObserved>,
    /// Substring match against provider NPI or name
    pub search: Option<String>,
}

/// Insert a new observation row
pub async fn insert_observation(pool: &SqlitePool, obs: &Observation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO observations (
            id, provider_npi, provider_name, payer_name, field_observed,
            system_a_name, system_a_value, system_b_name, system_b_value,
            corrected_value, evidence_type, evidence_notes,
            submitted_by, submitted_by_email, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(obs.id.to_string())
    .bind(&obs.provider_npi)
    .bind(&obs.provider_name)
    .bind(&obs.payer_name)
    .bind(obs.field_observed.as_str())
    .bind(&obs.system_a_name)
    .bind(&obs.system_a_value)
    .bind(&obs.system_b_name)
    .bind(&obs.system_b_value)
    .bind(&obs.corrected_value)
    .bind(obs.evidence_type.as_str())
    .bind(&obs.evidence_notes)
    .bind(obs.submitted_by.to_string())
    .bind(&obs.submitted_by_email)
    .bind(obs.status.as_str())
    .bind(obs.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one observation by id
pub async fn get_observation(pool: &SqlitePool, id: Uuid) -> Result<Option<Observation>> {
    let row = sqlx::query("SELECT * FROM observations WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_observation(&r)).transpose()
}

/// Filtered, newest-first observation list
pub async fn list_observations(
    pool: &SqlitePool,
    filter: &ObservationFilter,
) -> Result<Vec<Observation>> {
    let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
        "SELECT * FROM observations WHERE 1 = 1",
    );

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(field) = filter.field {
        qb.push(" AND field_observed = ").push_bind(field.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        qb.push(" AND (provider_npi LIKE ")
            .push_bind(pattern.clone())
            .push(" OR provider_name LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb.push(" ORDER BY created_at DESC");

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(row_to_observation).collect()
}

/// Current review status, if the observation exists
pub async fn get_status(pool: &SqlitePool, id: Uuid) -> Result<Option<ReviewStatus>> {
    let status = sqlx::query_scalar::<_, String>("SELECT status FROM observations WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    status.map(|s| s.parse()).transpose()
}

/// Compare-and-set status transition out of `pending`.
///
/// Returns false when the row no longer matched (already decided, applied,
/// or deleted), in which case nothing was written.
pub async fn update_status_if_pending(
    pool: &SqlitePool,
    id: Uuid,
    status: ReviewStatus,
) -> Result<bool> {
    let result = sqlx::query("UPDATE observations SET status = ? WHERE id = ? AND status = 'pending'")
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn row_to_observation(row: &sqlx::sqlite::SqliteRow) -> Result<Observation> {
    let id: String = row.get("id");
    let submitted_by: String = row.get("submitted_by");
    let field_observed: String = row.get("field_observed");
    let evidence_type: String = row.get("evidence_type");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(Observation {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("bad observation id: {e}")))?,
        provider_npi: row.get("provider_npi"),
        provider_name: row.get("provider_name"),
        payer_name: row.get("payer_name"),
        field_observed: field_observed.parse::<FieldObserved>()?,
        system_a_name: row.get("system_a_name"),
        system_a_value: row.get("system_a_value"),
        system_b_name: row.get("system_b_name"),
        system_b_value: row.get("system_b_value"),
        corrected_value: row.get("corrected_value"),
        evidence_type: evidence_type.parse::<EvidenceType>()?,
        evidence_notes: row.get("evidence_notes"),
        submitted_by: Uuid::parse_str(&submitted_by)
            .map_err(|e| Error::Internal(format!("bad submitter id: {e}")))?,
        submitted_by_email: row.get("submitted_by_email"),
        status: status.parse::<ReviewStatus>()?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Internal(format!("bad created_at: {e}")))?
            .with_timezone(&chrono::Utc),
    })
}
