//! Bulk batch API handlers
//!
//! Submission is accepted (202) once the batch row is durable; the chunk
//! writes run in a background task and report progress on the event bus,
//! which `/events` streams to clients.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::OperatorIdentity;
use crate::db::{batches, records};
use crate::error::{ApiError, ApiResult};
use crate::services::{
    export_batch, parse_csv, CategoryRegistry, SubmissionConfig, SubmissionEngine,
};
use crate::AppState;
use rostra_common::models::{BulkBatch, BulkRecord, ReviewEntry, SubjectRef};

/// POST /batches request
#[derive(Debug, Deserialize)]
pub struct SubmitBatchRequest {
    /// Raw CSV text as uploaded
    pub csv_text: String,
    pub config: SubmissionConfig,
}

/// POST /batches response (202 Accepted)
#[derive(Debug, Serialize)]
pub struct SubmitBatchResponse {
    pub batch_id: Uuid,
    pub record_count: usize,
    pub total_chunks: usize,
}

/// POST /batches/:id/resume request
#[derive(Debug, Deserialize)]
pub struct ResumeBatchRequest {
    /// The same CSV text that was originally uploaded
    pub csv_text: String,
}

/// POST /batches/:id/resume response (202 Accepted)
#[derive(Debug, Serialize)]
pub struct ResumeBatchResponse {
    pub batch_id: Uuid,
    pub resume_from_chunk: usize,
    pub total_chunks: usize,
}

/// Batch list/detail row with the operator-visible integrity check
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    #[serde(flatten)]
    pub batch: BulkBatch,
    /// Records actually persisted for this batch
    pub persisted_record_count: i64,
    /// True when the declared count disagrees with the store
    pub partial: bool,
}

/// GET /batches/:id response
#[derive(Debug, Serialize)]
pub struct BatchDetailResponse {
    #[serde(flatten)]
    pub summary: BatchSummary,
    pub sample_records: Vec<BulkRecord>,
    /// Audit entries, newest first
    pub reviews: Vec<ReviewEntry>,
}

/// POST /batches
///
/// Parses and validates the upload, creates the batch row, then streams
/// the chunks in the background.
pub async fn submit_batch(
    State(state): State<AppState>,
    OperatorIdentity(submitter): OperatorIdentity,
    Json(request): Json<SubmitBatchRequest>,
) -> ApiResult<(StatusCode, Json<SubmitBatchResponse>)> {
    let parsed = parse_csv(request.csv_text.as_bytes())?;
    let registry = CategoryRegistry::load(&state.db).await?;

    let engine = SubmissionEngine::from_settings(&state.db, state.event_bus.clone()).await?;
    let batch = engine
        .create_batch(&parsed, &request.config, &registry, &submitter)
        .await?;

    let response = SubmitBatchResponse {
        batch_id: batch.id,
        record_count: parsed.rows.len(),
        total_chunks: engine.total_chunks(parsed.rows.len()),
    };

    // Chunk writes continue after the 202; progress is observable on the
    // event stream and in the batch's ingest state
    let rows = parsed.rows;
    tokio::spawn(async move {
        if let Err(e) = engine.ingest_rows(&batch, rows).await {
            tracing::error!(
                batch_id = %batch.id,
                error = %e,
                "Background batch ingestion failed"
            );
        }
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// POST /batches/:id/resume
///
/// Continue a partially ingested batch from its chunk cursor with the
/// re-supplied rows.
pub async fn resume_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResumeBatchRequest>,
) -> ApiResult<(StatusCode, Json<ResumeBatchResponse>)> {
    let batch = batches::get_batch(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("batch {id}")))?;

    let parsed = parse_csv(request.csv_text.as_bytes())?;

    let engine = SubmissionEngine::from_settings(&state.db, state.event_bus.clone()).await?;
    engine.validate_resume(&batch, parsed.rows.len())?;

    let response = ResumeBatchResponse {
        batch_id: batch.id,
        resume_from_chunk: batch.chunks_committed as usize,
        total_chunks: engine.total_chunks(parsed.rows.len()),
    };

    let rows = parsed.rows;
    tokio::spawn(async move {
        if let Err(e) = engine.resume(&batch, rows).await {
            tracing::error!(
                batch_id = %batch.id,
                error = %e,
                "Background batch resume failed"
            );
        }
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /batches
pub async fn list_batches(State(state): State<AppState>) -> ApiResult<Json<Vec<BatchSummary>>> {
    let all = batches::list_batches(&state.db).await?;

    let mut summaries = Vec::with_capacity(all.len());
    for batch in all {
        let persisted = records::count_for_batch(&state.db, batch.id).await?;
        summaries.push(BatchSummary {
            partial: batch.is_partial(persisted),
            persisted_record_count: persisted,
            batch,
        });
    }

    Ok(Json(summaries))
}

/// GET /batches/:id
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BatchDetailResponse>> {
    let batch = batches::get_batch(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("batch {id}")))?;

    let persisted = records::count_for_batch(&state.db, id).await?;
    let sample_records = records::list_sample(&state.db, id, 20).await?;
    let reviews = crate::db::reviews::list_for_subject(&state.db, SubjectRef::Batch(id)).await?;

    Ok(Json(BatchDetailResponse {
        summary: BatchSummary {
            partial: batch.is_partial(persisted),
            persisted_record_count: persisted,
            batch,
        },
        sample_records,
        reviews,
    }))
}

/// GET /batches/:id/export - reconstructed CSV download
pub async fn export_batch_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let batch = batches::get_batch(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("batch {id}")))?;

    let bytes = export_batch(&state.db, id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let disposition = format!("attachment; filename=\"batch_{}.csv\"", batch.batch_name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/batches", post(submit_batch).get(list_batches))
        .route("/batches/:id", get(get_batch))
        .route("/batches/:id/resume", post(resume_batch))
        .route("/batches/:id/export", get(export_batch_csv))
}
