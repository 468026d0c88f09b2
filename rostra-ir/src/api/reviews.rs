//! Review API handlers

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::OperatorIdentity;
use crate::db::reviews;
use crate::error::{ApiError, ApiResult};
use crate::services::ReviewEngine;
use crate::AppState;
use rostra_common::models::{ReviewDecision, ReviewEntry, SubjectRef};

/// POST /reviews request
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub observation_id: Option<Uuid>,
    #[serde(default)]
    pub batch_id: Option<Uuid>,
    pub decision: ReviewDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ReviewRequest {
    /// Exactly one subject kind must be referenced
    fn subject(&self) -> Result<SubjectRef, ApiError> {
        match (self.observation_id, self.batch_id) {
            (Some(id), None) => Ok(SubjectRef::Observation(id)),
            (None, Some(id)) => Ok(SubjectRef::Batch(id)),
            _ => Err(ApiError::BadRequest(
                "exactly one of observation_id or batch_id must be set".to_string(),
            )),
        }
    }
}

/// GET /reviews query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ReviewListQuery {
    pub observation_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// POST /reviews
///
/// Confirm a reviewer decision on a pending subject.
pub async fn create_review(
    State(state): State<AppState>,
    OperatorIdentity(reviewer): OperatorIdentity,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Json<ReviewEntry>> {
    let subject = request.subject()?;

    let engine = ReviewEngine::from_settings(state.db.clone(), state.event_bus.clone()).await?;
    let entry = engine
        .review(subject, request.decision, request.comment, &reviewer)
        .await?;

    Ok(Json(entry))
}

/// GET /reviews - audit log, newest first
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> ApiResult<Json<Vec<ReviewEntry>>> {
    let entries = match (query.observation_id, query.batch_id) {
        (Some(id), None) => {
            reviews::list_for_subject(&state.db, SubjectRef::Observation(id)).await?
        }
        (None, Some(id)) => reviews::list_for_subject(&state.db, SubjectRef::Batch(id)).await?,
        (None, None) => reviews::list_recent(&state.db, query.limit.unwrap_or(100)).await?,
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "filter by observation_id or batch_id, not both".to_string(),
            ))
        }
    };

    Ok(Json(entries))
}

pub fn review_routes() -> Router<AppState> {
    Router::new().route("/reviews", post(create_review).get(list_reviews))
}
