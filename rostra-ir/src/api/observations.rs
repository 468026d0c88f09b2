//! Observation API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::OperatorIdentity;
use crate::db::observations::{self, ObservationFilter};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use rostra_common::events::RostraEvent;
use rostra_common::models::{
    FieldObserved, NewObservation, Observation, ReviewEntry, ReviewStatus, SubjectRef,
};

/// GET /observations query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ObservationListQuery {
    pub status: Option<ReviewStatus>,
    pub field: Option<FieldObserved>,
    /// Substring match against provider NPI or name
    pub search: Option<String>,
}

/// GET /observations/:id response
#[derive(Debug, serde::Serialize)]
pub struct ObservationDetailResponse {
    pub observation: Observation,
    /// Audit entries, newest first
    pub reviews: Vec<ReviewEntry>,
}

/// POST /observations
///
/// Validates before any store write; a bad NPI never reaches the store.
pub async fn create_observation(
    State(state): State<AppState>,
    OperatorIdentity(submitter): OperatorIdentity,
    Json(request): Json<NewObservation>,
) -> ApiResult<(StatusCode, Json<Observation>)> {
    request.validate().map_err(ApiError::Common)?;

    let observation = request.into_observation(submitter.user_id, submitter.email);
    observations::insert_observation(&state.db, &observation).await?;

    tracing::info!(
        observation_id = %observation.id,
        provider_npi = %observation.provider_npi,
        submitted_by = %observation.submitted_by_email,
        "Observation submitted"
    );

    state.event_bus.emit(RostraEvent::ObservationSubmitted {
        observation_id: observation.id,
        provider_npi: observation.provider_npi.clone(),
        timestamp: chrono::Utc::now(),
    });

    Ok((StatusCode::CREATED, Json(observation)))
}

/// GET /observations
pub async fn list_observations(
    State(state): State<AppState>,
    Query(query): Query<ObservationListQuery>,
) -> ApiResult<Json<Vec<Observation>>> {
    let filter = ObservationFilter {
        status: query.status,
        field: query.field,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let observations = observations::list_observations(&state.db, &filter).await?;
    Ok(Json(observations))
}

/// GET /observations/:id
pub async fn get_observation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ObservationDetailResponse>> {
    let observation = observations::get_observation(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("observation {id}")))?;

    let reviews =
        crate::db::reviews::list_for_subject(&state.db, SubjectRef::Observation(id)).await?;

    Ok(Json(ObservationDetailResponse {
        observation,
        reviews,
    }))
}

pub fn observation_routes() -> Router<AppState> {
    Router::new()
        .route("/observations", post(create_observation).get(list_observations))
        .route("/observations/:id", get(get_observation))
}
