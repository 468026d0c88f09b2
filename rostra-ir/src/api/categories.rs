//! Tag category API handlers

use axum::{extract::State, routing::get, Json, Router};

use crate::error::ApiResult;
use crate::services::CategoryRegistry;
use crate::AppState;
use rostra_common::models::TagCategory;

/// GET /categories - active registry entries
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<TagCategory>>> {
    let registry = CategoryRegistry::load(&state.db).await?;
    Ok(Json(registry.categories().to_vec()))
}

pub fn category_routes() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories))
}
