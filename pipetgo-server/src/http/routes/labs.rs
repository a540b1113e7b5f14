//! Lab profile endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::http::error::ApiError;
use crate::http::extractors::{CurrentUser, ValidJson};
use crate::models::{Lab, LabProfileRequest};
use crate::state::AppState;
use crate::workflow::labs;

/// GET /api/labs/mine
async fn my_lab(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<Lab>, ApiError> {
    Ok(Json(labs::mine(&state, &claims).await?))
}

/// PUT /api/labs/mine
async fn save_my_lab(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidJson(req): ValidJson<LabProfileRequest>,
) -> Result<Json<Lab>, ApiError> {
    Ok(Json(labs::save_mine(&state, &claims, req).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/labs/mine", get(my_lab).put(save_my_lab))
}
