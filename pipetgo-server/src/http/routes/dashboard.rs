//! Dashboard endpoint

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::state::AppState;
use crate::workflow::dashboard::{self, Dashboard};

/// GET /api/dashboard - payload depends on the caller's role
async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(dashboard::get(&state, &claims).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/dashboard", get(dashboard))
}
