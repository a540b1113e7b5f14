//! Lab analytics endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::state::AppState;
use crate::workflow::analytics::{self, AnalyticsQuery, LabAnalytics};

/// GET /api/analytics?timeframe=last30days|last90days|thisYear|allTime
async fn lab_analytics(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<LabAnalytics>, ApiError> {
    Ok(Json(analytics::get(&state, &claims, query).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/analytics", get(lab_analytics))
}
