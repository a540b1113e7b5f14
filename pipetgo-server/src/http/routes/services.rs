//! Service catalog endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::extractors::{CurrentUser, ValidJson, ValidUuid};
use crate::models::{BulkActionRequest, LabService, ServiceInput, ServiceQuery};
use crate::state::AppState;
use crate::workflow::services::{self, BulkOutcome, ServiceListing};

/// GET /api/services - public catalog
async fn list_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ServiceQuery>,
) -> Result<Json<ServiceListing>, ApiError> {
    Ok(Json(services::list(&state, query).await?))
}

/// POST /api/services - create a service in the caller's lab
async fn create_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidJson(input): ValidJson<ServiceInput>,
) -> Result<(StatusCode, Json<LabService>), ApiError> {
    let service = services::create(&state, &claims, input).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

/// GET /api/services/{id}
async fn get_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidUuid(id): ValidUuid,
) -> Result<Json<LabService>, ApiError> {
    Ok(Json(services::get(&state, &claims, id).await?))
}

/// PATCH /api/services/{id} - toggle `active` or replace the service
async fn patch_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidUuid(id): ValidUuid,
    ValidJson(body): ValidJson<Value>,
) -> Result<Json<LabService>, ApiError> {
    Ok(Json(services::patch(&state, &claims, id, body).await?))
}

/// POST /api/services/bulk
async fn bulk_services(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidJson(req): ValidJson<BulkActionRequest>,
) -> Result<Json<BulkOutcome>, ApiError> {
    Ok(Json(services::bulk(&state, &claims, req).await?))
}

/// Service routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/services", get(list_services).post(create_service))
        .route("/api/services/bulk", post(bulk_services))
        .route("/api/services/{id}", get(get_service).patch(patch_service))
}
