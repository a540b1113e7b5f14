//! Order endpoints, including the quote sub-flow

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};

use crate::http::error::ApiError;
use crate::http::extractors::{CurrentUser, ValidJson, ValidUuid};
use crate::models::{
    CreateOrderRequest, CustomQuoteRequest, OrderQuery, OrderView, ProvideQuoteRequest,
    QuoteDecisionRequest, UpdateOrderRequest,
};
use crate::state::AppState;
use crate::workflow::orders::{self, OrderStats};

/// GET /api/orders - orders visible to the caller, newest first
async fn list_orders(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(orders::list(&state, &claims, query).await?))
}

/// POST /api/orders
async fn create_order(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidJson(req): ValidJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let view = orders::create(&state, &claims, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/orders/stats
async fn order_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<OrderStats>, ApiError> {
    Ok(Json(orders::stats(&state, &claims).await?))
}

/// PATCH /api/orders/{id} - lab status update
async fn update_order(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<UpdateOrderRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(orders::update(&state, &claims, id, req).await?))
}

/// POST /api/orders/{id}/quote
async fn provide_quote(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<ProvideQuoteRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(orders::provide_quote(&state, &claims, id, req).await?))
}

/// POST /api/orders/{id}/approve-quote
async fn approve_quote(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<QuoteDecisionRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(orders::decide_quote(&state, &claims, id, req).await?))
}

/// POST /api/orders/{id}/request-custom-quote
async fn request_custom_quote(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidUuid(id): ValidUuid,
    ValidJson(req): ValidJson<CustomQuoteRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(orders::request_custom_quote(&state, &claims, id, req).await?))
}

/// Order routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/stats", get(order_stats))
        .route("/api/orders/{id}", patch(update_order))
        .route("/api/orders/{id}/quote", post(provide_quote))
        .route("/api/orders/{id}/approve-quote", post(approve_quote))
        .route("/api/orders/{id}/request-custom-quote", post(request_custom_quote))
}
