//! Session endpoints: sign-in, sign-up, session, sign-out, set-password

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::auth::session::clear_cookie;
use crate::http::error::ApiError;
use crate::http::extractors::{ClientIp, CurrentUser, ValidJson};
use crate::models::{SignInRequest, SignUpRequest};
use crate::state::AppState;
use crate::workflow::accounts::{self, SessionGrant, SetPasswordRequest};

/// JSON grant plus the session cookie
fn with_cookie(state: &AppState, status: StatusCode, grant: SessionGrant) -> Response {
    let cookie = state.keys.cookie(&grant.token);
    (status, [(SET_COOKIE, cookie)], Json(grant)).into_response()
}

/// POST /api/auth/signin
async fn sign_in(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ValidJson(req): ValidJson<SignInRequest>,
) -> Result<Response, ApiError> {
    let grant = accounts::sign_in(&state, &ip, req).await?;
    Ok(with_cookie(&state, StatusCode::OK, grant))
}

/// POST /api/auth/signup
async fn sign_up(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ValidJson(req): ValidJson<SignUpRequest>,
) -> Result<Response, ApiError> {
    let grant = accounts::sign_up(&state, &ip, req).await?;
    Ok(with_cookie(&state, StatusCode::CREATED, grant))
}

/// GET /api/auth/session
async fn session(CurrentUser(claims): CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "user": claims }))
}

/// POST /api/auth/signout
async fn sign_out() -> impl IntoResponse {
    ([(SET_COOKIE, clear_cookie())], Json(json!({ "success": true })))
}

/// POST /api/auth/set-password
async fn set_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    ValidJson(req): ValidJson<SetPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    accounts::set_password(&state, &claims, req).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Password set successfully"
    })))
}

/// Auth routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/session", get(session))
        .route("/api/auth/signout", post(sign_out))
        .route("/api/auth/set-password", post(set_password))
}
