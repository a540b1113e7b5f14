//! Request workflows: role checks, ownership, state transitions
//!
//! Handlers stay thin; each function here takes the shared state and the
//! caller's session claims and talks to the `Store`.

pub mod accounts;
pub mod analytics;
pub mod dashboard;
pub mod labs;
pub mod orders;
pub mod services;

use crate::auth::SessionClaims;
use crate::http::ApiError;
use crate::models::{Lab, UserRole};
use crate::state::AppState;

/// How a role mismatch is reported
#[derive(Debug, Clone, Copy)]
pub(crate) enum Deny {
    Unauthorized,
    Forbidden(&'static str),
}

pub(crate) fn require_role(claims: &SessionClaims, role: UserRole, deny: Deny) -> Result<(), ApiError> {
    if claims.role == role {
        return Ok(());
    }
    Err(match deny {
        Deny::Unauthorized => ApiError::unauthorized(),
        Deny::Forbidden(reason) => ApiError::forbidden(reason),
    })
}

/// The lab owned by the caller, if any.
pub(crate) async fn own_lab(state: &AppState, claims: &SessionClaims) -> Result<Option<Lab>, ApiError> {
    Ok(state.store.lab_by_owner(claims.sub).await?)
}
