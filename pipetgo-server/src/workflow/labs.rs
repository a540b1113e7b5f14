//! Lab profile of the signed-in lab admin

use super::{own_lab, require_role, Deny};
use crate::auth::SessionClaims;
use crate::http::ApiError;
use crate::models::{Lab, LabProfileRequest, UserRole};
use crate::state::AppState;

pub async fn mine(state: &AppState, claims: &SessionClaims) -> Result<Lab, ApiError> {
    require_role(claims, UserRole::LabAdmin, Deny::Forbidden("Only lab administrators have a lab"))?;
    own_lab(state, claims)
        .await?
        .ok_or_else(|| ApiError::not_found("Lab not found"))
}

/// Create the caller's lab, or replace its profile.
pub async fn save_mine(
    state: &AppState,
    claims: &SessionClaims,
    req: LabProfileRequest,
) -> Result<Lab, ApiError> {
    require_role(
        claims,
        UserRole::LabAdmin,
        Deny::Forbidden("Only lab administrators can manage a lab profile"),
    )?;
    let profile = req.validate()?;
    let lab = state.store.upsert_lab(claims.sub, profile).await?;
    tracing::info!(lab_id = %lab.id, owner_id = %claims.sub, "lab profile saved");
    Ok(lab)
}
