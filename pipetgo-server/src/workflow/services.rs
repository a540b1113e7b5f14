//! Service catalog and lab-side service management

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::{own_lab, require_role, Deny};
use crate::auth::SessionClaims;
use crate::http::ApiError;
use crate::models::{
    BulkActionRequest, LabService, Paginated, Pagination, ServiceInput, ServiceQuery,
    ServiceWithLab, UserRole,
};
use crate::state::AppState;

const NOT_OWNED: &str = "Service not found or access denied";

/// Catalog response: paginated envelope, or a bare array for old clients
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ServiceListing {
    Page(Paginated<ServiceWithLab>),
    Legacy(Vec<ServiceWithLab>),
}

#[derive(Debug, Serialize)]
pub struct BulkOutcome {
    pub message: String,
    pub count: u64,
}

/// Public catalog listing.
pub async fn list(state: &AppState, query: ServiceQuery) -> Result<ServiceListing, ApiError> {
    let filter = query.filter()?;
    let page = Pagination::from(&query.pagination);
    let result = state.store.list_services(&filter, page).await?;

    tracing::debug!(
        total = result.pagination.total_count,
        page = page.page,
        "listed services"
    );

    if query.legacy_format() {
        Ok(ServiceListing::Legacy(result.items))
    } else {
        Ok(ServiceListing::Page(result))
    }
}

pub async fn create(
    state: &AppState,
    claims: &SessionClaims,
    input: ServiceInput,
) -> Result<LabService, ApiError> {
    require_role(
        claims,
        UserRole::LabAdmin,
        Deny::Forbidden("Only lab administrators can create services"),
    )?;
    let draft = input.validate()?;
    let lab = own_lab(state, claims)
        .await?
        .ok_or_else(|| ApiError::not_found("Lab not found"))?;

    let service = state.store.create_service(lab.id, draft).await?;
    tracing::info!(service_id = %service.id, lab_id = %lab.id, "service created");
    Ok(service)
}

/// Find a service owned by the caller's lab.
async fn owned(state: &AppState, claims: &SessionClaims, id: Uuid) -> Result<(Uuid, LabService), ApiError> {
    let lab = own_lab(state, claims)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_OWNED))?;
    match state.store.service_by_id(id).await? {
        Some(service) if service.lab_id == lab.id => Ok((lab.id, service)),
        _ => Err(ApiError::not_found(NOT_OWNED)),
    }
}

pub async fn get(state: &AppState, claims: &SessionClaims, id: Uuid) -> Result<LabService, ApiError> {
    require_role(claims, UserRole::LabAdmin, Deny::Unauthorized)?;
    let (_, service) = owned(state, claims, id).await?;
    Ok(service)
}

/// A body of exactly `{"active": bool}` toggles; anything else is a full update.
pub async fn patch(
    state: &AppState,
    claims: &SessionClaims,
    id: Uuid,
    body: Value,
) -> Result<LabService, ApiError> {
    require_role(claims, UserRole::LabAdmin, Deny::Unauthorized)?;
    let (lab_id, _) = owned(state, claims, id).await?;

    let toggle = body
        .as_object()
        .filter(|obj| obj.len() == 1)
        .and_then(|obj| obj.get("active"));

    let updated = match toggle {
        Some(active) => {
            let active = active
                .as_bool()
                .ok_or_else(|| ApiError::bad_request("Invalid input: active must be a boolean"))?;
            state.store.set_service_active(id, lab_id, active).await?
        }
        None => {
            let input: ServiceInput = serde_json::from_value(body)
                .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))?;
            let draft = input.validate()?;
            state.store.update_service(id, lab_id, draft).await?
        }
    };

    let service = updated.ok_or_else(|| ApiError::not_found(NOT_OWNED))?;
    tracing::info!(service_id = %id, active = service.active, "service updated");
    Ok(service)
}

/// Enable or disable several services at once; all or nothing on ownership.
pub async fn bulk(
    state: &AppState,
    claims: &SessionClaims,
    req: BulkActionRequest,
) -> Result<BulkOutcome, ApiError> {
    require_role(claims, UserRole::LabAdmin, Deny::Unauthorized)?;
    let lab = own_lab(state, claims)
        .await?
        .ok_or_else(|| ApiError::not_found("Lab not found"))?;
    let (ids, action) = req.validate()?;

    let owned = state.store.count_owned_services(lab.id, &ids).await?;
    if owned != ids.len() as i64 {
        tracing::warn!(lab_id = %lab.id, requested = ids.len(), owned, "bulk action on foreign services");
        return Err(ApiError::forbidden("Some services not found or access denied"));
    }

    let count = state.store.bulk_set_active(lab.id, &ids, action.active()).await?;
    tracing::info!(lab_id = %lab.id, count, action = action.past_tense(), "bulk service update");
    Ok(BulkOutcome {
        message: format!(
            "{} service{} {}",
            count,
            if count == 1 { "" } else { "s" },
            action.past_tense()
        ),
        count,
    })
}
