//! Order lifecycle: placement, lab updates and the quote sub-flow
//!
//! Every status change is written with `Store::save_order_if_status`, so a
//! concurrent writer that moved the order first turns the second write
//! into a 409.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::{own_lab, require_role, Deny};
use crate::auth::SessionClaims;
use crate::db::{NewAttachment, NewOrder, OrderListQuery, OrderScope};
use crate::http::ApiError;
use crate::models::{
    AttachmentType, CreateOrderRequest, CustomQuoteRequest, Order, OrderQuery, OrderStatus,
    OrderView, PricingMode, ProvideQuoteRequest, QuoteDecision, QuoteDecisionRequest,
    UpdateOrderRequest, UserRole,
};
use crate::state::AppState;

const NOT_VISIBLE: &str = "Order not found or access denied";
const RESULT_FILE_TYPE: &str = "application/pdf";

/// Order counts for the caller's scope
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total: i64,
    pub by_status: BTreeMap<OrderStatus, i64>,
}

/// Orders the caller may see. `None` for a lab admin who has no lab yet.
pub async fn scope_for(state: &AppState, claims: &SessionClaims) -> Result<Option<OrderScope>, ApiError> {
    Ok(match claims.role {
        UserRole::Client => Some(OrderScope::Client(claims.sub)),
        UserRole::LabAdmin => own_lab(state, claims).await?.map(|lab| OrderScope::Lab(lab.id)),
        UserRole::Admin => Some(OrderScope::All),
    })
}

/// Status and price an order starts with, from the service's pricing mode.
fn initial_terms(mode: PricingMode, catalog_price: Option<f64>, custom_quote: bool) -> (OrderStatus, Option<f64>) {
    match (mode, catalog_price) {
        (PricingMode::QuoteRequired, _) => (OrderStatus::QuoteRequested, None),
        (PricingMode::Hybrid, _) if custom_quote => (OrderStatus::QuoteRequested, None),
        (PricingMode::Fixed | PricingMode::Hybrid, Some(price)) => (OrderStatus::Pending, Some(price)),
        // priced modes without a stored price fall back to the quote flow
        (PricingMode::Fixed | PricingMode::Hybrid, None) => (OrderStatus::QuoteRequested, None),
    }
}

pub async fn create(
    state: &AppState,
    claims: &SessionClaims,
    req: CreateOrderRequest,
) -> Result<OrderView, ApiError> {
    require_role(claims, UserRole::Client, Deny::Unauthorized)?;
    let submission = req.validate()?;

    let service = match state.store.service_by_id(submission.service_id).await? {
        Some(s) if s.active => s,
        _ => return Err(ApiError::not_found("Service not found or inactive")),
    };

    let (status, quoted_price) = initial_terms(
        service.pricing_mode,
        service.price_per_unit,
        submission.request_custom_quote,
    );

    let view = state
        .store
        .create_order(NewOrder {
            client_id: claims.sub,
            lab_id: service.lab_id,
            service_id: service.id,
            status,
            client_details: submission.client_details,
            sample_description: submission.sample_description,
            special_instructions: submission.special_instructions,
            quoted_price,
            quoted_at: quoted_price.map(|_| Utc::now()),
        })
        .await?;

    tracing::info!(
        order_id = %view.order.id,
        service_id = %service.id,
        status = %status,
        "order placed"
    );
    Ok(view)
}

/// Orders visible to the caller, newest first.
pub async fn list(
    state: &AppState,
    claims: &SessionClaims,
    query: OrderQuery,
) -> Result<Vec<OrderView>, ApiError> {
    let status = query.status()?;
    let Some(scope) = scope_for(state, claims).await? else {
        return Ok(Vec::new());
    };
    Ok(state
        .store
        .list_orders(&OrderListQuery::new(scope).status(status))
        .await?)
}

pub async fn stats(state: &AppState, claims: &SessionClaims) -> Result<OrderStats, ApiError> {
    let Some(scope) = scope_for(state, claims).await? else {
        return Ok(OrderStats::default());
    };
    let counts = state.store.status_counts(scope).await?;
    Ok(OrderStats {
        total: counts.iter().map(|(_, n)| n).sum(),
        by_status: counts.into_iter().filter(|(_, n)| *n > 0).collect(),
    })
}

/// Write `order` if its stored status is still `expected`, then reload it.
async fn commit(state: &AppState, order: &Order, expected: OrderStatus) -> Result<OrderView, ApiError> {
    if !state.store.save_order_if_status(order, expected).await? {
        let current = state
            .store
            .order_view(order.id)
            .await?
            .map(|v| v.order.status.to_string())
            .unwrap_or_else(|| "deleted".into());
        tracing::warn!(order_id = %order.id, %expected, %current, "lost order status race");
        return Err(ApiError::conflict(format!(
            "Order status changed concurrently (expected {expected}, now {current})"
        )));
    }
    state
        .store
        .order_view(order.id)
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_VISIBLE))
}

/// Lab-side status update (acknowledge, start, complete, cancel).
pub async fn update(
    state: &AppState,
    claims: &SessionClaims,
    id: Uuid,
    req: UpdateOrderRequest,
) -> Result<OrderView, ApiError> {
    let update = req.validate()?;
    let view = state
        .store
        .order_view(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    let allowed = claims.role == UserRole::Admin
        || (claims.role == UserRole::LabAdmin && view.lab.owner_id == claims.sub);
    if !allowed {
        return Err(ApiError::forbidden("Forbidden"));
    }

    let mut order = view.order;
    let previous = order.status;
    if !previous.can_transition_to(update.status) {
        return Err(ApiError::conflict(format!(
            "Cannot change order status from {previous} to {}",
            update.status
        )));
    }

    let now = Utc::now();
    order.status = update.status;
    order.updated_at = now;
    match update.status {
        OrderStatus::Acknowledged => order.acknowledged_at = Some(now),
        OrderStatus::Completed => order.completed_at = Some(now),
        _ => {}
    }

    // result file before status, so a failed insert leaves the order where it was
    let attachment = match update.result_file {
        Some(file) => Some(
            state
                .store
                .create_attachment(NewAttachment {
                    order_id: id,
                    uploaded_by_id: claims.sub,
                    file_name: file.name,
                    file_url: file.url,
                    file_type: RESULT_FILE_TYPE.into(),
                    file_size: None,
                    attachment_type: AttachmentType::Result,
                })
                .await?,
        ),
        None => None,
    };

    let view = commit(state, &order, previous).await.inspect_err(|_| {
        if let Some(a) = &attachment {
            tracing::warn!(order_id = %id, attachment_id = %a.id, "result file kept but status update failed");
        }
    })?;

    tracing::info!(order_id = %id, from = %previous, to = %update.status, "order status updated");
    Ok(view)
}

/// Lab prices an order that is waiting for a quote.
pub async fn provide_quote(
    state: &AppState,
    claims: &SessionClaims,
    id: Uuid,
    req: ProvideQuoteRequest,
) -> Result<OrderView, ApiError> {
    require_role(
        claims,
        UserRole::LabAdmin,
        Deny::Forbidden("Only lab administrators can provide quotes"),
    )?;
    let view = match state.store.order_view(id).await? {
        Some(v) if v.lab.owner_id == claims.sub => v,
        _ => return Err(ApiError::not_found(NOT_VISIBLE)),
    };

    let mut order = view.order;
    if order.status != OrderStatus::QuoteRequested {
        return Err(ApiError::bad_request(format!(
            "Quote can only be provided for orders with status QUOTE_REQUESTED (current: {})",
            order.status
        )));
    }
    let quote = req.validate()?;

    let now = Utc::now();
    order.quoted_price = Some(quote.price);
    order.quoted_at = Some(now);
    order.quote_notes = quote.notes;
    order.estimated_turnaround_days = quote.turnaround_days;
    order.status = OrderStatus::QuoteProvided;
    order.updated_at = now;

    let view = commit(state, &order, OrderStatus::QuoteRequested).await?;
    tracing::info!(order_id = %id, price = quote.price, "quote provided");
    Ok(view)
}

/// Client approves or rejects a provided quote.
pub async fn decide_quote(
    state: &AppState,
    claims: &SessionClaims,
    id: Uuid,
    req: QuoteDecisionRequest,
) -> Result<OrderView, ApiError> {
    require_role(
        claims,
        UserRole::Client,
        Deny::Forbidden("Only clients can approve or reject quotes"),
    )?;
    let view = match state.store.order_view(id).await? {
        Some(v) if v.order.client_id == claims.sub => v,
        _ => return Err(ApiError::not_found(NOT_VISIBLE)),
    };
    let decision = req.validate()?;

    let mut order = view.order;
    if order.status != OrderStatus::QuoteProvided {
        return Err(ApiError::conflict(format!(
            "Quote can only be approved/rejected when status is QUOTE_PROVIDED (current status: {})",
            order.status
        )));
    }

    let now = Utc::now();
    match &decision {
        QuoteDecision::Approve => {
            order.status = OrderStatus::Pending;
            order.quote_approved_at = Some(now);
            order.quote_rejected_reason = None;
        }
        QuoteDecision::Reject { reason } => {
            order.status = OrderStatus::QuoteRejected;
            order.quote_rejected_at = Some(now);
            order.quote_rejected_reason = Some(reason.clone());
        }
    }
    order.updated_at = now;

    let view = commit(state, &order, OrderStatus::QuoteProvided).await?;
    tracing::info!(order_id = %id, status = %view.order.status, "quote decided");
    Ok(view)
}

/// Client asks for a custom quote on a HYBRID order instead of the catalog price.
pub async fn request_custom_quote(
    state: &AppState,
    claims: &SessionClaims,
    id: Uuid,
    req: CustomQuoteRequest,
) -> Result<OrderView, ApiError> {
    require_role(
        claims,
        UserRole::Client,
        Deny::Forbidden("Only clients can request custom quotes"),
    )?;
    let view = match state.store.order_view(id).await? {
        Some(v) if v.order.client_id == claims.sub => v,
        _ => return Err(ApiError::not_found(NOT_VISIBLE)),
    };

    if view.service.pricing_mode != PricingMode::Hybrid {
        return Err(ApiError::bad_request(format!(
            "Custom quote requests are only available for HYBRID pricing mode services (current: {})",
            view.service.pricing_mode.as_str()
        )));
    }
    let mut order = view.order;
    if order.status != OrderStatus::Pending {
        return Err(ApiError::bad_request(format!(
            "You can only request custom quote for orders with status PENDING (current: {})",
            order.status
        )));
    }
    let reason = req.validate()?;

    order.special_instructions = Some(match order.special_instructions.take() {
        Some(existing) if !existing.is_empty() => {
            format!("{existing}\n\nCustom Quote Requested: {reason}")
        }
        _ => format!("Custom Quote Requested: {reason}"),
    });
    order.quoted_price = None;
    order.quoted_at = None;
    order.status = OrderStatus::QuoteRequested;
    order.updated_at = Utc::now();

    let view = commit(state, &order, OrderStatus::Pending).await?;
    tracing::info!(order_id = %id, "custom quote requested");
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientDetailsInput, Pagination, ServiceFilter, ShippingAddressInput};
    use crate::workflow::testing::{claims, demo_state};

    async fn service_id(state: &AppState, mode: PricingMode) -> Uuid {
        let page = state
            .store
            .list_services(&ServiceFilter::default(), Pagination::default())
            .await
            .unwrap();
        page.items
            .iter()
            .find(|s| s.service.pricing_mode == mode)
            .map(|s| s.service.id)
            .unwrap()
    }

    fn order_request(service_id: Uuid, custom_quote: bool) -> CreateOrderRequest {
        CreateOrderRequest {
            service_id: Some(service_id.to_string()),
            sample_description: Some("Two litres of well water, sealed".into()),
            special_instructions: None,
            request_custom_quote: Some(custom_quote),
            client_details: Some(ClientDetailsInput {
                contact_email: Some("client@pipetgo.test".into()),
                contact_phone: None,
                shipping_address: Some(ShippingAddressInput {
                    street: Some("12 Ayala Ave".into()),
                    city: Some("Makati".into()),
                    postal: Some("1226".into()),
                    country: None,
                }),
                organization: None,
            }),
        }
    }

    fn quote(price: f64) -> ProvideQuoteRequest {
        ProvideQuoteRequest {
            quoted_price: Some(price),
            quote_notes: Some("Includes courier pickup".into()),
            estimated_turnaround_days: Some(7.0),
        }
    }

    #[test]
    fn initial_terms_by_pricing_mode() {
        assert_eq!(
            initial_terms(PricingMode::QuoteRequired, Some(10.0), false),
            (OrderStatus::QuoteRequested, None)
        );
        assert_eq!(
            initial_terms(PricingMode::Fixed, Some(3500.0), true),
            (OrderStatus::Pending, Some(3500.0))
        );
        assert_eq!(
            initial_terms(PricingMode::Hybrid, Some(1200.0), false),
            (OrderStatus::Pending, Some(1200.0))
        );
        assert_eq!(
            initial_terms(PricingMode::Hybrid, Some(1200.0), true),
            (OrderStatus::QuoteRequested, None)
        );
    }

    #[tokio::test]
    async fn fixed_order_starts_pending_with_price() {
        let state = demo_state();
        let client = claims(&state, "client@pipetgo.test").await;
        let sid = service_id(&state, PricingMode::Fixed).await;

        let view = create(&state, &client, order_request(sid, false)).await.unwrap();
        assert_eq!(view.order.status, OrderStatus::Pending);
        assert_eq!(view.order.quoted_price, Some(3500.0));
        assert!(view.order.quoted_at.is_some());
        assert_eq!(view.order.client_details.shipping_address.country, "Philippines");
    }

    #[tokio::test]
    async fn only_clients_place_orders() {
        let state = demo_state();
        let lab = claims(&state, "lab@pipetgo.test").await;
        let sid = service_id(&state, PricingMode::Fixed).await;
        let err = create(&state, &lab, order_request(sid, false)).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn quote_flow_end_to_end() {
        let state = demo_state();
        let client = claims(&state, "client@pipetgo.test").await;
        let lab = claims(&state, "lab@pipetgo.test").await;
        let sid = service_id(&state, PricingMode::QuoteRequired).await;

        let placed = create(&state, &client, order_request(sid, false)).await.unwrap();
        assert_eq!(placed.order.status, OrderStatus::QuoteRequested);
        assert_eq!(placed.order.quoted_price, None);

        // the client cannot quote their own order
        let err = provide_quote(&state, &client, placed.order.id, quote(5000.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { .. }));

        let quoted = provide_quote(&state, &lab, placed.order.id, quote(5000.0))
            .await
            .unwrap();
        assert_eq!(quoted.order.status, OrderStatus::QuoteProvided);
        assert_eq!(quoted.order.estimated_turnaround_days, Some(7));

        // quoting twice is a bad request
        let err = provide_quote(&state, &lab, placed.order.id, quote(5000.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));

        let approved = decide_quote(
            &state,
            &client,
            placed.order.id,
            QuoteDecisionRequest {
                approved: Some(true),
                rejection_reason: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(approved.order.status, OrderStatus::Pending);
        assert!(approved.order.quote_approved_at.is_some());

        // deciding again hits the status check
        let err = decide_quote(
            &state,
            &client,
            placed.order.id,
            QuoteDecisionRequest {
                approved: Some(true),
                rejection_reason: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
    }

    #[tokio::test]
    async fn lab_progression_and_result_attachment() {
        let state = demo_state();
        let client = claims(&state, "client@pipetgo.test").await;
        let lab = claims(&state, "lab@pipetgo.test").await;
        let sid = service_id(&state, PricingMode::Fixed).await;
        let id = create(&state, &client, order_request(sid, false)).await.unwrap().order.id;

        let status = |s: &str| UpdateOrderRequest {
            status: Some(s.into()),
            result_file_url: None,
            result_file_name: None,
        };

        // skipping straight to completion is refused
        let err = update(&state, &lab, id, status("COMPLETED")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));

        // clients never update orders
        let err = update(&state, &client, id, status("ACKNOWLEDGED")).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { .. }));

        let acked = update(&state, &lab, id, status("ACKNOWLEDGED")).await.unwrap();
        assert!(acked.order.acknowledged_at.is_some());
        update(&state, &lab, id, status("IN_PROGRESS")).await.unwrap();

        let done = update(
            &state,
            &lab,
            id,
            UpdateOrderRequest {
                status: Some("COMPLETED".into()),
                result_file_url: Some("https://files.pipetgo.test/results/1.pdf".into()),
                result_file_name: Some("results.pdf".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(done.order.status, OrderStatus::Completed);
        assert!(done.order.completed_at.is_some());
        assert_eq!(done.attachments.len(), 1);
        assert_eq!(done.attachments[0].attachment_type, AttachmentType::Result);
        assert_eq!(done.attachments[0].file_type, "application/pdf");
    }

    #[tokio::test]
    async fn custom_quote_on_hybrid_order() {
        let state = demo_state();
        let client = claims(&state, "client@pipetgo.test").await;
        let sid = service_id(&state, PricingMode::Hybrid).await;
        let id = create(&state, &client, order_request(sid, false)).await.unwrap().order.id;

        let short = request_custom_quote(
            &state,
            &client,
            id,
            CustomQuoteRequest {
                reason: Some("cheaper".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(short, ApiError::Validation(_)));

        let view = request_custom_quote(
            &state,
            &client,
            id,
            CustomQuoteRequest {
                reason: Some("We have 40 samples and need volume pricing".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(view.order.status, OrderStatus::QuoteRequested);
        assert_eq!(view.order.quoted_price, None);
        assert_eq!(
            view.order.special_instructions.as_deref(),
            Some("Custom Quote Requested: We have 40 samples and need volume pricing")
        );
    }

    #[tokio::test]
    async fn custom_quote_requires_hybrid() {
        let state = demo_state();
        let client = claims(&state, "client@pipetgo.test").await;
        let sid = service_id(&state, PricingMode::Fixed).await;
        let id = create(&state, &client, order_request(sid, false)).await.unwrap().order.id;

        let err = request_custom_quote(
            &state,
            &client,
            id,
            CustomQuoteRequest {
                reason: Some("We have 40 samples and need volume pricing".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn listing_and_stats_are_scoped() {
        let state = demo_state();
        let client = claims(&state, "client@pipetgo.test").await;
        let admin = claims(&state, "admin@pipetgo.test").await;
        let sid = service_id(&state, PricingMode::Fixed).await;
        create(&state, &client, order_request(sid, false)).await.unwrap();
        create(&state, &client, order_request(sid, false)).await.unwrap();

        let mine = list(&state, &client, OrderQuery { status: None }).await.unwrap();
        assert_eq!(mine.len(), 2);
        let pending = list(
            &state,
            &admin,
            OrderQuery {
                status: Some("PENDING".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.len(), 2);

        let s = stats(&state, &client).await.unwrap();
        assert_eq!(s.total, 2);
        assert_eq!(s.by_status.get(&OrderStatus::Pending), Some(&2));
    }

    #[tokio::test]
    async fn lab_admin_without_lab_sees_nothing() {
        let state = demo_state();
        let grant = crate::workflow::accounts::sign_up(
            &state,
            "10.0.0.1",
            crate::models::SignUpRequest {
                name: Some("New Lab".into()),
                email: Some("newlab@pipetgo.test".into()),
                role: Some("LAB_ADMIN".into()),
                password: Some("Sampl3Pass".into()),
            },
        )
        .await
        .unwrap();
        let lab_admin = state.keys.verify(&grant.token).unwrap();

        assert!(list(&state, &lab_admin, OrderQuery { status: None })
            .await
            .unwrap()
            .is_empty());
        assert_eq!(stats(&state, &lab_admin).await.unwrap(), OrderStats::default());
    }

    #[tokio::test]
    async fn failed_result_file_leaves_status_unchanged() {
        let state = demo_state();
        let client = claims(&state, "client@pipetgo.test").await;
        let sid = service_id(&state, PricingMode::Fixed).await;
        let placed = create(&state, &client, order_request(sid, false)).await.unwrap();

        // admin session whose account no longer exists: the attachment insert fails
        let mut ghost = claims(&state, "admin@pipetgo.test").await;
        ghost.sub = Uuid::new_v4();
        let err = update(
            &state,
            &ghost,
            placed.order.id,
            UpdateOrderRequest {
                status: Some("ACKNOWLEDGED".into()),
                result_file_url: Some("https://files.pipetgo.test/results/2.pdf".into()),
                result_file_name: Some("results.pdf".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));

        let stored = state.store.order_view(placed.order.id).await.unwrap().unwrap();
        assert_eq!(stored.order.status, OrderStatus::Pending);
        assert!(stored.order.acknowledged_at.is_none());
        assert!(stored.attachments.is_empty());
    }
}
