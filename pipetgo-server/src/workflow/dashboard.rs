//! Role-specific dashboard payloads

use serde::Serialize;

use super::own_lab;
use crate::auth::SessionClaims;
use crate::db::{OrderListQuery, OrderScope};
use crate::http::ApiError;
use crate::models::{Lab, OrderStatus, OrderView, UserRole};
use crate::state::AppState;

const RECENT_ORDERS: u32 = 10;

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dashboard {
    Client(ClientDashboard),
    LabAdmin(LabDashboard),
    Admin(AdminDashboard),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDashboard {
    pub orders: Vec<OrderView>,
    pub stats: ClientStats,
}

#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    pub total_orders: usize,
    pub pending_count: usize,
    pub completed_count: usize,
    pub total_spent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabDashboard {
    pub lab: Option<Lab>,
    pub pending_orders: Vec<OrderView>,
    pub in_progress_orders: Vec<OrderView>,
    pub completed_orders: Vec<OrderView>,
    pub stats: LabStats,
}

#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabStats {
    pub total_orders: usize,
    pub pending_count: usize,
    pub completed_count: usize,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    pub total_revenue: f64,
    pub total_labs: i64,
    pub total_clients: i64,
    pub recent_orders: Vec<OrderView>,
}

/// Sum of quoted prices of completed orders.
fn completed_total(orders: &[OrderView]) -> f64 {
    orders
        .iter()
        .filter(|v| v.order.status == OrderStatus::Completed)
        .filter_map(|v| v.order.quoted_price)
        .sum()
}

pub async fn get(state: &AppState, claims: &SessionClaims) -> Result<Dashboard, ApiError> {
    match claims.role {
        UserRole::Client => client(state, claims).await.map(Dashboard::Client),
        UserRole::LabAdmin => lab(state, claims).await.map(Dashboard::LabAdmin),
        UserRole::Admin => admin(state).await.map(Dashboard::Admin),
    }
}

async fn client(state: &AppState, claims: &SessionClaims) -> Result<ClientDashboard, ApiError> {
    let orders = state
        .store
        .list_orders(&OrderListQuery::new(OrderScope::Client(claims.sub)))
        .await?;
    let count = |status: OrderStatus| orders.iter().filter(|v| v.order.status == status).count();
    let stats = ClientStats {
        total_orders: orders.len(),
        pending_count: count(OrderStatus::Pending),
        completed_count: count(OrderStatus::Completed),
        total_spent: completed_total(&orders),
    };
    Ok(ClientDashboard { orders, stats })
}

async fn lab(state: &AppState, claims: &SessionClaims) -> Result<LabDashboard, ApiError> {
    let Some(lab) = own_lab(state, claims).await? else {
        return Ok(LabDashboard {
            lab: None,
            pending_orders: Vec::new(),
            in_progress_orders: Vec::new(),
            completed_orders: Vec::new(),
            stats: LabStats::default(),
        });
    };

    let orders = state
        .store
        .list_orders(&OrderListQuery::new(OrderScope::Lab(lab.id)))
        .await?;
    let total_orders = orders.len();
    let revenue = completed_total(&orders);

    let mut pending_orders = Vec::new();
    let mut in_progress_orders = Vec::new();
    let mut completed_orders = Vec::new();
    for view in orders {
        match view.order.status {
            OrderStatus::Pending | OrderStatus::Acknowledged => pending_orders.push(view),
            OrderStatus::InProgress => in_progress_orders.push(view),
            OrderStatus::Completed => completed_orders.push(view),
            _ => {}
        }
    }

    let stats = LabStats {
        total_orders,
        pending_count: pending_orders.len(),
        completed_count: completed_orders.len(),
        revenue,
    };
    Ok(LabDashboard {
        lab: Some(lab),
        pending_orders,
        in_progress_orders,
        completed_orders,
        stats,
    })
}

async fn admin(state: &AppState) -> Result<AdminDashboard, ApiError> {
    let counts = state.store.status_counts(OrderScope::All).await?;
    let count = |status: OrderStatus| {
        counts
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, n)| *n)
    };

    Ok(AdminDashboard {
        total_orders: counts.iter().map(|(_, n)| n).sum(),
        pending_orders: count(OrderStatus::Pending),
        completed_orders: count(OrderStatus::Completed),
        total_revenue: state.store.completed_revenue(OrderScope::All).await?,
        total_labs: state.store.count_labs().await?,
        total_clients: state.store.count_users(UserRole::Client).await?,
        recent_orders: state
            .store
            .list_orders(&OrderListQuery::new(OrderScope::All).limit(RECENT_ORDERS))
            .await?,
    })
}
