//! Storage seam between the workflows and the database
//!
//! `PgStore` is the production implementation; `MemoryStore` keeps the
//! same rows in process memory for tests and the demo server.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Attachment, AttachmentType, ClientDetails, Lab, LabProfile, LabService, Order, OrderFact,
    OrderStatus, OrderView, Paginated, Pagination, ServiceDraft, ServiceFilter, ServiceWithLab,
    User, UserRole,
};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("{resource} already exists: {detail}")]
    Conflict {
        resource: &'static str,
        detail: String,
    },

    /// A stored value no longer parses (enum text, JSON column)
    #[error("corrupt {column} value: {value}")]
    Decode { column: &'static str, value: String },
}

/// Which orders a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Client(Uuid),
    Lab(Uuid),
}

impl OrderScope {
    pub fn client_id(&self) -> Option<Uuid> {
        match self {
            Self::Client(id) => Some(*id),
            _ => None,
        }
    }

    pub fn lab_id(&self) -> Option<Uuid> {
        match self {
            Self::Lab(id) => Some(*id),
            _ => None,
        }
    }

    pub fn contains(&self, order: &Order) -> bool {
        match self {
            Self::All => true,
            Self::Client(id) => order.client_id == *id,
            Self::Lab(id) => order.lab_id == *id,
        }
    }
}

/// Order listing parameters; results are newest first
#[derive(Debug, Clone, Copy)]
pub struct OrderListQuery {
    pub scope: OrderScope,
    pub status: Option<OrderStatus>,
    pub limit: Option<u32>,
}

impl OrderListQuery {
    pub fn new(scope: OrderScope) -> Self {
        Self {
            scope,
            status: None,
            limit: None,
        }
    }

    pub fn status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub role: UserRole,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: Uuid,
    pub lab_id: Uuid,
    pub service_id: Uuid,
    pub status: OrderStatus,
    pub client_details: ClientDetails,
    pub sample_description: String,
    pub special_instructions: Option<String>,
    pub quoted_price: Option<f64>,
    pub quoted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub order_id: Uuid,
    pub uploaded_by_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub file_size: Option<i64>,
    pub attachment_type: AttachmentType,
}

#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, DbError>;
    /// Lookup by normalized (lowercase) email.
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
    /// Fails with `DbError::Conflict` when the email is taken.
    async fn create_user(&self, new: NewUser) -> Result<User, DbError>;
    /// Store a first password hash. Returns false when one was already set.
    async fn set_initial_password(&self, user_id: Uuid, hash: &str) -> Result<bool, DbError>;
    async fn count_users(&self, role: UserRole) -> Result<i64, DbError>;

    // labs
    async fn lab_by_owner(&self, owner_id: Uuid) -> Result<Option<Lab>, DbError>;
    /// Create the owner's lab or replace its profile.
    async fn upsert_lab(&self, owner_id: Uuid, profile: LabProfile) -> Result<Lab, DbError>;
    async fn count_labs(&self) -> Result<i64, DbError>;

    // services
    async fn list_services(
        &self,
        filter: &ServiceFilter,
        page: Pagination,
    ) -> Result<Paginated<ServiceWithLab>, DbError>;
    async fn service_by_id(&self, id: Uuid) -> Result<Option<LabService>, DbError>;
    async fn create_service(&self, lab_id: Uuid, draft: ServiceDraft) -> Result<LabService, DbError>;
    /// Replace a service's fields; `None` when it is missing or owned by another lab.
    async fn update_service(
        &self,
        id: Uuid,
        lab_id: Uuid,
        draft: ServiceDraft,
    ) -> Result<Option<LabService>, DbError>;
    async fn set_service_active(
        &self,
        id: Uuid,
        lab_id: Uuid,
        active: bool,
    ) -> Result<Option<LabService>, DbError>;
    /// How many of `ids` belong to `lab_id`.
    async fn count_owned_services(&self, lab_id: Uuid, ids: &[Uuid]) -> Result<i64, DbError>;
    async fn bulk_set_active(&self, lab_id: Uuid, ids: &[Uuid], active: bool) -> Result<u64, DbError>;

    // orders
    async fn create_order(&self, new: NewOrder) -> Result<OrderView, DbError>;
    async fn order_view(&self, id: Uuid) -> Result<Option<OrderView>, DbError>;
    async fn list_orders(&self, query: &OrderListQuery) -> Result<Vec<OrderView>, DbError>;
    /// Write every mutable order field, but only while the stored status is
    /// still `expected`. Returns false when another writer got there first.
    async fn save_order_if_status(&self, order: &Order, expected: OrderStatus)
        -> Result<bool, DbError>;
    async fn status_counts(&self, scope: OrderScope) -> Result<Vec<(OrderStatus, i64)>, DbError>;
    /// Sum of quoted prices of completed orders.
    async fn completed_revenue(&self, scope: OrderScope) -> Result<f64, DbError>;
    async fn order_facts(
        &self,
        lab_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrderFact>, DbError>;

    // attachments
    async fn create_attachment(&self, new: NewAttachment) -> Result<Attachment, DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_builder() {
        let lab = Uuid::new_v4();
        let q = OrderListQuery::new(OrderScope::Lab(lab))
            .status(Some(OrderStatus::Pending))
            .limit(10);
        assert_eq!(q.scope.lab_id(), Some(lab));
        assert_eq!(q.scope.client_id(), None);
        assert_eq!(q.limit, Some(10));
    }
}
