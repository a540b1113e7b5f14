//! PostgreSQL repositories and the `Store` implementation built on them
//!
//! Each repository follows these patterns:
//! - Uses JOINs for list operations (no N+1)
//! - Relies on constraints and conditional updates (no check-then-insert)
//! - Money is NUMERIC in the table and float8 on the wire

pub mod labs;
pub mod orders;
pub mod services;
pub mod users;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub use labs::LabRepo;
pub use orders::OrderRepo;
pub use services::ServiceRepo;
pub use users::UserRepo;

use super::{DbError, NewAttachment, NewOrder, NewUser, OrderListQuery, OrderScope, Store};
use crate::models::{
    Attachment, Lab, LabProfile, LabService, Order, OrderFact, OrderStatus, OrderView, Paginated,
    Pagination, ServiceDraft, ServiceFilter, ServiceWithLab, User, UserRole,
};

/// Parse an enum stored as text.
pub(crate) fn parse_column<T: FromStr>(column: &'static str, value: String) -> Result<T, DbError> {
    value
        .parse()
        .map_err(|_| DbError::Decode { column, value })
}

/// SQLSTATE 23505
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// `Store` backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, DbError> {
        UserRepo::new(&self.pool).get(id).await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        UserRepo::new(&self.pool).by_email(email).await
    }

    async fn create_user(&self, new: NewUser) -> Result<User, DbError> {
        UserRepo::new(&self.pool).create(new).await
    }

    async fn set_initial_password(&self, user_id: Uuid, hash: &str) -> Result<bool, DbError> {
        UserRepo::new(&self.pool)
            .set_initial_password(user_id, hash)
            .await
    }

    async fn count_users(&self, role: UserRole) -> Result<i64, DbError> {
        UserRepo::new(&self.pool).count_by_role(role).await
    }

    async fn lab_by_owner(&self, owner_id: Uuid) -> Result<Option<Lab>, DbError> {
        LabRepo::new(&self.pool).by_owner(owner_id).await
    }

    async fn upsert_lab(&self, owner_id: Uuid, profile: LabProfile) -> Result<Lab, DbError> {
        LabRepo::new(&self.pool).upsert(owner_id, profile).await
    }

    async fn count_labs(&self) -> Result<i64, DbError> {
        LabRepo::new(&self.pool).count().await
    }

    async fn list_services(
        &self,
        filter: &ServiceFilter,
        page: Pagination,
    ) -> Result<Paginated<ServiceWithLab>, DbError> {
        ServiceRepo::new(&self.pool).list(filter, page).await
    }

    async fn service_by_id(&self, id: Uuid) -> Result<Option<LabService>, DbError> {
        ServiceRepo::new(&self.pool).get(id).await
    }

    async fn create_service(&self, lab_id: Uuid, draft: ServiceDraft) -> Result<LabService, DbError> {
        ServiceRepo::new(&self.pool).create(lab_id, draft).await
    }

    async fn update_service(
        &self,
        id: Uuid,
        lab_id: Uuid,
        draft: ServiceDraft,
    ) -> Result<Option<LabService>, DbError> {
        ServiceRepo::new(&self.pool).update(id, lab_id, draft).await
    }

    async fn set_service_active(
        &self,
        id: Uuid,
        lab_id: Uuid,
        active: bool,
    ) -> Result<Option<LabService>, DbError> {
        ServiceRepo::new(&self.pool)
            .set_active(id, lab_id, active)
            .await
    }

    async fn count_owned_services(&self, lab_id: Uuid, ids: &[Uuid]) -> Result<i64, DbError> {
        ServiceRepo::new(&self.pool).count_owned(lab_id, ids).await
    }

    async fn bulk_set_active(&self, lab_id: Uuid, ids: &[Uuid], active: bool) -> Result<u64, DbError> {
        ServiceRepo::new(&self.pool)
            .bulk_set_active(lab_id, ids, active)
            .await
    }

    async fn create_order(&self, new: NewOrder) -> Result<OrderView, DbError> {
        OrderRepo::new(&self.pool).create(new).await
    }

    async fn order_view(&self, id: Uuid) -> Result<Option<OrderView>, DbError> {
        OrderRepo::new(&self.pool).view(id).await
    }

    async fn list_orders(&self, query: &OrderListQuery) -> Result<Vec<OrderView>, DbError> {
        OrderRepo::new(&self.pool).list(query).await
    }

    async fn save_order_if_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, DbError> {
        OrderRepo::new(&self.pool)
            .save_if_status(order, expected)
            .await
    }

    async fn status_counts(&self, scope: OrderScope) -> Result<Vec<(OrderStatus, i64)>, DbError> {
        OrderRepo::new(&self.pool).status_counts(scope).await
    }

    async fn completed_revenue(&self, scope: OrderScope) -> Result<f64, DbError> {
        OrderRepo::new(&self.pool).completed_revenue(scope).await
    }

    async fn order_facts(
        &self,
        lab_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrderFact>, DbError> {
        OrderRepo::new(&self.pool).facts(lab_id, since).await
    }

    async fn create_attachment(&self, new: NewAttachment) -> Result<Attachment, DbError> {
        OrderRepo::new(&self.pool).create_attachment(new).await
    }
}
