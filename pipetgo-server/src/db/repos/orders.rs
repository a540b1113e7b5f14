//! Order and attachment repository
//!
//! - views: one JOIN query for order + service + lab + client, one
//!   `ANY($1)` query for the attachments of the whole page (no N+1)
//! - save_if_status: compare-and-set on the previous status

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::{DbError, NewAttachment, NewOrder, OrderListQuery, OrderScope};
use crate::models::{
    Attachment, ClientDetails, ClientSummary, LabSummary, Order, OrderFact, OrderStatus,
    OrderView, ServiceSummary,
};

use super::parse_column;

const VIEW_SELECT: &str = r#"
    SELECT o.id, o.client_id, o.lab_id, o.service_id, o.status, o.client_details,
        o.sample_description, o.special_instructions,
        o.quoted_price::float8 AS quoted_price, o.quoted_at, o.quote_notes,
        o.estimated_turnaround_days, o.quote_approved_at, o.quote_rejected_at,
        o.quote_rejected_reason, o.acknowledged_at, o.completed_at,
        o.created_at, o.updated_at,
        s.name AS service_name, s.category AS service_category,
        s.pricing_mode AS service_pricing_mode,
        l.name AS lab_name, l.owner_id AS lab_owner_id,
        u.name AS client_name, u.email AS client_email
    FROM orders o
    JOIN lab_services s ON s.id = o.service_id
    JOIN labs l ON l.id = o.lab_id
    JOIN users u ON u.id = o.client_id
"#;

const ATTACHMENT_COLUMNS: &str = "id, order_id, uploaded_by_id, file_name, file_url, file_type, \
     file_size, attachment_type, created_at";

/// Order repository
pub struct OrderRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewOrder) -> Result<OrderView, DbError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO orders (id, client_id, lab_id, service_id, status, client_details,
                sample_description, special_instructions, quoted_price, quoted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::numeric, $10)
            "#,
        )
        .bind(id)
        .bind(new.client_id)
        .bind(new.lab_id)
        .bind(new.service_id)
        .bind(new.status.as_str())
        .bind(Json(&new.client_details))
        .bind(&new.sample_description)
        .bind(&new.special_instructions)
        .bind(new.quoted_price)
        .bind(new.quoted_at)
        .execute(self.pool)
        .await?;

        self.view(id).await?.ok_or_else(|| DbError::NotFound {
            resource: "order",
            id: id.to_string(),
        })
    }

    pub async fn view(&self, id: Uuid) -> Result<Option<OrderView>, DbError> {
        let sql = format!("{VIEW_SELECT} WHERE o.id = $1");
        let Some(row) = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut view = view_from_row(&row)?;
        view.attachments = self
            .attachments_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(view))
    }

    pub async fn list(&self, query: &OrderListQuery) -> Result<Vec<OrderView>, DbError> {
        let sql = format!(
            r#"{VIEW_SELECT}
            WHERE ($1::uuid IS NULL OR o.client_id = $1)
              AND ($2::uuid IS NULL OR o.lab_id = $2)
              AND ($3::text IS NULL OR o.status = $3)
            ORDER BY o.created_at DESC
            LIMIT $4
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(query.scope.client_id())
            .bind(query.scope.lab_id())
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.limit.map(i64::from))
            .fetch_all(self.pool)
            .await?;

        let mut views = rows
            .iter()
            .map(view_from_row)
            .collect::<Result<Vec<_>, DbError>>()?;

        let ids: Vec<Uuid> = views.iter().map(|v| v.order.id).collect();
        let mut attachments = self.attachments_for(&ids).await?;
        for view in &mut views {
            view.attachments = attachments.remove(&view.order.id).unwrap_or_default();
        }
        Ok(views)
    }

    async fn attachments_for(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Attachment>>, DbError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE order_id = ANY($1) ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(order_ids)
            .fetch_all(self.pool)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        for row in &rows {
            let a = attachment_from_row(row)?;
            grouped.entry(a.order_id).or_default().push(a);
        }
        Ok(grouped)
    }

    pub async fn save_if_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $3,
                special_instructions = $4,
                quoted_price = $5::numeric,
                quoted_at = $6,
                quote_notes = $7,
                estimated_turnaround_days = $8,
                quote_approved_at = $9,
                quote_rejected_at = $10,
                quote_rejected_reason = $11,
                acknowledged_at = $12,
                completed_at = $13,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(order.id)
        .bind(expected.as_str())
        .bind(order.status.as_str())
        .bind(&order.special_instructions)
        .bind(order.quoted_price)
        .bind(order.quoted_at)
        .bind(&order.quote_notes)
        .bind(order.estimated_turnaround_days)
        .bind(order.quote_approved_at)
        .bind(order.quote_rejected_at)
        .bind(&order.quote_rejected_reason)
        .bind(order.acknowledged_at)
        .bind(order.completed_at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn status_counts(
        &self,
        scope: OrderScope,
    ) -> Result<Vec<(OrderStatus, i64)>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS n FROM orders
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND ($2::uuid IS NULL OR lab_id = $2)
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(scope.client_id())
        .bind(scope.lab_id())
        .fetch_all(self.pool)
        .await?;

        rows.iter()
            .map(|r| Ok((parse_column("orders.status", r.get("status"))?, r.get("n"))))
            .collect()
    }

    pub async fn completed_revenue(&self, scope: OrderScope) -> Result<f64, DbError> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quoted_price), 0)::float8 AS revenue FROM orders
            WHERE status = 'COMPLETED'
              AND ($1::uuid IS NULL OR client_id = $1)
              AND ($2::uuid IS NULL OR lab_id = $2)
            "#,
        )
        .bind(scope.client_id())
        .bind(scope.lab_id())
        .fetch_one(self.pool)
        .await?;
        Ok(row.get("revenue"))
    }

    pub async fn facts(
        &self,
        lab_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrderFact>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT o.service_id, s.name AS service_name, o.status,
                o.quoted_price::float8 AS quoted_price, o.created_at
            FROM orders o
            JOIN lab_services s ON s.id = o.service_id
            WHERE o.lab_id = $1 AND ($2::timestamptz IS NULL OR o.created_at >= $2)
            "#,
        )
        .bind(lab_id)
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(OrderFact {
                    service_id: r.get("service_id"),
                    service_name: r.get("service_name"),
                    status: parse_column("orders.status", r.get("status"))?,
                    quoted_price: r.get("quoted_price"),
                    created_at: r.get("created_at"),
                })
            })
            .collect()
    }

    pub async fn create_attachment(&self, new: NewAttachment) -> Result<Attachment, DbError> {
        let sql = format!(
            r#"
            INSERT INTO attachments (id, order_id, uploaded_by_id, file_name, file_url,
                file_type, file_size, attachment_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(new.order_id)
            .bind(new.uploaded_by_id)
            .bind(&new.file_name)
            .bind(&new.file_url)
            .bind(&new.file_type)
            .bind(new.file_size)
            .bind(new.attachment_type.as_str())
            .fetch_one(self.pool)
            .await?;

        attachment_from_row(&row)
    }
}

fn view_from_row(row: &PgRow) -> Result<OrderView, DbError> {
    let details: Json<ClientDetails> =
        row.try_get("client_details").map_err(|e| DbError::Decode {
            column: "orders.client_details",
            value: e.to_string(),
        })?;

    let order = Order {
        id: row.get("id"),
        client_id: row.get("client_id"),
        lab_id: row.get("lab_id"),
        service_id: row.get("service_id"),
        status: parse_column("orders.status", row.get("status"))?,
        client_details: details.0,
        sample_description: row.get("sample_description"),
        special_instructions: row.get("special_instructions"),
        quoted_price: row.get("quoted_price"),
        quoted_at: row.get("quoted_at"),
        quote_notes: row.get("quote_notes"),
        estimated_turnaround_days: row.get("estimated_turnaround_days"),
        quote_approved_at: row.get("quote_approved_at"),
        quote_rejected_at: row.get("quote_rejected_at"),
        quote_rejected_reason: row.get("quote_rejected_reason"),
        acknowledged_at: row.get("acknowledged_at"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    };

    Ok(OrderView {
        service: ServiceSummary {
            id: order.service_id,
            name: row.get("service_name"),
            category: parse_column("lab_services.category", row.get("service_category"))?,
            pricing_mode: parse_column(
                "lab_services.pricing_mode",
                row.get("service_pricing_mode"),
            )?,
        },
        lab: LabSummary {
            id: order.lab_id,
            name: row.get("lab_name"),
            owner_id: row.get("lab_owner_id"),
        },
        client: ClientSummary {
            id: order.client_id,
            name: row.get("client_name"),
            email: row.get("client_email"),
        },
        attachments: Vec::new(),
        order,
    })
}

fn attachment_from_row(row: &PgRow) -> Result<Attachment, DbError> {
    Ok(Attachment {
        id: row.get("id"),
        order_id: row.get("order_id"),
        uploaded_by_id: row.get("uploaded_by_id"),
        file_name: row.get("file_name"),
        file_url: row.get("file_url"),
        file_type: row.get("file_type"),
        file_size: row.get("file_size"),
        attachment_type: parse_column("attachments.attachment_type", row.get("attachment_type"))?,
        created_at: row.get("created_at"),
    })
}
