//! Lab service repository
//!
//! - list: single JOIN with the lab, COUNT(*) OVER() for the total
//! - writes are scoped by lab_id so a lab can only touch its own rows

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::DbError;
use crate::models::{
    LabCard, LabLocation, LabService, Paginated, Pagination, ServiceDraft, ServiceFilter,
    ServiceWithLab,
};

use super::parse_column;

const SERVICE_COLUMNS: &str = "s.id, s.lab_id, s.name, s.description, s.category, s.pricing_mode, \
     s.price_per_unit::float8 AS price_per_unit, s.unit_type, s.turnaround_days, \
     s.sample_requirements, s.active, s.created_at, s.updated_at";

/// Service repository
pub struct ServiceRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ServiceRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Filtered catalog page, newest first.
    pub async fn list(
        &self,
        filter: &ServiceFilter,
        page: Pagination,
    ) -> Result<Paginated<ServiceWithLab>, DbError> {
        let sql = format!(
            r#"
            SELECT {SERVICE_COLUMNS},
                l.name AS lab_name,
                l.location AS lab_location,
                l.certifications AS lab_certifications,
                COUNT(*) OVER() AS total
            FROM lab_services s
            JOIN labs l ON l.id = s.lab_id
            WHERE ($1::bool = FALSE OR s.active)
              AND ($2::text IS NULL OR s.category = $2)
              AND ($3::uuid IS NULL OR s.lab_id = $3)
              AND ($4::text IS NULL
                   OR s.name ILIKE $4 ESCAPE '\'
                   OR s.description ILIKE $4 ESCAPE '\')
            ORDER BY s.created_at DESC
            LIMIT $5 OFFSET $6
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.active_only)
            .bind(&filter.category)
            .bind(filter.lab_id)
            .bind(filter.search.as_deref().map(contains_pattern))
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(self.pool)
            .await?;

        let total = match rows.first() {
            Some(r) => r.get::<i64, _>("total"),
            // an empty page past the end still needs the real total
            None if page.page > 1 => self.count(filter).await?,
            None => 0,
        };
        let items = rows
            .iter()
            .map(|r| {
                let service = service_from_row(r)?;
                let location: Option<Json<LabLocation>> =
                    r.try_get("lab_location").map_err(|e| DbError::Decode {
                        column: "labs.location",
                        value: e.to_string(),
                    })?;
                Ok(ServiceWithLab {
                    lab: LabCard {
                        id: service.lab_id,
                        name: r.get("lab_name"),
                        location: location.map(|Json(l)| l),
                        certifications: r.get("lab_certifications"),
                    },
                    service,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(Paginated::new(items, total, page))
    }

    async fn count(&self, filter: &ServiceFilter) -> Result<i64, DbError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n FROM lab_services s
            WHERE ($1::bool = FALSE OR s.active)
              AND ($2::text IS NULL OR s.category = $2)
              AND ($3::uuid IS NULL OR s.lab_id = $3)
              AND ($4::text IS NULL
                   OR s.name ILIKE $4 ESCAPE '\'
                   OR s.description ILIKE $4 ESCAPE '\')
            "#,
        )
        .bind(filter.active_only)
        .bind(&filter.category)
        .bind(filter.lab_id)
        .bind(filter.search.as_deref().map(contains_pattern))
        .fetch_one(self.pool)
        .await?;
        Ok(row.get("n"))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<LabService>, DbError> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM lab_services s WHERE s.id = $1");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(|r| service_from_row(&r))
            .transpose()
    }

    pub async fn create(&self, lab_id: Uuid, draft: ServiceDraft) -> Result<LabService, DbError> {
        let sql = format!(
            r#"
            WITH s AS (
                INSERT INTO lab_services (id, lab_id, name, description, category, pricing_mode,
                    price_per_unit, unit_type, turnaround_days, sample_requirements)
                VALUES ($1, $2, $3, $4, $5, $6, $7::numeric, $8, $9, $10)
                RETURNING *
            )
            SELECT {SERVICE_COLUMNS} FROM s
            "#
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(lab_id)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.category.as_str())
            .bind(draft.pricing_mode.as_str())
            .bind(draft.price_per_unit)
            .bind(&draft.unit_type)
            .bind(draft.turnaround_days)
            .bind(&draft.sample_requirements)
            .fetch_one(self.pool)
            .await?;

        service_from_row(&row)
    }

    pub async fn update(
        &self,
        id: Uuid,
        lab_id: Uuid,
        draft: ServiceDraft,
    ) -> Result<Option<LabService>, DbError> {
        let sql = format!(
            r#"
            WITH s AS (
                UPDATE lab_services SET
                    name = $3, description = $4, category = $5, pricing_mode = $6,
                    price_per_unit = $7::numeric, unit_type = $8, turnaround_days = $9,
                    sample_requirements = $10, updated_at = NOW()
                WHERE id = $1 AND lab_id = $2
                RETURNING *
            )
            SELECT {SERVICE_COLUMNS} FROM s
            "#
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(lab_id)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.category.as_str())
            .bind(draft.pricing_mode.as_str())
            .bind(draft.price_per_unit)
            .bind(&draft.unit_type)
            .bind(draft.turnaround_days)
            .bind(&draft.sample_requirements)
            .fetch_optional(self.pool)
            .await?
            .map(|r| service_from_row(&r))
            .transpose()
    }

    pub async fn set_active(
        &self,
        id: Uuid,
        lab_id: Uuid,
        active: bool,
    ) -> Result<Option<LabService>, DbError> {
        let sql = format!(
            r#"
            WITH s AS (
                UPDATE lab_services SET active = $3, updated_at = NOW()
                WHERE id = $1 AND lab_id = $2
                RETURNING *
            )
            SELECT {SERVICE_COLUMNS} FROM s
            "#
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(lab_id)
            .bind(active)
            .fetch_optional(self.pool)
            .await?
            .map(|r| service_from_row(&r))
            .transpose()
    }

    pub async fn count_owned(&self, lab_id: Uuid, ids: &[Uuid]) -> Result<i64, DbError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM lab_services WHERE lab_id = $1 AND id = ANY($2)",
        )
        .bind(lab_id)
        .bind(ids)
        .fetch_one(self.pool)
        .await?;
        Ok(row.get("n"))
    }

    pub async fn bulk_set_active(
        &self,
        lab_id: Uuid,
        ids: &[Uuid],
        active: bool,
    ) -> Result<u64, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE lab_services SET active = $3, updated_at = NOW()
            WHERE lab_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(lab_id)
        .bind(ids)
        .bind(active)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// ILIKE pattern matching `needle` anywhere, with wildcards escaped.
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub(super) fn service_from_row(row: &PgRow) -> Result<LabService, DbError> {
    Ok(LabService {
        id: row.get("id"),
        lab_id: row.get("lab_id"),
        name: row.get("name"),
        description: row.get("description"),
        category: parse_column("lab_services.category", row.get("category"))?,
        pricing_mode: parse_column("lab_services.pricing_mode", row.get("pricing_mode"))?,
        price_per_unit: row.get("price_per_unit"),
        unit_type: row.get("unit_type"),
        turnaround_days: row.get("turnaround_days"),
        sample_requirements: row.get("sample_requirements"),
        active: row.get("active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
