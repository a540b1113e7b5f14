//! Lab repository
//!
//! One lab per owner: the profile upsert keys on the UNIQUE owner_id.

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::DbError;
use crate::models::{Lab, LabLocation, LabProfile};

const LAB_COLUMNS: &str =
    "id, owner_id, name, description, location, certifications, created_at, updated_at";

/// Lab repository
pub struct LabRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LabRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn by_owner(&self, owner_id: Uuid) -> Result<Option<Lab>, DbError> {
        let sql = format!("SELECT {LAB_COLUMNS} FROM labs WHERE owner_id = $1");
        sqlx::query(&sql)
            .bind(owner_id)
            .fetch_optional(self.pool)
            .await?
            .map(|r| lab_from_row(&r))
            .transpose()
    }

    pub async fn upsert(&self, owner_id: Uuid, profile: LabProfile) -> Result<Lab, DbError> {
        let sql = format!(
            r#"
            INSERT INTO labs (id, owner_id, name, description, location, certifications)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (owner_id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                location = EXCLUDED.location,
                certifications = EXCLUDED.certifications,
                updated_at = NOW()
            RETURNING {LAB_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(&profile.name)
            .bind(&profile.description)
            .bind(profile.location.map(Json))
            .bind(&profile.certifications)
            .fetch_one(self.pool)
            .await?;

        lab_from_row(&row)
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM labs")
            .fetch_one(self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

pub(super) fn lab_from_row(row: &PgRow) -> Result<Lab, DbError> {
    let location: Option<Json<LabLocation>> =
        row.try_get("location").map_err(|e| DbError::Decode {
            column: "labs.location",
            value: e.to_string(),
        })?;

    Ok(Lab {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        description: row.get("description"),
        location: location.map(|Json(l)| l),
        certifications: row.get("certifications"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
