//! User repository
//!
//! - create: relies on the UNIQUE email constraint (no check-then-insert)
//! - set_initial_password: conditional UPDATE so only the first hash wins

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::{DbError, NewUser};
use crate::models::{User, UserRole};

use super::{is_unique_violation, parse_column};

const USER_COLUMNS: &str = "id, name, email, role, password_hash, created_at, updated_at";

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(|r| user_from_row(&r))
            .transpose()
    }

    pub async fn by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?
            .map(|r| user_from_row(&r))
            .transpose()
    }

    pub async fn create(&self, new: NewUser) -> Result<User, DbError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, role, password_hash)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(&new.email)
            .bind(new.role.as_str())
            .bind(&new.password_hash)
            .fetch_one(self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::Conflict {
                        resource: "user",
                        detail: new.email.clone(),
                    }
                } else {
                    DbError::Sqlx(e)
                }
            })?;

        user_from_row(&row)
    }

    pub async fn set_initial_password(&self, id: Uuid, hash: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET password_hash = $2, updated_at = NOW()
            WHERE id = $1 AND password_hash IS NULL
            "#,
        )
        .bind(id)
        .bind(hash)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn count_by_role(&self, role: UserRole) -> Result<i64, DbError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

fn user_from_row(row: &PgRow) -> Result<User, DbError> {
    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: parse_column("users.role", row.get("role"))?,
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::migrations::run(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_email_is_a_conflict() {
        let pool = pool().await;
        let repo = UserRepo::new(&pool);
        let email = format!("dup-{}@example.com", Uuid::new_v4());
        let new = NewUser {
            name: Some("Dup".into()),
            email: email.clone(),
            role: UserRole::Client,
            password_hash: None,
        };

        repo.create(new.clone()).await.expect("first insert");
        let err = repo.create(new).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn initial_password_only_once() {
        let pool = pool().await;
        let repo = UserRepo::new(&pool);
        let user = repo
            .create(NewUser {
                name: None,
                email: format!("pw-{}@example.com", Uuid::new_v4()),
                role: UserRole::Client,
                password_hash: None,
            })
            .await
            .expect("insert");

        assert!(repo.set_initial_password(user.id, "h1").await.unwrap());
        assert!(!repo.set_initial_password(user.id, "h2").await.unwrap());
    }
}
