//! Postgres user store
//!
//! Runtime-checked `sqlx` queries against a `users` table. The table and its
//! indexes are created on startup if missing.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::models::{NewUser, User, UserFilter, UserId, UserUpdate};
use crate::store::UserStore;

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT,
        nickname TEXT
    )",
    "CREATE INDEX IF NOT EXISTS ix_users_email ON users (email)",
    "CREATE INDEX IF NOT EXISTS ix_users_nickname ON users (nickname)",
];

const UPDATE_USER: &str = "UPDATE users SET
        email = CASE WHEN $2 THEN $3 ELSE email END,
        nickname = CASE WHEN $4 THEN $5 ELSE nickname END
    WHERE id = $1
    RETURNING id, email, nickname";

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Opens a connection pool to `url`.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        info!(max_connections, "Connecting to Postgres user store");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Creates the `users` table and its indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("User table ready");
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        nickname: row.try_get("nickname")?,
    })
}

fn not_found_if_missing(row: Option<PgRow>) -> Result<User> {
    row.as_ref()
        .map(user_from_row)
        .unwrap_or(Err(ServiceError::NotFound))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get(&self, id: UserId) -> Result<User> {
        let row = sqlx::query("SELECT id, email, nickname FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        not_found_if_missing(row)
    }

    async fn find(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let query = match filter {
            UserFilter::All => sqlx::query("SELECT id, email, nickname FROM users ORDER BY id"),
            UserFilter::ById(id) => {
                sqlx::query("SELECT id, email, nickname FROM users WHERE id = $1 ORDER BY id")
                    .bind(*id)
            }
            UserFilter::ByEmail(email) => {
                sqlx::query("SELECT id, email, nickname FROM users WHERE email = $1 ORDER BY id")
                    .bind(email.clone())
            }
            UserFilter::ByNickname(nickname) => sqlx::query(
                "SELECT id, email, nickname FROM users WHERE nickname = $1 ORDER BY id",
            )
            .bind(nickname.clone()),
        };

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert(&self, new_user: NewUser) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (email, nickname) VALUES ($1, $2) RETURNING id, email, nickname",
        )
        .bind(new_user.email)
        .bind(new_user.nickname)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| ServiceError::StoreUnavailable(err.to_string()))?;
        user_from_row(&row)
    }

    async fn update(&self, id: UserId, changes: &UserUpdate) -> Result<User> {
        let row = sqlx::query(UPDATE_USER)
            .bind(id)
            .bind(changes.email.is_some())
            .bind(changes.email.clone().flatten())
            .bind(changes.nickname.is_some())
            .bind(changes.nickname.clone().flatten())
            .fetch_optional(&self.pool)
            .await?;
        not_found_if_missing(row)
    }

    async fn delete(&self, id: UserId) -> Result<User> {
        let row = sqlx::query("DELETE FROM users WHERE id = $1 RETURNING id, email, nickname")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        not_found_if_missing(row)
    }
}
