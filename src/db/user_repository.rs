//! User repository
//!
//! Users are the only entity queried both globally (login, superadmin
//! management) and tenant-scoped (org user administration).

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Role, User};

use super::{fmt_ts, parse_db_timestamp};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    organization_id: Option<String>,
    username: String,
    password_hash: String,
    role: String,
    created_at: String,
    updated_at: String,
}

const USER_COLUMNS: &str =
    "id, organization_id, username, password_hash, role, created_at, updated_at";

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to fetch user by ID")?;

        Ok(row.map(row_to_user))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await
        .context("Failed to fetch user by username")?;

        Ok(row.map(row_to_user))
    }

    /// List users within one organization
    pub async fn list_for_org(&self, organization_id: Uuid) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE organization_id = ? ORDER BY username"
        ))
        .bind(organization_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to list users")?;

        Ok(rows.into_iter().map(row_to_user).collect())
    }

    /// List every user across tenants (superadmin view)
    pub async fn list_all(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username"
        ))
        .fetch_all(self.pool)
        .await
        .context("Failed to list users")?;

        Ok(rows.into_iter().map(row_to_user).collect())
    }

    pub async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, organization_id, username, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(user.organization_id.map(|o| o.to_string()))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(fmt_ts(user.created_at))
        .bind(fmt_ts(user.updated_at))
        .execute(self.pool)
        .await
        .context("Failed to insert user")?;

        Ok(())
    }

    pub async fn update(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>> {
        let now = fmt_ts(chrono::Utc::now());
        let result = sqlx::query(
            "UPDATE users SET username = ?, password_hash = ?, role = ?, updated_at = ? WHERE id = ?",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(&now)
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update user")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_user(row: UserRow) -> User {
    User {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        organization_id: row
            .organization_id
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok()),
        username: row.username,
        password_hash: row.password_hash,
        role: row.role.parse().unwrap_or(Role::User),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
