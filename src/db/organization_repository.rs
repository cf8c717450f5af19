//! Organization (tenant) repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{CreateOrganizationRequest, Organization, UpdateOrganizationRequest};

use super::{fmt_ts, parse_db_timestamp};

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    slug: String,
    timezone: String,
    is_active: i64,
    created_at: String,
    updated_at: String,
}

pub struct OrganizationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrganizationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Organization>> {
        let rows = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name, slug, timezone, is_active, created_at, updated_at
            FROM organizations
            ORDER BY name
            "#,
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to list organizations")?;

        Ok(rows.into_iter().map(row_to_org).collect())
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name, slug, timezone, is_active, created_at, updated_at
            FROM organizations
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get organization")?;

        Ok(row.map(row_to_org))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name, slug, timezone, is_active, created_at, updated_at
            FROM organizations
            WHERE slug = ?
            "#,
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await
        .context("Failed to get organization by slug")?;

        Ok(row.map(row_to_org))
    }

    pub async fn create(&self, req: &CreateOrganizationRequest) -> Result<Organization> {
        let id = Uuid::new_v4();
        let now = fmt_ts(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, slug, timezone, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&req.name)
        .bind(&req.slug)
        .bind(&req.timezone)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create organization")?;

        self.get_by_id(id)
            .await?
            .context("Failed to retrieve created organization")
    }

    pub async fn update(
        &self,
        id: Uuid,
        req: &UpdateOrganizationRequest,
    ) -> Result<Option<Organization>> {
        let existing = self.get_by_id(id).await?;
        let Some(existing) = existing else {
            return Ok(None);
        };

        let name = req.name.clone().unwrap_or(existing.name);
        let slug = req.slug.clone().unwrap_or(existing.slug);
        let timezone = req.timezone.clone().unwrap_or(existing.timezone);
        let is_active = req.is_active.unwrap_or(existing.is_active);
        let now = fmt_ts(Utc::now());

        sqlx::query(
            r#"
            UPDATE organizations
            SET name = ?, slug = ?, timezone = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&name)
        .bind(&slug)
        .bind(&timezone)
        .bind(is_active as i64)
        .bind(&now)
        .bind(id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update organization")?;

        self.get_by_id(id).await
    }

    /// Whether any tenant data still references the organization.
    /// Gates deletion; an organization with users or business data must be
    /// deactivated instead.
    pub async fn has_dependents(&self, id: Uuid) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE organization_id = ?) +
                (SELECT COUNT(*) FROM employees WHERE organization_id = ?) +
                (SELECT COUNT(*) FROM clients WHERE organization_id = ?)
            "#,
        )
        .bind(id.to_string())
        .bind(id.to_string())
        .bind(id.to_string())
        .fetch_one(self.pool)
        .await
        .context("Failed to count organization dependents")?;

        Ok(count > 0)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to delete organization")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_org(row: OrganizationRow) -> Organization {
    Organization {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        name: row.name,
        slug: row.slug,
        timezone: row.timezone,
        is_active: row.is_active != 0,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
