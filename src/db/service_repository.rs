//! Service (treatment) repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{CreateServiceRequest, RecordStatus, Service, UpdateServiceRequest};

use super::{fmt_ts, parse_db_timestamp};

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: String,
    organization_id: String,
    name: String,
    duration_minutes: i64,
    price_cents: i64,
    status: String,
    created_at: String,
    updated_at: String,
}

const SERVICE_COLUMNS: &str =
    "id, organization_id, name, duration_minutes, price_cents, status, created_at, updated_at";

pub struct ServiceRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ServiceRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, organization_id: Uuid, include_hidden: bool) -> Result<Vec<Service>> {
        let mut sql =
            format!("SELECT {SERVICE_COLUMNS} FROM services WHERE organization_id = ?");
        if !include_hidden {
            sql.push_str(" AND status = 'active'");
        }
        sql.push_str(" ORDER BY name");

        let rows = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(organization_id.to_string())
            .fetch_all(self.pool)
            .await
            .context("Failed to list services")?;

        Ok(rows.into_iter().map(row_to_service).collect())
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Service>> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = ? AND organization_id = ?"
        ))
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get service")?;

        Ok(row.map(row_to_service))
    }

    /// Fetch several services at once, preserving only rows that exist within
    /// the organization. Used to validate booking service_ids.
    pub async fn get_many(&self, organization_id: Uuid, ids: &[Uuid]) -> Result<Vec<Service>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services
             WHERE organization_id = ? AND id IN ({placeholders})"
        );

        let mut query = sqlx::query_as::<_, ServiceRow>(&sql).bind(organization_id.to_string());
        for id in ids {
            query = query.bind(id.to_string());
        }

        let rows = query
            .fetch_all(self.pool)
            .await
            .context("Failed to fetch services")?;

        Ok(rows.into_iter().map(row_to_service).collect())
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        req: &CreateServiceRequest,
    ) -> Result<Service> {
        let id = Uuid::new_v4();
        let now = fmt_ts(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO services
                (id, organization_id, name, duration_minutes, price_cents, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'active', ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .bind(&req.name)
        .bind(req.duration_minutes)
        .bind(req.price_cents)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create service")?;

        self.get(organization_id, id)
            .await?
            .context("Failed to retrieve created service")
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        req: &UpdateServiceRequest,
    ) -> Result<Option<Service>> {
        let Some(existing) = self.get(organization_id, id).await? else {
            return Ok(None);
        };

        let name = req.name.clone().unwrap_or(existing.name);
        let duration = req.duration_minutes.unwrap_or(existing.duration_minutes);
        let price = req.price_cents.unwrap_or(existing.price_cents);
        let now = fmt_ts(Utc::now());

        sqlx::query(
            r#"
            UPDATE services
            SET name = ?, duration_minutes = ?, price_cents = ?, updated_at = ?
            WHERE id = ? AND organization_id = ?
            "#,
        )
        .bind(&name)
        .bind(duration)
        .bind(price)
        .bind(&now)
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update service")?;

        self.get(organization_id, id).await
    }

    /// Flip the visibility status (soft delete / restore)
    pub async fn set_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        status: RecordStatus,
    ) -> Result<bool> {
        let now = fmt_ts(Utc::now());
        let result = sqlx::query(
            "UPDATE services SET status = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
        )
        .bind(status.as_str())
        .bind(&now)
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update service status")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_service(row: ServiceRow) -> Service {
    Service {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_else(|_| Uuid::nil()),
        name: row.name,
        duration_minutes: row.duration_minutes,
        price_cents: row.price_cents,
        status: row.status.parse().unwrap_or(RecordStatus::Active),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
