//! Employee repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{CreateEmployeeRequest, Employee, RecordStatus, UpdateEmployeeRequest};

use super::{fmt_ts, parse_db_timestamp};

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: String,
    organization_id: String,
    name: String,
    status: String,
    created_at: String,
    updated_at: String,
}

pub struct EmployeeRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> EmployeeRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, organization_id: Uuid, include_hidden: bool) -> Result<Vec<Employee>> {
        let mut sql = String::from(
            "SELECT id, organization_id, name, status, created_at, updated_at
             FROM employees WHERE organization_id = ?",
        );
        if !include_hidden {
            sql.push_str(" AND status = 'active'");
        }
        sql.push_str(" ORDER BY name");

        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(organization_id.to_string())
            .fetch_all(self.pool)
            .await
            .context("Failed to list employees")?;

        Ok(rows.into_iter().map(row_to_employee).collect())
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, organization_id, name, status, created_at, updated_at
             FROM employees WHERE id = ? AND organization_id = ?",
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get employee")?;

        Ok(row.map(row_to_employee))
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        req: &CreateEmployeeRequest,
    ) -> Result<Employee> {
        let id = Uuid::new_v4();
        let now = fmt_ts(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO employees (id, organization_id, name, status, created_at, updated_at)
            VALUES (?, ?, ?, 'active', ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .bind(&req.name)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create employee")?;

        self.get(organization_id, id)
            .await?
            .context("Failed to retrieve created employee")
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        req: &UpdateEmployeeRequest,
    ) -> Result<Option<Employee>> {
        let Some(existing) = self.get(organization_id, id).await? else {
            return Ok(None);
        };

        let name = req.name.clone().unwrap_or(existing.name);
        let now = fmt_ts(Utc::now());

        sqlx::query(
            "UPDATE employees SET name = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
        )
        .bind(&name)
        .bind(&now)
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update employee")?;

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
            "UPDATE employees SET status = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
        )
        .bind(status.as_str())
        .bind(&now)
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update employee status")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_employee(row: EmployeeRow) -> Employee {
    Employee {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_else(|_| Uuid::nil()),
        name: row.name,
        status: row.status.parse().unwrap_or(RecordStatus::Active),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
