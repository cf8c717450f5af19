//! Client (customer) repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{
    Client, ClientListQuery, ClientPage, CreateClientRequest, RecordStatus, UpdateClientRequest,
};

use super::{fmt_ts, parse_db_timestamp};

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: String,
    organization_id: String,
    full_name: String,
    phone: String,
    notes: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

const CLIENT_COLUMNS: &str =
    "id, organization_id, full_name, phone, notes, status, created_at, updated_at";

const DEFAULT_PER_PAGE: u32 = 25;
const MAX_PER_PAGE: u32 = 100;

pub struct ClientRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ClientRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Paginated listing with optional substring search over name and phone
    pub async fn list(&self, organization_id: Uuid, query: &ClientListQuery) -> Result<ClientPage> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);

        let mut filter = String::from("WHERE organization_id = ?");
        if !query.include_hidden {
            filter.push_str(" AND status = 'active'");
        }
        // LIKE pattern is bound, never interpolated
        let pattern = query
            .q
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .map(|q| format!("%{}%", q.trim()));
        if pattern.is_some() {
            filter.push_str(" AND (full_name LIKE ? OR phone LIKE ?)");
        }

        let count_sql = format!("SELECT COUNT(*) FROM clients {filter}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(organization_id.to_string());
        if let Some(ref p) = pattern {
            count_query = count_query.bind(p).bind(p);
        }
        let total = count_query
            .fetch_one(self.pool)
            .await
            .context("Failed to count clients")?;

        let list_sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients {filter} ORDER BY full_name LIMIT ? OFFSET ?"
        );
        let mut list_query = sqlx::query_as::<_, ClientRow>(&list_sql).bind(organization_id.to_string());
        if let Some(ref p) = pattern {
            list_query = list_query.bind(p).bind(p);
        }
        let rows = list_query
            .bind(per_page as i64)
            .bind(((page - 1) * per_page) as i64)
            .fetch_all(self.pool)
            .await
            .context("Failed to list clients")?;

        Ok(ClientPage {
            items: rows.into_iter().map(row_to_client).collect(),
            total,
            page,
            per_page,
        })
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ? AND organization_id = ?"
        ))
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get client")?;

        Ok(row.map(row_to_client))
    }

    /// Duplicate-phone probe within one organization, optionally ignoring a
    /// record (for updates).
    pub async fn phone_in_use(
        &self,
        organization_id: Uuid,
        phone: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool> {
        let mut sql =
            String::from("SELECT COUNT(*) FROM clients WHERE organization_id = ? AND phone = ?");
        if exclude_id.is_some() {
            sql.push_str(" AND id != ?");
        }

        let mut query = sqlx::query_scalar::<_, i64>(&sql)
            .bind(organization_id.to_string())
            .bind(phone);
        if let Some(id) = exclude_id {
            query = query.bind(id.to_string());
        }

        let count = query
            .fetch_one(self.pool)
            .await
            .context("Failed to check phone uniqueness")?;

        Ok(count > 0)
    }

    pub async fn create(&self, organization_id: Uuid, req: &CreateClientRequest) -> Result<Client> {
        let id = Uuid::new_v4();
        let now = fmt_ts(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO clients
                (id, organization_id, full_name, phone, notes, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'active', ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .bind(&req.full_name)
        .bind(&req.phone)
        .bind(&req.notes)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create client")?;

        self.get(organization_id, id)
            .await?
            .context("Failed to retrieve created client")
    }

    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        req: &UpdateClientRequest,
    ) -> Result<Option<Client>> {
        let Some(existing) = self.get(organization_id, id).await? else {
            return Ok(None);
        };

        let full_name = req.full_name.clone().unwrap_or(existing.full_name);
        let phone = req.phone.clone().unwrap_or(existing.phone);
        let notes = req.notes.clone().or(existing.notes);
        let now = fmt_ts(Utc::now());

        sqlx::query(
            r#"
            UPDATE clients
            SET full_name = ?, phone = ?, notes = ?, updated_at = ?
            WHERE id = ? AND organization_id = ?
            "#,
        )
        .bind(&full_name)
        .bind(&phone)
        .bind(&notes)
        .bind(&now)
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update client")?;

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
            "UPDATE clients SET status = ?, updated_at = ? WHERE id = ? AND organization_id = ?",
        )
        .bind(status.as_str())
        .bind(&now)
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update client status")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_client(row: ClientRow) -> Client {
    Client {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_else(|_| Uuid::nil()),
        full_name: row.full_name,
        phone: row.phone,
        notes: row.notes,
        status: row.status.parse().unwrap_or(RecordStatus::Active),
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
