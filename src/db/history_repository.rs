//! History (audit log) repository
//!
//! Rows are append-only; there is no update or delete path.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{HistoryEntry, HistoryPage, HistoryQuery};

use super::{fmt_ts, parse_db_timestamp};

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: String,
    organization_id: String,
    user_id: Option<String>,
    username: String,
    action: String,
    entity_type: String,
    entity_id: Option<String>,
    details: Option<String>,
    created_at: String,
}

const HISTORY_COLUMNS: &str =
    "id, organization_id, user_id, username, action, entity_type, entity_id, details, created_at";

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 200;

pub struct HistoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> HistoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: &HistoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history
                (id, organization_id, user_id, username, action, entity_type, entity_id, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.organization_id.to_string())
        .bind(entry.user_id.map(|u| u.to_string()))
        .bind(&entry.username)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(entry.details.as_ref().map(|d| d.to_string()))
        .bind(fmt_ts(entry.created_at))
        .execute(self.pool)
        .await
        .context("Failed to insert history entry")?;

        Ok(())
    }

    pub async fn list(&self, organization_id: Uuid, query: &HistoryQuery) -> Result<HistoryPage> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);

        let mut filter = String::from("WHERE organization_id = ?");
        if query.entity_type.is_some() {
            filter.push_str(" AND entity_type = ?");
        }
        if query.action.is_some() {
            filter.push_str(" AND action = ?");
        }

        let count_sql = format!("SELECT COUNT(*) FROM history {filter}");
        let mut count_query =
            sqlx::query_scalar::<_, i64>(&count_sql).bind(organization_id.to_string());
        if let Some(ref entity_type) = query.entity_type {
            count_query = count_query.bind(entity_type);
        }
        if let Some(ref action) = query.action {
            count_query = count_query.bind(action);
        }
        let total = count_query
            .fetch_one(self.pool)
            .await
            .context("Failed to count history entries")?;

        let list_sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM history {filter}
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let mut list_query =
            sqlx::query_as::<_, HistoryRow>(&list_sql).bind(organization_id.to_string());
        if let Some(ref entity_type) = query.entity_type {
            list_query = list_query.bind(entity_type);
        }
        if let Some(ref action) = query.action {
            list_query = list_query.bind(action);
        }
        let rows = list_query
            .bind(per_page as i64)
            .bind(((page - 1) * per_page) as i64)
            .fetch_all(self.pool)
            .await
            .context("Failed to list history entries")?;

        Ok(HistoryPage {
            items: rows.into_iter().map(row_to_entry).collect(),
            total,
            page,
            per_page,
        })
    }
}

fn row_to_entry(row: HistoryRow) -> HistoryEntry {
    HistoryEntry {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_else(|_| Uuid::nil()),
        user_id: row.user_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
        username: row.username,
        action: row.action,
        entity_type: row.entity_type,
        entity_id: row.entity_id,
        details: row.details.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: parse_db_timestamp(&row.created_at),
    }
}
