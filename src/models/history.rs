//! History (audit log) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One append-only history row. `username` is a snapshot taken at write time
/// so entries stay attributable after the user record changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for the history listing
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HistoryQuery {
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Paginated history listing
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub items: Vec<HistoryEntry>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}
