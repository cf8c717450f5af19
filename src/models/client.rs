//! Client (customer) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::validate_phone;

use super::RecordStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub notes: Option<String>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 160, message = "full_name must not be empty"))]
    pub full_name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 160, message = "full_name must not be empty"))]
    pub full_name: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// Query parameters for the client listing
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClientListQuery {
    /// Substring search over name and phone
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(default)]
    pub include_hidden: bool,
}

/// Paginated client listing
#[derive(Debug, Clone, Serialize)]
pub struct ClientPage {
    pub items: Vec<Client>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}
