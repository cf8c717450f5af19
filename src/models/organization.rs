//! Organization (tenant) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::validate_slug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 120, message = "name must not be empty"))]
    pub name: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    /// IANA timezone name, defaults to UTC
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 120, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
}
