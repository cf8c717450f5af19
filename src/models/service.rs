//! Service (treatment) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::RecordStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub duration_minutes: i64,
    pub price_cents: i64,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 120, message = "name must not be empty"))]
    pub name: String,
    #[validate(range(min = 1, message = "duration must be positive"))]
    pub duration_minutes: i64,
    #[validate(range(min = 0, message = "price must not be negative"))]
    #[serde(default)]
    pub price_cents: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 120, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "duration must be positive"))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 0, message = "price must not be negative"))]
    pub price_cents: Option<i64>,
}
