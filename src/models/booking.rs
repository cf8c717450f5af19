//! Booking model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub client_id: Uuid,
    pub service_ids: Vec<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub employee_id: Uuid,
    pub client_id: Uuid,
    pub service_ids: Vec<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Defaults to the sum of the selected services' prices
    pub price_cents: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookingRequest {
    pub employee_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub service_ids: Option<Vec<Uuid>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub price_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Query parameters for the booking listing
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BookingListQuery {
    /// Calendar month filter, 1-12; requires `year`
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub employee_id: Option<Uuid>,
}

/// Query parameters for slot availability
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub employee_id: Uuid,
    /// Calendar date, `YYYY-MM-DD` (interpreted in UTC)
    pub date: chrono::NaiveDate,
    /// Slot grid spacing; defaults to the configured interval
    pub interval_minutes: Option<u32>,
    /// Length of the candidate appointment; defaults to one interval
    pub duration_minutes: Option<u32>,
}

/// Free slot starts for one employee on one day
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub employee_id: Uuid,
    pub date: chrono::NaiveDate,
    pub interval_minutes: u32,
    pub duration_minutes: u32,
    pub free_slots: Vec<DateTime<Utc>>,
}
