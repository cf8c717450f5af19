//! Booking API endpoints
//!
//! Create and update go through the repository's transactional overlap guard;
//! an intersecting interval for the same employee is a 400 conflict. The
//! availability endpoint answers the calendar's free-slot queries with the
//! same interval test, but only the write path is authoritative.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    db::{
        booking_repository::{BookingWrite, BookingWriteOutcome},
        BookingRepository, ClientRepository, EmployeeRepository, ServiceRepository,
    },
    middleware::AuthUser,
    models::{
        AvailabilityQuery, AvailabilityResponse, Booking, BookingListQuery, CreateBookingRequest,
        UpdateBookingRequest,
    },
    services::scheduling,
    utils::{AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route("/availability", get(availability))
        .route(
            "/{id}",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
}

/// Month filter to a half-open UTC range
fn month_range(year: i32, month: u32) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::bad_request("invalid month/year"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| AppError::bad_request("invalid month/year"))?;

    let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).expect("midnight"));
    let end = Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).expect("midnight"));
    Ok((start, end))
}

async fn list_bookings(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<Vec<Booking>>> {
    let org = auth_user.require_organization()?;

    let range = match (query.month, query.year) {
        (Some(month), Some(year)) => Some(month_range(year, month)?),
        (None, None) => None,
        _ => {
            return Err(AppError::bad_request(
                "month and year must be provided together",
            ))
        }
    };

    let bookings = BookingRepository::new(&state.db)
        .list(org, range, query.employee_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list bookings");
            AppError::internal("failed to list bookings")
        })?;

    Ok(Json(bookings))
}

async fn get_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Booking>> {
    let org = auth_user.require_organization()?;

    let booking = BookingRepository::new(&state.db)
        .get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get booking");
            AppError::internal("failed to get booking")
        })?
        .ok_or_else(|| AppError::not_found("booking not found"))?;

    Ok(Json(booking))
}

/// Validate booking references and assemble the write payload.
///
/// Everything the booking points at must exist in the caller's organization
/// and be visible; the interval must be non-empty.
#[allow(clippy::too_many_arguments)]
async fn resolve_write(
    state: &AppState,
    org: Uuid,
    employee_id: Uuid,
    client_id: Uuid,
    service_ids: &[Uuid],
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    price_cents: Option<i64>,
    notes: Option<String>,
) -> AppResult<BookingWrite> {
    if start_time >= end_time {
        return Err(AppError::bad_request("start_time must be before end_time"));
    }
    if service_ids.is_empty() {
        return Err(AppError::bad_request("service_ids must not be empty"));
    }

    let employee = EmployeeRepository::new(&state.db)
        .get(org, employee_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load employee");
            AppError::internal("failed to save booking")
        })?
        .ok_or_else(|| AppError::bad_request("unknown employee"))?;
    if employee.status.is_hidden() {
        return Err(AppError::bad_request("employee is hidden"));
    }

    let client = ClientRepository::new(&state.db)
        .get(org, client_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load client");
            AppError::internal("failed to save booking")
        })?
        .ok_or_else(|| AppError::bad_request("unknown client"))?;
    if client.status.is_hidden() {
        return Err(AppError::bad_request("client is hidden"));
    }

    let services = ServiceRepository::new(&state.db)
        .get_many(org, service_ids)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load services");
            AppError::internal("failed to save booking")
        })?;
    if services.len() != service_ids.len() {
        return Err(AppError::bad_request("unknown service in service_ids"));
    }
    if services.iter().any(|s| s.status.is_hidden()) {
        return Err(AppError::bad_request("service is hidden"));
    }

    // Price defaults to the services' current prices, snapshotted here
    let price_cents = price_cents.unwrap_or_else(|| services.iter().map(|s| s.price_cents).sum());
    if price_cents < 0 {
        return Err(AppError::bad_request("price_cents must not be negative"));
    }

    Ok(BookingWrite {
        employee_id,
        client_id,
        service_ids: service_ids.to_vec(),
        start_time,
        end_time,
        price_cents,
        notes,
    })
}

async fn create_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let org = auth_user.require_organization()?;

    let write = resolve_write(
        &state,
        org,
        payload.employee_id,
        payload.client_id,
        &payload.service_ids,
        payload.start_time,
        payload.end_time,
        payload.price_cents,
        payload.notes.clone(),
    )
    .await?;

    let outcome = BookingRepository::new(&state.db)
        .create(org, &write)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::conflict("employee is already booked for this time")
            } else {
                tracing::error!(error = %e, "Failed to create booking");
                AppError::internal("failed to create booking")
            }
        })?;

    let booking = match outcome {
        BookingWriteOutcome::Saved(booking) => booking,
        BookingWriteOutcome::Conflict => {
            return Err(AppError::conflict("employee is already booked for this time"))
        }
        BookingWriteOutcome::NotFound => {
            return Err(AppError::internal("failed to create booking"))
        }
    };

    state.audit.record(
        &auth_user,
        "booking.create",
        "bookings",
        Some(booking.id.to_string()),
        Some(serde_json::json!({
            "employee_id": booking.employee_id,
            "client_id": booking.client_id,
            "start_time": booking.start_time,
            "end_time": booking.end_time,
        })),
    );

    Ok((StatusCode::CREATED, Json(booking)))
}

async fn update_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBookingRequest>,
) -> AppResult<Json<Booking>> {
    let org = auth_user.require_organization()?;

    let repo = BookingRepository::new(&state.db);
    let existing = repo
        .get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get booking");
            AppError::internal("failed to update booking")
        })?
        .ok_or_else(|| AppError::not_found("booking not found"))?;

    let service_ids = payload.service_ids.unwrap_or(existing.service_ids);
    let write = resolve_write(
        &state,
        org,
        payload.employee_id.unwrap_or(existing.employee_id),
        payload.client_id.unwrap_or(existing.client_id),
        &service_ids,
        payload.start_time.unwrap_or(existing.start_time),
        payload.end_time.unwrap_or(existing.end_time),
        payload.price_cents.or(Some(existing.price_cents)),
        payload.notes.or(existing.notes),
    )
    .await?;

    let outcome = repo.update(org, id, &write).await.map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::conflict("employee is already booked for this time")
        } else {
            tracing::error!(error = %e, "Failed to update booking");
            AppError::internal("failed to update booking")
        }
    })?;

    let booking = match outcome {
        BookingWriteOutcome::Saved(booking) => booking,
        BookingWriteOutcome::Conflict => {
            return Err(AppError::conflict("employee is already booked for this time"))
        }
        BookingWriteOutcome::NotFound => return Err(AppError::not_found("booking not found")),
    };

    state.audit.record(
        &auth_user,
        "booking.update",
        "bookings",
        Some(booking.id.to_string()),
        Some(serde_json::json!({
            "start_time": booking.start_time,
            "end_time": booking.end_time,
        })),
    );

    Ok(Json(booking))
}

/// Bookings are hard-deleted
async fn delete_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let org = auth_user.require_organization()?;

    let deleted = BookingRepository::new(&state.db)
        .delete(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to delete booking");
            AppError::internal("failed to delete booking")
        })?;
    if !deleted {
        return Err(AppError::not_found("booking not found"));
    }

    state
        .audit
        .record(&auth_user, "booking.delete", "bookings", Some(id.to_string()), None);

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// GET /api/v1/bookings/availability
///
/// Free slot starts for one employee on one day. Advisory: the POST re-checks
/// under the transaction.
async fn availability(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    let org = auth_user.require_organization()?;

    EmployeeRepository::new(&state.db)
        .get(org, query.employee_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load employee");
            AppError::internal("failed to compute availability")
        })?
        .ok_or_else(|| AppError::bad_request("unknown employee"))?;

    let interval = query
        .interval_minutes
        .unwrap_or(state.config.booking.slot_interval_minutes);
    if interval == 0 {
        return Err(AppError::bad_request("interval_minutes must be positive"));
    }
    let duration = query.duration_minutes.unwrap_or(interval);
    if duration == 0 {
        return Err(AppError::bad_request("duration_minutes must be positive"));
    }

    let window = scheduling::day_window(
        query.date,
        state.config.booking.day_start_hour,
        state.config.booking.day_end_hour,
    );

    let busy = BookingRepository::new(&state.db)
        .intervals_for_employee(query.employee_id, window.0, window.1)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load employee bookings");
            AppError::internal("failed to compute availability")
        })?;

    let free_slots = scheduling::free_slots(window, interval, duration, &busy);

    Ok(Json(AvailabilityResponse {
        employee_id: query.employee_id,
        date: query.date,
        interval_minutes: interval,
        duration_minutes: duration,
        free_slots,
    }))
}
