//! Employee API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{BookingRepository, EmployeeRepository},
    middleware::AuthUser,
    models::{CreateEmployeeRequest, Employee, RecordStatus, UpdateEmployeeRequest},
    utils::{AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route(
            "/{id}",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
        .route("/{id}/restore", patch(restore_employee))
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    #[serde(default)]
    include_hidden: bool,
}

async fn list_employees(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Employee>>> {
    let org = auth_user.require_organization()?;

    let employees = EmployeeRepository::new(&state.db)
        .list(org, query.include_hidden)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list employees");
            AppError::internal("failed to list employees")
        })?;

    Ok(Json(employees))
}

async fn get_employee(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Employee>> {
    let org = auth_user.require_organization()?;

    let employee = EmployeeRepository::new(&state.db)
        .get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get employee");
            AppError::internal("failed to get employee")
        })?
        .ok_or_else(|| AppError::not_found("employee not found"))?;

    Ok(Json(employee))
}

async fn create_employee(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateEmployeeRequest>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    let org = auth_user.require_organization()?;
    payload.validate()?;

    let employee = EmployeeRepository::new(&state.db)
        .create(org, &payload)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create employee");
            AppError::internal("failed to create employee")
        })?;

    state.audit.record(
        &auth_user,
        "employee.create",
        "employees",
        Some(employee.id.to_string()),
        Some(serde_json::json!({ "name": employee.name })),
    );

    Ok((StatusCode::CREATED, Json(employee)))
}

async fn update_employee(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> AppResult<Json<Employee>> {
    let org = auth_user.require_organization()?;
    payload.validate()?;

    let employee = EmployeeRepository::new(&state.db)
        .update(org, id, &payload)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to update employee");
            AppError::internal("failed to update employee")
        })?
        .ok_or_else(|| AppError::not_found("employee not found"))?;

    state.audit.record(
        &auth_user,
        "employee.update",
        "employees",
        Some(employee.id.to_string()),
        Some(serde_json::json!({ "name": employee.name })),
    );

    Ok(Json(employee))
}

/// Soft delete. Refused while the employee still has upcoming bookings.
async fn delete_employee(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let org = auth_user.require_organization()?;

    let repo = EmployeeRepository::new(&state.db);
    repo.get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get employee");
            AppError::internal("failed to delete employee")
        })?
        .ok_or_else(|| AppError::not_found("employee not found"))?;

    let has_future = BookingRepository::new(&state.db)
        .employee_has_future_bookings(org, id, Utc::now())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to check employee bookings");
            AppError::internal("failed to delete employee")
        })?;
    if has_future {
        return Err(AppError::bad_request(
            "employee has upcoming bookings and cannot be deleted",
        ));
    }

    repo.set_status(org, id, RecordStatus::Hidden)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to hide employee");
            AppError::internal("failed to delete employee")
        })?;

    state
        .audit
        .record(&auth_user, "employee.delete", "employees", Some(id.to_string()), None);

    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn restore_employee(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Employee>> {
    let org = auth_user.require_organization()?;

    let repo = EmployeeRepository::new(&state.db);
    let restored = repo
        .set_status(org, id, RecordStatus::Active)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to restore employee");
            AppError::internal("failed to restore employee")
        })?;
    if !restored {
        return Err(AppError::not_found("employee not found"));
    }

    state
        .audit
        .record(&auth_user, "employee.restore", "employees", Some(id.to_string()), None);

    let employee = repo
        .get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get employee");
            AppError::internal("failed to restore employee")
        })?
        .ok_or_else(|| AppError::not_found("employee not found"))?;

    Ok(Json(employee))
}
