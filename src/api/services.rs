//! Service (treatment) API endpoints

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
    db::{BookingRepository, ServiceRepository},
    middleware::AuthUser,
    models::{CreateServiceRequest, RecordStatus, Service, UpdateServiceRequest},
    utils::{AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route(
            "/{id}",
            get(get_service).put(update_service).delete(delete_service),
        )
        .route("/{id}/restore", patch(restore_service))
}

#[derive(Debug, Deserialize, Default)]
struct ListQuery {
    #[serde(default)]
    include_hidden: bool,
}

async fn list_services(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Service>>> {
    let org = auth_user.require_organization()?;

    let services = ServiceRepository::new(&state.db)
        .list(org, query.include_hidden)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list services");
            AppError::internal("failed to list services")
        })?;

    Ok(Json(services))
}

async fn get_service(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Service>> {
    let org = auth_user.require_organization()?;

    let service = ServiceRepository::new(&state.db)
        .get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get service");
            AppError::internal("failed to get service")
        })?
        .ok_or_else(|| AppError::not_found("service not found"))?;

    Ok(Json(service))
}

async fn create_service(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateServiceRequest>,
) -> AppResult<(StatusCode, Json<Service>)> {
    let org = auth_user.require_organization()?;
    payload.validate()?;

    let service = ServiceRepository::new(&state.db)
        .create(org, &payload)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create service");
            AppError::internal("failed to create service")
        })?;

    state.audit.record(
        &auth_user,
        "service.create",
        "services",
        Some(service.id.to_string()),
        Some(serde_json::json!({
            "name": service.name,
            "duration_minutes": service.duration_minutes,
            "price_cents": service.price_cents,
        })),
    );

    Ok((StatusCode::CREATED, Json(service)))
}

async fn update_service(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateServiceRequest>,
) -> AppResult<Json<Service>> {
    let org = auth_user.require_organization()?;
    payload.validate()?;

    let service = ServiceRepository::new(&state.db)
        .update(org, id, &payload)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to update service");
            AppError::internal("failed to update service")
        })?
        .ok_or_else(|| AppError::not_found("service not found"))?;

    state.audit.record(
        &auth_user,
        "service.update",
        "services",
        Some(service.id.to_string()),
        Some(serde_json::json!({ "name": service.name })),
    );

    Ok(Json(service))
}

/// Soft delete. Refused while upcoming bookings still include the service.
async fn delete_service(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let org = auth_user.require_organization()?;

    let repo = ServiceRepository::new(&state.db);
    repo.get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get service");
            AppError::internal("failed to delete service")
        })?
        .ok_or_else(|| AppError::not_found("service not found"))?;

    let has_future = BookingRepository::new(&state.db)
        .service_has_future_bookings(org, id, Utc::now())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to check service bookings");
            AppError::internal("failed to delete service")
        })?;
    if has_future {
        return Err(AppError::bad_request(
            "service is part of upcoming bookings and cannot be deleted",
        ));
    }

    repo.set_status(org, id, RecordStatus::Hidden)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to hide service");
            AppError::internal("failed to delete service")
        })?;

    state
        .audit
        .record(&auth_user, "service.delete", "services", Some(id.to_string()), None);

    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn restore_service(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Service>> {
    let org = auth_user.require_organization()?;

    let repo = ServiceRepository::new(&state.db);
    let restored = repo
        .set_status(org, id, RecordStatus::Active)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to restore service");
            AppError::internal("failed to restore service")
        })?;
    if !restored {
        return Err(AppError::not_found("service not found"));
    }

    state
        .audit
        .record(&auth_user, "service.restore", "services", Some(id.to_string()), None);

    let service = repo
        .get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get service");
            AppError::internal("failed to restore service")
        })?
        .ok_or_else(|| AppError::not_found("service not found"))?;

    Ok(Json(service))
}
