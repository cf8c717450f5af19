//! Client (customer) API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{BookingRepository, ClientRepository},
    middleware::AuthUser,
    models::{
        Client, ClientListQuery, ClientPage, CreateClientRequest, RecordStatus, UpdateClientRequest,
    },
    utils::{AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route(
            "/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/{id}/restore", patch(restore_client))
}

async fn list_clients(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ClientListQuery>,
) -> AppResult<Json<ClientPage>> {
    let org = auth_user.require_organization()?;

    let page = ClientRepository::new(&state.db)
        .list(org, &query)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list clients");
            AppError::internal("failed to list clients")
        })?;

    Ok(Json(page))
}

async fn get_client(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Client>> {
    let org = auth_user.require_organization()?;

    let client = ClientRepository::new(&state.db)
        .get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get client");
            AppError::internal("failed to get client")
        })?
        .ok_or_else(|| AppError::not_found("client not found"))?;

    Ok(Json(client))
}

async fn create_client(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateClientRequest>,
) -> AppResult<(StatusCode, Json<Client>)> {
    let org = auth_user.require_organization()?;
    payload.validate()?;

    let repo = ClientRepository::new(&state.db);
    let in_use = repo
        .phone_in_use(org, &payload.phone, None)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to check phone uniqueness");
            AppError::internal("failed to create client")
        })?;
    if in_use {
        return Err(AppError::conflict("phone number already in use"));
    }

    // The unique index is the authority; the probe above only provides the
    // friendlier error for the common case.
    let client = repo.create(org, &payload).await.map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::conflict("phone number already in use")
        } else {
            tracing::error!(error = %e, "Failed to create client");
            AppError::internal("failed to create client")
        }
    })?;

    state.audit.record(
        &auth_user,
        "client.create",
        "clients",
        Some(client.id.to_string()),
        Some(serde_json::json!({ "full_name": client.full_name, "phone": client.phone })),
    );

    Ok((StatusCode::CREATED, Json(client)))
}

async fn update_client(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> AppResult<Json<Client>> {
    let org = auth_user.require_organization()?;
    payload.validate()?;

    let repo = ClientRepository::new(&state.db);
    if let Some(ref phone) = payload.phone {
        let in_use = repo
            .phone_in_use(org, phone, Some(id))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to check phone uniqueness");
                AppError::internal("failed to update client")
            })?;
        if in_use {
            return Err(AppError::conflict("phone number already in use"));
        }
    }

    let client = repo
        .update(org, id, &payload)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::conflict("phone number already in use")
            } else {
                tracing::error!(error = %e, "Failed to update client");
                AppError::internal("failed to update client")
            }
        })?
        .ok_or_else(|| AppError::not_found("client not found"))?;

    state.audit.record(
        &auth_user,
        "client.update",
        "clients",
        Some(client.id.to_string()),
        Some(serde_json::json!({ "full_name": client.full_name })),
    );

    Ok(Json(client))
}

/// Soft delete. Refused while the client still has upcoming bookings.
async fn delete_client(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let org = auth_user.require_organization()?;

    let repo = ClientRepository::new(&state.db);
    repo.get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get client");
            AppError::internal("failed to delete client")
        })?
        .ok_or_else(|| AppError::not_found("client not found"))?;

    let has_future = BookingRepository::new(&state.db)
        .client_has_future_bookings(org, id, Utc::now())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to check client bookings");
            AppError::internal("failed to delete client")
        })?;
    if has_future {
        return Err(AppError::bad_request(
            "client has upcoming bookings and cannot be deleted",
        ));
    }

    repo.set_status(org, id, RecordStatus::Hidden)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to hide client");
            AppError::internal("failed to delete client")
        })?;

    state
        .audit
        .record(&auth_user, "client.delete", "clients", Some(id.to_string()), None);

    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn restore_client(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Client>> {
    let org = auth_user.require_organization()?;

    let repo = ClientRepository::new(&state.db);
    let restored = repo
        .set_status(org, id, RecordStatus::Active)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to restore client");
            AppError::internal("failed to restore client")
        })?;
    if !restored {
        return Err(AppError::not_found("client not found"));
    }

    state
        .audit
        .record(&auth_user, "client.restore", "clients", Some(id.to_string()), None);

    let client = repo
        .get(org, id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get client");
            AppError::internal("failed to restore client")
        })?
        .ok_or_else(|| AppError::not_found("client not found"))?;

    Ok(Json(client))
}
