//! Organization (tenant) API endpoints
//!
//! Superadmin only; the router applies the role guard.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::OrganizationRepository,
    middleware::AuthUser,
    models::{CreateOrganizationRequest, Organization, UpdateOrganizationRequest},
    utils::{AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_organizations).post(create_organization))
        .route(
            "/{id}",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
}

async fn list_organizations(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> AppResult<Json<Vec<Organization>>> {
    let orgs = OrganizationRepository::new(&state.db)
        .list()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list organizations");
            AppError::internal("failed to list organizations")
        })?;

    Ok(Json(orgs))
}

async fn get_organization(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Organization>> {
    let org = OrganizationRepository::new(&state.db)
        .get_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get organization");
            AppError::internal("failed to get organization")
        })?
        .ok_or_else(|| AppError::not_found("organization not found"))?;

    Ok(Json(org))
}

async fn create_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateOrganizationRequest>,
) -> AppResult<(StatusCode, Json<Organization>)> {
    payload.validate()?;

    let org = OrganizationRepository::new(&state.db)
        .create(&payload)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::conflict("organization slug already exists")
            } else {
                tracing::error!(error = %e, "Failed to create organization");
                AppError::internal("failed to create organization")
            }
        })?;

    state.audit.record_for_org(
        &auth_user,
        org.id,
        "organization.create",
        "organizations",
        Some(org.id.to_string()),
        Some(serde_json::json!({ "name": org.name, "slug": org.slug })),
    );

    Ok((StatusCode::CREATED, Json(org)))
}

async fn update_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrganizationRequest>,
) -> AppResult<Json<Organization>> {
    payload.validate()?;

    let org = OrganizationRepository::new(&state.db)
        .update(id, &payload)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::conflict("organization slug already exists")
            } else {
                tracing::error!(error = %e, "Failed to update organization");
                AppError::internal("failed to update organization")
            }
        })?
        .ok_or_else(|| AppError::not_found("organization not found"))?;

    state.audit.record_for_org(
        &auth_user,
        org.id,
        "organization.update",
        "organizations",
        Some(org.id.to_string()),
        Some(serde_json::json!({ "name": org.name, "slug": org.slug, "is_active": org.is_active })),
    );

    Ok(Json(org))
}

/// Hard delete, only for empty organizations. Tenants with users or business
/// data are deactivated via `is_active` instead.
async fn delete_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let repo = OrganizationRepository::new(&state.db);

    repo.get_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get organization");
            AppError::internal("failed to delete organization")
        })?
        .ok_or_else(|| AppError::not_found("organization not found"))?;

    let has_dependents = repo.has_dependents(id).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to check organization dependents");
        AppError::internal("failed to delete organization")
    })?;
    if has_dependents {
        return Err(AppError::bad_request(
            "organization still has users or data; deactivate it instead",
        ));
    }

    repo.delete(id).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to delete organization");
        AppError::internal("failed to delete organization")
    })?;

    state.audit.record_for_org(
        &auth_user,
        id,
        "organization.delete",
        "organizations",
        Some(id.to_string()),
        None,
    );

    Ok(Json(serde_json::json!({ "ok": true })))
}
