//! User administration API endpoints
//!
//! Two surfaces share the handlers' shape: org-scoped administration for
//! admins (`/users`, always bound to the caller's organization) and
//! cross-tenant administration for superadmins (`/superadmin/users`). Role
//! gating happens in the router via the guard middleware.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{OrganizationRepository, UserRepository},
    middleware::AuthUser,
    models::{CreateUserRequest, Role, UpdateUserRequest, User, UserPublic},
    services::AuthService,
    utils::{AppError, AppResult},
    AppState,
};

/// Org-scoped routes (admin)
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", axum::routing::put(update_user).delete(delete_user))
}

/// Cross-tenant routes (superadmin)
pub fn superadmin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_users).post(create_user_cross_tenant))
        .route(
            "/{id}",
            axum::routing::put(update_user_cross_tenant).delete(delete_user_cross_tenant),
        )
}

async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<Vec<UserPublic>>> {
    let org = auth_user.require_organization()?;

    let users = UserRepository::new(&state.db)
        .list_for_org(org)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list users");
            AppError::internal("failed to list users")
        })?;

    Ok(Json(users.into_iter().map(UserPublic::from).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserPublic>)> {
    let org = auth_user.require_organization()?;
    payload.validate()?;

    if payload.role == Role::Superadmin {
        return Err(AppError::bad_request(
            "superadmin accounts cannot be created within an organization",
        ));
    }

    let user = insert_user(&state, Some(org), &payload).await?;

    state.audit.record(
        &auth_user,
        "user.create",
        "users",
        Some(user.id.to_string()),
        Some(serde_json::json!({ "username": user.username, "role": user.role })),
    );

    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserPublic>> {
    let org = auth_user.require_organization()?;
    payload.validate()?;

    if payload.role == Some(Role::Superadmin) {
        return Err(AppError::bad_request(
            "superadmin accounts cannot be created within an organization",
        ));
    }

    let repo = UserRepository::new(&state.db);
    let existing = repo
        .get_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get user");
            AppError::internal("failed to update user")
        })?
        // Cross-tenant targets are indistinguishable from missing ones
        .filter(|u| u.organization_id == Some(org))
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let user = apply_update(&state, existing, &payload).await?;

    state.audit.record(
        &auth_user,
        "user.update",
        "users",
        Some(user.id.to_string()),
        Some(serde_json::json!({ "username": user.username, "role": user.role })),
    );

    Ok(Json(user.into()))
}

async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let org = auth_user.require_organization()?;

    if id == auth_user.id {
        return Err(AppError::bad_request("cannot delete your own account"));
    }

    let repo = UserRepository::new(&state.db);
    repo.get_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get user");
            AppError::internal("failed to delete user")
        })?
        .filter(|u| u.organization_id == Some(org))
        .ok_or_else(|| AppError::not_found("user not found"))?;

    repo.delete(id).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to delete user");
        AppError::internal("failed to delete user")
    })?;

    state
        .audit
        .record(&auth_user, "user.delete", "users", Some(id.to_string()), None);

    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn list_all_users(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> AppResult<Json<Vec<UserPublic>>> {
    let users = UserRepository::new(&state.db)
        .list_all()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list users");
            AppError::internal("failed to list users")
        })?;

    Ok(Json(users.into_iter().map(UserPublic::from).collect()))
}

async fn create_user_cross_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserPublic>)> {
    payload.validate()?;

    // Only superadmins float free of a tenant
    if payload.role != Role::Superadmin && payload.organization_id.is_none() {
        return Err(AppError::bad_request(
            "organization_id is required for non-superadmin users",
        ));
    }

    if let Some(org_id) = payload.organization_id {
        OrganizationRepository::new(&state.db)
            .get_by_id(org_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load organization");
                AppError::internal("failed to create user")
            })?
            .ok_or_else(|| AppError::bad_request("unknown organization"))?;
    }

    let user = insert_user(&state, payload.organization_id, &payload).await?;

    if let Some(org_id) = user.organization_id {
        state.audit.record_for_org(
            &auth_user,
            org_id,
            "user.create",
            "users",
            Some(user.id.to_string()),
            Some(serde_json::json!({ "username": user.username, "role": user.role })),
        );
    }

    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn update_user_cross_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserPublic>> {
    payload.validate()?;

    let repo = UserRepository::new(&state.db);
    let existing = repo
        .get_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get user");
            AppError::internal("failed to update user")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let user = apply_update(&state, existing, &payload).await?;

    if let Some(org_id) = user.organization_id {
        state.audit.record_for_org(
            &auth_user,
            org_id,
            "user.update",
            "users",
            Some(user.id.to_string()),
            Some(serde_json::json!({ "username": user.username, "role": user.role })),
        );
    }

    Ok(Json(user.into()))
}

async fn delete_user_cross_tenant(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    if id == auth_user.id {
        return Err(AppError::bad_request("cannot delete your own account"));
    }

    let repo = UserRepository::new(&state.db);
    let deleted = repo.delete(id).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to delete user");
        AppError::internal("failed to delete user")
    })?;
    if !deleted {
        return Err(AppError::not_found("user not found"));
    }

    state
        .audit
        .record(&auth_user, "user.delete", "users", Some(id.to_string()), None);

    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Uniqueness probe + hash + insert, shared by both creation surfaces
async fn insert_user(
    state: &AppState,
    organization_id: Option<Uuid>,
    payload: &CreateUserRequest,
) -> AppResult<User> {
    let repo = UserRepository::new(&state.db);

    let taken = repo
        .get_by_username(&payload.username)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to check username");
            AppError::internal("failed to create user")
        })?
        .is_some();
    if taken {
        return Err(AppError::conflict("username already exists"));
    }

    let password_hash = AuthService::hash_password(&payload.password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        AppError::internal("failed to create user")
    })?;

    let user = User::new(
        organization_id,
        payload.username.clone(),
        password_hash,
        payload.role,
    );

    repo.insert(&user).await.map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::conflict("username already exists")
        } else {
            tracing::error!(error = %e, "Failed to insert user");
            AppError::internal("failed to create user")
        }
    })?;

    Ok(user)
}

/// Merge an update request into an existing user and persist it
async fn apply_update(
    state: &AppState,
    existing: User,
    payload: &UpdateUserRequest,
) -> AppResult<User> {
    let repo = UserRepository::new(&state.db);

    let username = payload.username.clone().unwrap_or(existing.username.clone());
    if username != existing.username {
        let taken = repo
            .get_by_username(&username)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to check username");
                AppError::internal("failed to update user")
            })?
            .is_some();
        if taken {
            return Err(AppError::conflict("username already exists"));
        }
    }

    let password_hash = match payload.password {
        Some(ref password) => AuthService::hash_password(password).map_err(|e| {
            tracing::error!(error = %e, "Failed to hash password");
            AppError::internal("failed to update user")
        })?,
        None => existing.password_hash.clone(),
    };

    let role = payload.role.unwrap_or(existing.role);

    repo.update(existing.id, &username, &password_hash, role)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                AppError::conflict("username already exists")
            } else {
                tracing::error!(error = %e, "Failed to update user");
                AppError::internal("failed to update user")
            }
        })?
        .ok_or_else(|| AppError::not_found("user not found"))
}
