//! Authentication API endpoints
//!
//! Login and logout manage the session cookie; session and me report the
//! authenticated user.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    db::OrganizationRepository,
    middleware::auth::{clear_session_cookie, create_session_token, session_cookie, AuthUser},
    models::{LoginRequest, SessionResponse, UserPublic},
    services::AuthService,
    utils::{AppError, AppResult},
    AppState,
};

/// Public routes (no auth required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Protected routes (auth required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(session))
        .route("/me", get(me))
}

/// POST /api/v1/auth/login
///
/// On success the response sets the session cookie; on failure no cookie is
/// issued and the body carries the localized invalid-credentials message.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<UserPublic>)> {
    let auth_service = AuthService::new(state.db.clone());

    let user = auth_service
        .authenticate(&payload.username, &payload.password)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Authentication failed");
            AppError::internal("authentication failed")
        })?
        .ok_or_else(|| AppError::unauthorized("invalid username or password"))?;

    // A token for a user of a deactivated tenant would be rejected by the
    // middleware anyway; refuse up front with the clearer message.
    if let Some(org_id) = user.organization_id {
        let org = OrganizationRepository::new(&state.db)
            .get_by_id(org_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load organization during login");
                AppError::internal("authentication failed")
            })?;
        match org {
            Some(org) if org.is_active => {}
            _ => return Err(AppError::forbidden("organization is disabled")),
        }
    }

    let token = create_session_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.session_ttl_days,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to create session token");
        AppError::internal("authentication failed")
    })?;

    let cookie = session_cookie(
        token,
        state.config.auth.session_ttl_days,
        state.config.auth.secure_cookies,
    );

    tracing::info!(username = %user.username, "User logged in");

    Ok((jar.add(cookie), Json(user.into())))
}

/// POST /api/v1/auth/logout
///
/// Public: an expired session should still be able to clear its cookie.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    let jar = jar.add(clear_session_cookie(state.config.auth.secure_cookies));
    (jar, Json(serde_json::json!({ "ok": true })))
}

/// GET /api/v1/auth/session
async fn session(auth_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<SessionResponse>> {
    let user = load_public(&state, &auth_user).await?;
    Ok(Json(SessionResponse {
        authenticated: true,
        user: Some(user),
    }))
}

/// GET /api/v1/auth/me
async fn me(auth_user: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserPublic>> {
    Ok(Json(load_public(&state, &auth_user).await?))
}

async fn load_public(state: &AppState, auth_user: &AuthUser) -> AppResult<UserPublic> {
    let user = crate::db::UserRepository::new(&state.db)
        .get_by_id(auth_user.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load user");
            AppError::internal("failed to load user")
        })?
        .ok_or_else(|| AppError::unauthorized("user no longer exists"))?;
    Ok(user.into())
}
