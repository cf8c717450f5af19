//! History (audit log) API endpoints
//!
//! Read-only; rows are written through the audit channel.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::{
    db::HistoryRepository,
    middleware::AuthUser,
    models::{HistoryPage, HistoryQuery},
    utils::{AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_history))
}

async fn list_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<HistoryPage>> {
    let org = auth_user.require_organization()?;

    let page = HistoryRepository::new(&state.db)
        .list(org, &query)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list history");
            AppError::internal("failed to list history")
        })?;

    Ok(Json(page))
}
