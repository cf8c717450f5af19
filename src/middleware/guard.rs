//! Role guard middleware
//!
//! Routes declare the minimum role they require once, at router assembly:
//!
//! ```ignore
//! Router::new()
//!     .nest("/organizations", organizations::routes())
//!     .layer(axum::middleware::from_fn(|req, next| {
//!         guard::require_role(Role::Superadmin, req, next)
//!     }))
//! ```
//!
//! Handlers never repeat inline role checks.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::models::Role;
use crate::utils::AppError;

use super::auth::AuthUser;

/// Reject the request unless the authenticated user's role satisfies `min`.
/// Must run after `auth_middleware`.
pub async fn require_role(min: Role, request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| AppError::unauthorized("authentication required"))?;

    if !user.role.satisfies(min) {
        return Err(AppError::forbidden(format!("{} role required", min)));
    }

    Ok(next.run(request).await)
}
