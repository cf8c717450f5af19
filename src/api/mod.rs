//! API routes and handlers
//!
//! This module defines all API endpoints and their routing. Role requirements
//! are declared here, once per route group, via the guard middleware.

use axum::{extract::Request, middleware::Next, routing::get, Router};

use crate::models::Role;
use crate::{middleware::guard, AppState};

mod auth;
mod bookings;
mod clients;
mod employees;
mod health;
mod history;
mod organizations;
mod services;
mod users;

pub use health::*;

/// Public API routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Authentication endpoints (no auth required)
        .nest("/auth", auth::public_routes())
}

/// Protected API routes (authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // Session endpoints
        .nest("/auth", auth::protected_routes())
        // Tenant-scoped resource endpoints
        .nest("/employees", employees::routes())
        .nest("/services", services::routes())
        .nest("/clients", clients::routes())
        .nest("/bookings", bookings::routes())
        .nest("/history", history::routes())
        // Org-scoped user administration (admin only)
        .nest(
            "/users",
            users::routes().layer(axum::middleware::from_fn(|req: Request, next: Next| {
                guard::require_role(Role::Admin, req, next)
            })),
        )
        // Cross-tenant management (superadmin only)
        .nest(
            "/organizations",
            organizations::routes().layer(axum::middleware::from_fn(
                |req: Request, next: Next| guard::require_role(Role::Superadmin, req, next),
            )),
        )
        .nest(
            "/superadmin/users",
            users::superadmin_routes().layer(axum::middleware::from_fn(
                |req: Request, next: Next| guard::require_role(Role::Superadmin, req, next),
            )),
        )
}

/// Create the full API router (public + protected; useful for tests)
pub fn routes() -> Router<AppState> {
    public_routes().merge(protected_routes())
}
