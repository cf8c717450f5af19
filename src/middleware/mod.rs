//! Middleware components
//!
//! - Session authentication (JWT cookie, sliding expiry)
//! - Role guard (declared minimum role per route group)
//! - Rate limiting (per-IP)

pub mod auth;
pub mod guard;
pub mod rate_limit;

pub use auth::{auth_middleware, AuthUser, Claims};
pub use guard::require_role;
pub use rate_limit::{
    api_rate_limit_config, auth_rate_limit_config, rate_limit_middleware,
    spawn_rate_limit_cleanup, RateLimitState,
};
