//! Business logic services

pub mod audit;
pub mod auth;
pub mod scheduling;

pub use audit::{AuditEvent, AuditLogger};
pub use auth::AuthService;
