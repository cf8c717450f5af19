//! Database layer
//!
//! SQLite storage for all tenant data: organizations, users, employees,
//! services, clients, bookings and the history log. Schema is managed with
//! `sqlx::migrate!` from `./migrations`.

pub mod booking_repository;
pub mod client_repository;
pub mod employee_repository;
pub mod history_repository;
pub mod organization_repository;
pub mod service_repository;
pub mod user_repository;

pub use booking_repository::BookingRepository;
pub use client_repository::ClientRepository;
pub use employee_repository::EmployeeRepository;
pub use history_repository::HistoryRepository;
pub use organization_repository::OrganizationRepository;
pub use service_repository::ServiceRepository;
pub use user_repository::UserRepository;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};

use crate::config::DatabaseConfig;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let connect_options = config
        .url
        .parse::<SqliteConnectOptions>()
        .context("Failed to parse database URL")?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(config.connect_timeout_secs))
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connect_options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Cheap connectivity probe for health checks
pub async fn check_health(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// Format a timestamp for storage.
///
/// Booking interval comparisons happen in SQL on these strings, so the format
/// must make lexicographic order equal chronological order: always UTC,
/// always second precision, always the `Z` suffix.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp, tolerating both RFC 3339 and the bare
/// `YYYY-MM-DD HH:MM:SS` form SQLite functions produce.
pub(crate) fn parse_db_timestamp(ts: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S") {
        return DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc);
    }
    Utc::now()
}
