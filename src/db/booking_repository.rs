//! Booking repository
//!
//! The no-double-booking invariant lives here: the overlap scan and the
//! insert/update run inside one transaction, so SQLite's single-writer
//! serialization makes the check-then-write pair atomic. Two concurrent
//! requests for the same slot cannot both pass the scan.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::Booking;

use super::{fmt_ts, parse_db_timestamp};

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: String,
    organization_id: String,
    employee_id: String,
    client_id: String,
    start_time: String,
    end_time: String,
    price_cents: i64,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

const BOOKING_COLUMNS: &str = "id, organization_id, employee_id, client_id, start_time, end_time, \
                               price_cents, notes, created_at, updated_at";

/// Values for a guarded booking write; references are validated by the caller
#[derive(Debug, Clone)]
pub struct BookingWrite {
    pub employee_id: Uuid,
    pub client_id: Uuid,
    pub service_ids: Vec<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price_cents: i64,
    pub notes: Option<String>,
}

/// Outcome of a guarded booking write
#[derive(Debug)]
pub enum BookingWriteOutcome {
    Saved(Booking),
    /// Another booking for the employee intersects the requested interval
    Conflict,
    /// Update target does not exist in this organization
    NotFound,
}

pub struct BookingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BookingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List bookings, optionally restricted to a time range and employee
    pub async fn list(
        &self,
        organization_id: Uuid,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
        employee_id: Option<Uuid>,
    ) -> Result<Vec<Booking>> {
        let mut sql =
            format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE organization_id = ?");
        if range.is_some() {
            // Bookings intersecting the range, not merely starting inside it
            sql.push_str(" AND start_time < ? AND end_time > ?");
        }
        if employee_id.is_some() {
            sql.push_str(" AND employee_id = ?");
        }
        sql.push_str(" ORDER BY start_time");

        let mut query = sqlx::query_as::<_, BookingRow>(&sql).bind(organization_id.to_string());
        if let Some((from, to)) = range {
            query = query.bind(fmt_ts(to)).bind(fmt_ts(from));
        }
        if let Some(employee_id) = employee_id {
            query = query.bind(employee_id.to_string());
        }

        let rows = query
            .fetch_all(self.pool)
            .await
            .context("Failed to list bookings")?;

        self.attach_services(rows).await
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ? AND organization_id = ?"
        ))
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .fetch_optional(self.pool)
        .await
        .context("Failed to get booking")?;

        match row {
            Some(row) => Ok(self.attach_services(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Insert a booking unless it would double-book the employee
    pub async fn create(
        &self,
        organization_id: Uuid,
        write: &BookingWrite,
    ) -> Result<BookingWriteOutcome> {
        let id = Uuid::new_v4();
        let now = fmt_ts(Utc::now());

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        if overlap_exists(&mut tx, write.employee_id, write.start_time, write.end_time, None)
            .await?
        {
            return Ok(BookingWriteOutcome::Conflict);
        }

        sqlx::query(
            r#"
            INSERT INTO bookings
                (id, organization_id, employee_id, client_id, start_time, end_time,
                 price_cents, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .bind(write.employee_id.to_string())
        .bind(write.client_id.to_string())
        .bind(fmt_ts(write.start_time))
        .bind(fmt_ts(write.end_time))
        .bind(write.price_cents)
        .bind(&write.notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to insert booking")?;

        insert_services(&mut tx, id, &write.service_ids).await?;

        tx.commit().await.context("Failed to commit booking")?;

        let booking = self
            .get(organization_id, id)
            .await?
            .context("Failed to retrieve created booking")?;
        Ok(BookingWriteOutcome::Saved(booking))
    }

    /// Replace a booking's fields unless the new interval would double-book
    /// the employee (the booking's own interval is excluded from the scan)
    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        write: &BookingWrite,
    ) -> Result<BookingWriteOutcome> {
        let now = fmt_ts(Utc::now());

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE id = ? AND organization_id = ?",
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to check booking existence")?;
        if exists == 0 {
            return Ok(BookingWriteOutcome::NotFound);
        }

        if overlap_exists(
            &mut tx,
            write.employee_id,
            write.start_time,
            write.end_time,
            Some(id),
        )
        .await?
        {
            return Ok(BookingWriteOutcome::Conflict);
        }

        sqlx::query(
            r#"
            UPDATE bookings
            SET employee_id = ?, client_id = ?, start_time = ?, end_time = ?,
                price_cents = ?, notes = ?, updated_at = ?
            WHERE id = ? AND organization_id = ?
            "#,
        )
        .bind(write.employee_id.to_string())
        .bind(write.client_id.to_string())
        .bind(fmt_ts(write.start_time))
        .bind(fmt_ts(write.end_time))
        .bind(write.price_cents)
        .bind(&write.notes)
        .bind(&now)
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .execute(&mut *tx)
        .await
        .context("Failed to update booking")?;

        sqlx::query("DELETE FROM booking_services WHERE booking_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to clear booking services")?;
        insert_services(&mut tx, id, &write.service_ids).await?;

        tx.commit().await.context("Failed to commit booking update")?;

        let booking = self
            .get(organization_id, id)
            .await?
            .context("Failed to retrieve updated booking")?;
        Ok(BookingWriteOutcome::Saved(booking))
    }

    /// Bookings are the one hard-deleted entity
    pub async fn delete(&self, organization_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = ? AND organization_id = ?")
            .bind(id.to_string())
            .bind(organization_id.to_string())
            .execute(self.pool)
            .await
            .context("Failed to delete booking")?;

        Ok(result.rows_affected() > 0)
    }

    /// Occupied intervals for one employee intersecting [from, to)
    pub async fn intervals_for_employee(
        &self,
        employee_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT start_time, end_time FROM bookings
             WHERE employee_id = ? AND start_time < ? AND end_time > ?
             ORDER BY start_time",
        )
        .bind(employee_id.to_string())
        .bind(fmt_ts(to))
        .bind(fmt_ts(from))
        .fetch_all(self.pool)
        .await
        .context("Failed to fetch employee intervals")?;

        Ok(rows
            .into_iter()
            .map(|(s, e)| (parse_db_timestamp(&s), parse_db_timestamp(&e)))
            .collect())
    }

    /// Whether any booking ending after `now` references the employee.
    /// Gates employee soft deletion.
    pub async fn employee_has_future_bookings(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings
             WHERE organization_id = ? AND employee_id = ? AND end_time > ?",
        )
        .bind(organization_id.to_string())
        .bind(employee_id.to_string())
        .bind(fmt_ts(now))
        .fetch_one(self.pool)
        .await
        .context("Failed to count future bookings")?;

        Ok(count > 0)
    }

    /// Whether any booking ending after `now` references the client
    pub async fn client_has_future_bookings(
        &self,
        organization_id: Uuid,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings
             WHERE organization_id = ? AND client_id = ? AND end_time > ?",
        )
        .bind(organization_id.to_string())
        .bind(client_id.to_string())
        .bind(fmt_ts(now))
        .fetch_one(self.pool)
        .await
        .context("Failed to count future bookings")?;

        Ok(count > 0)
    }

    /// Whether any booking ending after `now` includes the service
    pub async fn service_has_future_bookings(
        &self,
        organization_id: Uuid,
        service_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings b
             INNER JOIN booking_services bs ON bs.booking_id = b.id
             WHERE b.organization_id = ? AND bs.service_id = ? AND b.end_time > ?",
        )
        .bind(organization_id.to_string())
        .bind(service_id.to_string())
        .bind(fmt_ts(now))
        .fetch_one(self.pool)
        .await
        .context("Failed to count future bookings")?;

        Ok(count > 0)
    }

    /// Load the service id lists for a batch of booking rows
    async fn attach_services(&self, rows: Vec<BookingRow>) -> Result<Vec<Booking>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; rows.len()].join(", ");
        let sql = format!(
            "SELECT booking_id, service_id FROM booking_services
             WHERE booking_id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for row in &rows {
            query = query.bind(row.id.clone());
        }

        let pairs = query
            .fetch_all(self.pool)
            .await
            .context("Failed to fetch booking services")?;

        let mut by_booking: HashMap<String, Vec<Uuid>> = HashMap::new();
        for (booking_id, service_id) in pairs {
            if let Ok(service_id) = Uuid::parse_str(&service_id) {
                by_booking.entry(booking_id).or_default().push(service_id);
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let service_ids = by_booking.remove(&row.id).unwrap_or_default();
                row_to_booking(row, service_ids)
            })
            .collect())
    }
}

/// Half-open interval intersection scan: `existing.start < candidate.end AND
/// existing.end > candidate.start`. Strict inequalities keep back-to-back
/// bookings legal.
async fn overlap_exists(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    employee_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    exclude_id: Option<Uuid>,
) -> Result<bool> {
    let mut sql = String::from(
        "SELECT COUNT(*) FROM bookings
         WHERE employee_id = ? AND start_time < ? AND end_time > ?",
    );
    if exclude_id.is_some() {
        sql.push_str(" AND id != ?");
    }

    let mut query = sqlx::query_scalar::<_, i64>(&sql)
        .bind(employee_id.to_string())
        .bind(fmt_ts(end_time))
        .bind(fmt_ts(start_time));
    if let Some(id) = exclude_id {
        query = query.bind(id.to_string());
    }

    let count = query
        .fetch_one(&mut **tx)
        .await
        .context("Failed to scan for overlapping bookings")?;

    Ok(count > 0)
}

async fn insert_services(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    booking_id: Uuid,
    service_ids: &[Uuid],
) -> Result<()> {
    for service_id in service_ids {
        sqlx::query("INSERT OR IGNORE INTO booking_services (booking_id, service_id) VALUES (?, ?)")
            .bind(booking_id.to_string())
            .bind(service_id.to_string())
            .execute(&mut **tx)
            .await
            .context("Failed to insert booking service")?;
    }
    Ok(())
}

fn row_to_booking(row: BookingRow, service_ids: Vec<Uuid>) -> Booking {
    Booking {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_else(|_| Uuid::nil()),
        employee_id: Uuid::parse_str(&row.employee_id).unwrap_or_else(|_| Uuid::nil()),
        client_id: Uuid::parse_str(&row.client_id).unwrap_or_else(|_| Uuid::nil()),
        service_ids,
        start_time: parse_db_timestamp(&row.start_time),
        end_time: parse_db_timestamp(&row.end_time),
        price_cents: row.price_cents,
        notes: row.notes,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
