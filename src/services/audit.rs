//! Best-effort audit logging
//!
//! Mutating handlers record history through a non-blocking channel: events go
//! onto an unbounded queue and a background worker writes them to the history
//! table. A failed write is logged and counted, never surfaced to the request
//! that triggered it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::db::{DbPool, HistoryRepository};
use crate::middleware::AuthUser;
use crate::models::HistoryEntry;

/// One mutating action to be recorded
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Handle for enqueueing audit events
#[derive(Clone)]
pub struct AuditLogger {
    tx: mpsc::UnboundedSender<AuditEvent>,
    dropped: Arc<AtomicU64>,
}

impl AuditLogger {
    /// Spawn the writer task and return the enqueue handle
    pub fn spawn(pool: DbPool) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();
        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_writer = dropped.clone();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let entry = HistoryEntry {
                    id: Uuid::new_v4(),
                    organization_id: event.organization_id,
                    user_id: event.user_id,
                    username: event.username,
                    action: event.action,
                    entity_type: event.entity_type,
                    entity_id: event.entity_id,
                    details: event.details,
                    created_at: Utc::now(),
                };

                if let Err(e) = HistoryRepository::new(&pool).insert(&entry).await {
                    dropped_writer.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        action = %entry.action,
                        entity_type = %entry.entity_type,
                        error = %e,
                        "Failed to write history entry"
                    );
                }
            }
        });

        Self { tx, dropped }
    }

    /// Record an action performed by an authenticated user. Never fails;
    /// a closed channel is counted like a failed write.
    pub fn record(
        &self,
        auth_user: &AuthUser,
        action: &str,
        entity_type: &str,
        entity_id: Option<String>,
        details: Option<serde_json::Value>,
    ) {
        // Superadmins acting outside a tenant attribute the entry to the
        // organization being acted on via `details` only; the row itself
        // needs an owning org, so fall back to the user's own (nil for none).
        let organization_id = auth_user.organization_id.unwrap_or(Uuid::nil());
        self.enqueue(AuditEvent {
            organization_id,
            user_id: Some(auth_user.id),
            username: auth_user.username.clone(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details,
        });
    }

    /// Record an action against an explicit organization (superadmin paths)
    pub fn record_for_org(
        &self,
        auth_user: &AuthUser,
        organization_id: Uuid,
        action: &str,
        entity_type: &str,
        entity_id: Option<String>,
        details: Option<serde_json::Value>,
    ) {
        self.enqueue(AuditEvent {
            organization_id,
            user_id: Some(auth_user.id),
            username: auth_user.username.clone(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details,
        });
    }

    fn enqueue(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Audit channel closed; history entry dropped");
        }
    }

    /// Number of events that could not be persisted
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
