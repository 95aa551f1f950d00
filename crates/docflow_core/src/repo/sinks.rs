//! Audit and notification sinks.
//!
//! # Responsibility
//! - Accept audit entries for durable append.
//! - Accept notification intents for best-effort delivery.
//!
//! # Invariants
//! - Audit sinks only ever append; entries are never updated or removed.
//! - Notification sinks never log comments or document text.

use crate::model::correspondence::{AuditLogEntry, DocumentId};
use crate::repo::document_repo::{RepoError, RepoResult};
use crate::workflow::events::NotificationIntent;
use log::info;
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// Durable append-only audit trail.
pub trait AuditSink {
    fn append(&self, document_id: DocumentId, entry: &AuditLogEntry) -> RepoResult<()>;
}

/// Delivery channel for notification intents.
pub trait NotificationSink {
    fn deliver(&self, intents: &[NotificationIntent]) -> RepoResult<()>;
}

impl<T: AuditSink + ?Sized> AuditSink for &T {
    fn append(&self, document_id: DocumentId, entry: &AuditLogEntry) -> RepoResult<()> {
        (**self).append(document_id, entry)
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn deliver(&self, intents: &[NotificationIntent]) -> RepoResult<()> {
        (**self).deliver(intents)
    }
}

/// Audit sink writing to the `audit_log` table.
pub struct SqliteAuditSink<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditSink<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Returns `(action, details)` pairs for one document in append order.
    pub fn entries_for(&self, document_id: DocumentId) -> RepoResult<Vec<(String, Option<String>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT action, details
             FROM audit_log
             WHERE document_id = ?1
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([document_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push((row.get("action")?, row.get("details")?));
        }
        Ok(entries)
    }
}

impl AuditSink for SqliteAuditSink<'_> {
    fn append(&self, document_id: DocumentId, entry: &AuditLogEntry) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO audit_log (
                id,
                document_id,
                action,
                details,
                user_id,
                from_stage,
                to_stage,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                entry.id.to_string(),
                document_id,
                entry.action.as_str(),
                entry.details.as_deref(),
                entry.user_id,
                entry.from_stage.map(|stage| stage.as_str()),
                entry.to_stage.as_str(),
                entry.timestamp,
            ],
        )?;
        Ok(())
    }
}

/// Audit sink recording entries in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<(DocumentId, AuditLogEntry)>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(DocumentId, AuditLogEntry)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn append(&self, document_id: DocumentId, entry: &AuditLogEntry) -> RepoResult<()> {
        self.entries
            .lock()
            .map_err(|_| RepoError::LockPoisoned)?
            .push((document_id, entry.clone()));
        Ok(())
    }
}

/// Notification sink that only writes metadata log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn deliver(&self, intents: &[NotificationIntent]) -> RepoResult<()> {
        for intent in intents {
            info!(
                "event=notification_intent module=notify status=queued document_id={} recipient_id={} kind={}",
                intent.document_id,
                intent.recipient_id,
                intent.kind.as_str()
            );
        }
        Ok(())
    }
}

/// Notification sink recording intents in memory.
#[derive(Debug, Default)]
pub struct InMemoryNotificationSink {
    delivered: Mutex<Vec<NotificationIntent>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<NotificationIntent> {
        self.delivered
            .lock()
            .map(|delivered| delivered.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn deliver(&self, intents: &[NotificationIntent]) -> RepoResult<()> {
        self.delivered
            .lock()
            .map_err(|_| RepoError::LockPoisoned)?
            .extend_from_slice(intents);
        Ok(())
    }
}
