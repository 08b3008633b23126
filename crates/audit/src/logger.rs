use chrono::{DateTime, Utc};
use hypr_guard_core::{timestamp, Action, ActionResult};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use crate::entry::{AuditLogEntry, AuditRecord, AuditStatus};
use crate::error::AuditError;
use crate::query::AuditQuery;
use crate::sink::AuditSink;

/// Append-only audit trail for a single user.
///
/// Entries are handed out as `Arc`s and are never mutated after append.
/// The entries lock covers only the timestamp and the push, so queries never
/// wait on sink I/O. A separate mutex keeps the sink in memory order.
pub struct AuditLogger {
    user_id: String,
    entries: RwLock<Vec<Arc<AuditLogEntry>>>,
    sink: Option<Box<dyn AuditSink>>,
    sink_order: Mutex<()>,
    sink_failures: AtomicU64,
}

impl AuditLogger {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            entries: RwLock::new(Vec::new()),
            sink: None,
            sink_order: Mutex::new(()),
            sink_failures: AtomicU64::new(0),
        }
    }

    pub fn with_sink(user_id: impl Into<String>, sink: Box<dyn AuditSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new(user_id)
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn record(&self, record: AuditRecord) -> Arc<AuditLogEntry> {
        // Held across the sink append so the sink sees entries in memory order.
        let _sink_order = self.sink_order.lock();

        let entry = {
            let mut entries = self.entries.write();

            // Never earlier than the previous entry, even if the wall clock steps back.
            let now = timestamp::now();
            let timestamp = entries
                .last()
                .map_or(now, |last| now.max(last.timestamp));

            let entry = Arc::new(AuditLogEntry {
                user_id: self.user_id.clone(),
                action: record.action,
                action_type: record.action_type,
                status: record.status,
                reason: record.reason,
                parameters: record.parameters,
                result: record.result,
                timestamp,
            });
            entries.push(Arc::clone(&entry));
            entry
        };

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.append(&entry) {
                self.sink_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    user = %self.user_id,
                    action = %entry.action,
                    error = %e,
                    "audit sink append failed"
                );
            }
        }

        debug!(
            user = %self.user_id,
            action = %entry.action,
            action_type = %entry.action_type,
            status = %entry.status,
            "audit entry recorded"
        );
        entry
    }

    /// Records a denial for `action` with the guard's reason.
    pub fn record_blocked(
        &self,
        action: &Action,
        reason: impl fmt::Display,
    ) -> Arc<AuditLogEntry> {
        self.record(
            AuditRecord::new(&action.name, &action.category, AuditStatus::Blocked)
                .reason(reason.to_string())
                .parameters(action.parameters.clone()),
        )
    }

    /// Records an executed action; the status follows `result.success`.
    pub fn record_outcome(&self, action: &Action, result: ActionResult) -> Arc<AuditLogEntry> {
        let status = AuditStatus::from_result(&result);
        let mut record = AuditRecord::new(&action.name, &action.category, status)
            .parameters(action.parameters.clone());
        if let Some(error) = &result.error {
            record = record.reason(error.clone());
        }
        self.record(record.result(result))
    }

    /// Matching entries in insertion order. Never fails; no match is an empty vec.
    pub fn query(&self, query: &AuditQuery) -> Vec<Arc<AuditLogEntry>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<AuditLogEntry>> {
        self.entries.read().clone()
    }

    /// Pretty-printed JSON array of the entries within the inclusive range.
    pub fn export(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<String, AuditError> {
        let entries = self.query(&AuditQuery::range(start, end));
        let view: Vec<&AuditLogEntry> = entries.iter().map(Arc::as_ref).collect();
        Ok(serde_json::to_string_pretty(&view)?)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }
}
