use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::Level;
use uuid::Uuid;

use super::access_gate::DecisionReason;

/// AuditRecord
///
/// One entry per successful invocation of an audited operation. Payloads are the JSON
/// serializations produced by the body extractor, `None` when the operation has no
/// payload on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub identity: Uuid,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub request_payload: Option<String>,
    pub response_payload: Option<String>,
}

/// AuditEvent
///
/// Everything the admin pipeline writes to its logging sink. The gate emits exactly one
/// of the first three per check; the auditor emits `Invocation`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    AccessGranted {
        identity: Uuid,
        timestamp: DateTime<Utc>,
        url: String,
    },
    AccessDenied {
        identity: Option<Uuid>,
        timestamp: DateTime<Utc>,
        url: String,
        reason: DecisionReason,
    },
    /// The directory had no record for the identity, or the lookup itself failed.
    LookupFailed {
        identity: Uuid,
        timestamp: DateTime<Utc>,
        url: String,
    },
    Invocation(AuditRecord),
}

impl AuditEvent {
    pub fn level(&self) -> Level {
        match self {
            AuditEvent::AccessGranted { .. } | AuditEvent::Invocation(_) => Level::INFO,
            AuditEvent::AccessDenied { .. } | AuditEvent::LookupFailed { .. } => Level::WARN,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            AuditEvent::AccessGranted { url, .. }
            | AuditEvent::AccessDenied { url, .. }
            | AuditEvent::LookupFailed { url, .. } => url,
            AuditEvent::Invocation(record) => &record.url,
        }
    }
}

/// AuditSink
///
/// The logging capability injected into the gate and the auditor at construction time.
/// Implementations must write synchronously: once `emit` returns, the line is out.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

pub type AuditSinkState = Arc<dyn AuditSink>;

/// TracingAuditSink
///
/// Production sink. Writes each event as a single structured `tracing` line under the
/// `admin_audit` target with fields in the order identity, timestamp, url, payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        match event {
            AuditEvent::AccessGranted {
                identity,
                timestamp,
                url,
            } => {
                tracing::info!(
                    target: "admin_audit",
                    identity = %identity,
                    timestamp = %timestamp,
                    url = %url,
                    "admin access granted"
                );
            }
            AuditEvent::AccessDenied {
                identity,
                timestamp,
                url,
                reason,
            } => {
                tracing::warn!(
                    target: "admin_audit",
                    identity = ?identity,
                    timestamp = %timestamp,
                    url = %url,
                    "[FORBIDDEN] admin access denied: {}",
                    reason
                );
            }
            AuditEvent::LookupFailed {
                identity,
                timestamp,
                url,
            } => {
                tracing::warn!(
                    target: "admin_audit",
                    identity = %identity,
                    timestamp = %timestamp,
                    url = %url,
                    "admin identity could not be resolved"
                );
            }
            AuditEvent::Invocation(record) => {
                tracing::info!(
                    target: "admin_audit",
                    identity = %record.identity,
                    timestamp = %record.timestamp,
                    url = %record.url,
                    request_body = ?record.request_payload,
                    response_body = ?record.response_payload,
                    "admin api invoked"
                );
            }
        }
    }
}

/// MemoryAuditSink
///
/// In-memory sink that keeps every event, used by the test suite to count and inspect
/// emitted lines.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                AuditEvent::Invocation(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn count_at(&self, level: Level) -> usize {
        self.events().iter().filter(|e| e.level() == level).count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
