use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::AuditEvent;

/// Envelope wrapping an audit event with metadata
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

impl AuditEventEnvelope {
    fn now(event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Handle for emitting audit events
///
/// Cheaply cloneable. Events go through a bounded channel to the
/// [`AuditWriter`](super::AuditWriter). Emission never fails the caller:
/// a full or closed channel is logged and the event dropped.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
}

impl AuditHandle {
    pub fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event, waiting for channel capacity.
    pub async fn emit(&self, event: AuditEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.tx.send(AuditEventEnvelope::now(event)).await {
            tracing::error!(event_type, "Failed to emit audit event: {}", e);
        }
    }

    /// Emit without waiting. Returns false when the event was dropped.
    pub fn try_emit(&self, event: AuditEvent) -> bool {
        let event_type = event.event_type();
        match self.tx.try_send(AuditEventEnvelope::now(event)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(event_type, "Failed to emit audit event: {}", e);
                false
            }
        }
    }
}

/// Emit through an optional handle; components run without auditing in tests.
pub(crate) async fn emit_to(handle: Option<&AuditHandle>, event: AuditEvent) {
    if let Some(handle) = handle {
        handle.emit(event).await;
    }
}
