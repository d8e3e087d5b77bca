use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Ticket lifecycle
    TicketCreated {
        ticket_id: String,
        /// Sender identity (chat) or API caller.
        created_by: String,
        client: String,
        priority: String,
        status: String,
    },
    TicketUpdated {
        ticket_id: String,
        updated_by: String,
        /// Names of the fields carried by the update.
        fields: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to_status: Option<String>,
    },

    // Reports
    ReportGenerated {
        ticket_id: String,
        report_id: i64,
        artifact: String,
        renderer: String,
        /// True when an existing report row was refreshed.
        regenerated: bool,
    },
    ReportGenerationFailed {
        ticket_id: String,
        error: String,
    },

    // Delivery
    ReportDelivered {
        ticket_id: String,
        report_id: i64,
        /// "email" or "alternate_channel"
        method: String,
    },
    DeliveryFailed {
        ticket_id: String,
        report_id: i64,
        /// One line per channel, e.g. "email: skipped (no contact)".
        attempts: Vec<String>,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TicketCreated { .. } => "ticket_created",
            Self::TicketUpdated { .. } => "ticket_updated",
            Self::ReportGenerated { .. } => "report_generated",
            Self::ReportGenerationFailed { .. } => "report_generation_failed",
            Self::ReportDelivered { .. } => "report_delivered",
            Self::DeliveryFailed { .. } => "delivery_failed",
        }
    }

    /// Extract ticket_id if this event is ticket-related
    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            Self::TicketCreated { ticket_id, .. }
            | Self::TicketUpdated { ticket_id, .. }
            | Self::ReportGenerated { ticket_id, .. }
            | Self::ReportGenerationFailed { ticket_id, .. }
            | Self::ReportDelivered { ticket_id, .. }
            | Self::DeliveryFailed { ticket_id, .. } => Some(ticket_id),
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
        }
    }

    /// Extract the actor if this event was triggered by someone
    pub fn actor(&self) -> Option<&str> {
        match self {
            Self::TicketCreated { created_by, .. } => Some(created_by),
            Self::TicketUpdated { updated_by, .. } => Some(updated_by),
            _ => None,
        }
    }
}

/// Stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<String>,
    pub actor: Option<String>,
    pub data: AuditEvent,
}

impl AuditRecord {
    /// Record for an event that has not been stored yet (`id` is 0).
    pub fn unsaved(timestamp: DateTime<Utc>, event: AuditEvent) -> Self {
        Self {
            id: 0,
            timestamp,
            event_type: event.event_type().to_string(),
            ticket_id: event.ticket_id().map(String::from),
            actor: event.actor().map(String::from),
            data: event,
        }
    }
}
