//! Core ticket data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored enum value that does not match any known variant.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Priority
// ============================================================================

/// Ticket priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Label shown to people (chat replies and reports).
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Baixa",
            Priority::Medium => "Média",
            Priority::High => "Alta",
            Priority::Critical => "Crítica",
        }
    }

    /// Parse a free-text label, Portuguese or English, with or without accents.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "baixa" | "low" => Some(Priority::Low),
            "média" | "media" | "medium" => Some(Priority::Medium),
            "alta" | "high" => Some(Priority::High),
            "crítica" | "critica" | "critical" => Some(Priority::Critical),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(UnknownVariant::new("priority", other)),
        }
    }
}

// ============================================================================
// Status state machine
// ============================================================================

/// Ticket status.
///
/// `Open -> InProgress -> Resolved`. Resolved is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Aberto",
            TicketStatus::InProgress => "Em andamento",
            TicketStatus::Resolved => "Resolvido",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            other => Err(UnknownVariant::new("status", other)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Resolved)
    }

    /// Apply a status change and compute the resulting closure timestamp.
    ///
    /// Entering Resolved sets the closure timestamp unless one is already
    /// recorded. Other targets leave it untouched. Leaving Resolved is rejected.
    pub fn transition(
        self,
        next: TicketStatus,
        closed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, InvalidTransition> {
        if self.is_terminal() && next != self {
            return Err(InvalidTransition {
                from: self,
                to: next,
            });
        }
        match next {
            TicketStatus::Resolved => Ok(closed_at.or(Some(now))),
            _ => Ok(closed_at),
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status change that the state machine does not allow.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot move ticket from {} to {}", from.as_str(), to.as_str())]
pub struct InvalidTransition {
    pub from: TicketStatus,
    pub to: TicketStatus,
}

// ============================================================================
// Ticket
// ============================================================================

/// A persisted support ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Sequential identifier (e.g. RAC0001).
    pub id: String,
    pub client_id: i64,
    pub handler_id: i64,
    pub category_id: i64,
    pub project_id: Option<i64>,
    /// Person at the client who asked for support.
    pub requester: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub motive: String,
    pub environment: String,
    pub analysis: String,
    pub procedures: String,
    pub solution: String,
    pub observations: String,
    pub recommendations: String,
    /// How long the problem lasted, in minutes.
    pub occurrence_minutes: Option<u32>,
    /// Time spent handling the ticket, in minutes.
    pub service_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    /// Set exactly when the ticket is Resolved; never cleared.
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Data for a ticket that has not been assigned an identifier yet.
///
/// References are given by natural key and resolved (or created) by the
/// repository in the same unit of work as the insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTicket {
    pub client_name: String,
    /// Contact recorded on the client when it is created by this ticket.
    pub requester: String,
    pub handler_name: String,
    pub category_name: String,
    /// Project code (e.g. SUP, DEV, INFRA).
    pub project_code: Option<String>,
    pub priority: Priority,
    pub status: Option<TicketStatus>,
    pub motive: String,
    pub environment: String,
    pub analysis: String,
    pub procedures: String,
    pub solution: String,
    pub observations: String,
    pub recommendations: String,
    pub occurrence_minutes: Option<u32>,
    pub service_minutes: Option<u32>,
}

impl NewTicket {
    /// Status the ticket is created with (Open when unspecified).
    pub fn initial_status(&self) -> TicketStatus {
        self.status.unwrap_or(TicketStatus::Open)
    }
}

// ============================================================================
// Master data
// ============================================================================

/// Client organisation. Empty strings mean "not registered".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub id: i64,
    pub name: String,
    /// CNPJ/CPF.
    pub document: String,
    pub contact: String,
    pub phone: String,
    pub email: String,
}

/// Contact details for creating or updating a client by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientDetails {
    pub name: String,
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

/// On-duty technician handling tickets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handler {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub manager: String,
    pub manager_email: String,
    pub manager_phone: String,
}

/// Details for creating or updating a project by code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectDetails {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub manager: String,
    #[serde(default)]
    pub manager_email: String,
    #[serde(default)]
    pub manager_phone: String,
}

/// A ticket joined with everything it references.
///
/// This is the input of report rendering and the source of delivery contacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketView {
    pub ticket: Ticket,
    pub client: Client,
    pub handler: Handler,
    pub category: String,
    pub project: Option<Project>,
}

// ============================================================================
// Field updates
// ============================================================================

/// The fixed set of ticket fields that may be changed after creation.
///
/// Unknown fields are rejected at deserialization. Each field maps to exactly
/// one column in the repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TicketUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedures: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl TicketUpdate {
    /// Names of the fields this update carries.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.environment.is_some() {
            fields.push("environment");
        }
        if self.occurrence_minutes.is_some() {
            fields.push("occurrence_minutes");
        }
        if self.analysis.is_some() {
            fields.push("analysis");
        }
        if self.procedures.is_some() {
            fields.push("procedures");
        }
        if self.solution.is_some() {
            fields.push("solution");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.service_minutes.is_some() {
            fields.push("service_minutes");
        }
        if self.observations.is_some() {
            fields.push("observations");
        }
        if self.recommendations.is_some() {
            fields.push("recommendations");
        }
        if self.priority.is_some() {
            fields.push("priority");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Channel through which a report was delivered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Email,
    AlternateChannel,
    None,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Email => "email",
            DeliveryMethod::AlternateChannel => "alternate_channel",
            DeliveryMethod::None => "none",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "email" => Ok(DeliveryMethod::Email),
            "alternate_channel" => Ok(DeliveryMethod::AlternateChannel),
            "none" => Ok(DeliveryMethod::None),
            other => Err(UnknownVariant::new("delivery method", other)),
        }
    }
}

/// The registered report of a resolved ticket (at most one per ticket).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: i64,
    pub ticket_id: String,
    /// Handle understood by the artifact store (a file path for the default store).
    pub artifact: String,
    pub generated_at: DateTime<Utc>,
    /// Flips to true once, never back.
    pub sent: bool,
    pub delivery_method: DeliveryMethod,
    pub sent_at: Option<DateTime<Utc>>,
}
