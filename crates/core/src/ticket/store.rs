//! Repository trait for tickets, master data and report records.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::{
    Client, ClientDetails, DeliveryMethod, NewTicket, Project, ProjectDetails, Report, Ticket,
    TicketStatus, TicketUpdate, TicketView,
};
use crate::identifier::{allocate_and_insert, AllocationError, IdentifierAllocator};

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    /// The identifier is already used by another ticket.
    #[error("duplicate ticket identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    #[error("cannot move ticket from {} to {}", from.as_str(), to.as_str())]
    InvalidTransition {
        from: TicketStatus,
        to: TicketStatus,
    },

    #[error("database error: {0}")]
    Database(String),
}

impl From<super::types::InvalidTransition> for RepositoryError {
    fn from(e: super::types::InvalidTransition) -> Self {
        RepositoryError::InvalidTransition {
            from: e.from,
            to: e.to,
        }
    }
}

/// Durable store behind every workflow component.
pub trait TicketRepository: Send + Sync {
    /// Numerically greatest ticket identifier, if any ticket exists.
    fn max_ticket_identifier(&self) -> Result<Option<String>, RepositoryError>;

    /// Insert a ticket under the given identifier, resolving its references.
    ///
    /// Fails with `DuplicateIdentifier` when the identifier is taken.
    fn insert_ticket(&self, id: &str, ticket: &NewTicket) -> Result<Ticket, RepositoryError>;

    /// Allocate an identifier and insert the ticket as one unit.
    ///
    /// The default retries on identifier conflicts. Backends that can hold a
    /// write lock across read and insert should override it.
    fn create_ticket(
        &self,
        allocator: &IdentifierAllocator,
        max_attempts: u32,
        ticket: &NewTicket,
    ) -> Result<Ticket, AllocationError> {
        allocate_and_insert(
            allocator,
            max_attempts,
            || self.max_ticket_identifier(),
            |id| self.insert_ticket(id, ticket),
        )
    }

    fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, RepositoryError>;

    /// Ticket joined with client, handler, category and project.
    fn get_ticket_view(&self, id: &str) -> Result<Option<TicketView>, RepositoryError>;

    /// Apply a field update. Fails with `NotFound`, `InvalidUpdate` or
    /// `InvalidTransition`.
    fn update_ticket(&self, id: &str, update: &TicketUpdate) -> Result<Ticket, RepositoryError>;

    /// Case-insensitive keyword search over the free-text fields, newest first.
    fn search_tickets(&self, term: &str, limit: usize) -> Result<Vec<Ticket>, RepositoryError>;

    fn upsert_client(&self, details: &ClientDetails) -> Result<Client, RepositoryError>;

    fn upsert_project(&self, details: &ProjectDetails) -> Result<Project, RepositoryError>;

    /// Identifiers of Resolved tickets that have no report row.
    fn list_resolved_without_report(&self) -> Result<Vec<String>, RepositoryError>;

    /// Insert or update the report of a ticket. Never creates a second row.
    fn upsert_report(
        &self,
        ticket_id: &str,
        artifact: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Report, RepositoryError>;

    fn get_report(&self, report_id: i64) -> Result<Option<Report>, RepositoryError>;

    fn get_report_for_ticket(&self, ticket_id: &str) -> Result<Option<Report>, RepositoryError>;

    fn list_unsent_reports(&self) -> Result<Vec<Report>, RepositoryError>;

    /// Mark a report as sent only if it is still unsent.
    ///
    /// Returns `false` when the report had already been marked (or does not
    /// exist), in which case nothing changes.
    fn mark_report_sent(
        &self,
        report_id: i64,
        method: DeliveryMethod,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}
