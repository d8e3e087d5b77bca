//! Ticket and master data API handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use racdesk_core::{
    ticket::{Client, ClientDetails, Project, ProjectDetails},
    AuditEvent, Ticket, TicketRepository, TicketUpdate, TicketView,
};

use super::error::ApiError;
use crate::state::AppState;

/// Maximum allowed limit for ticket searches
const MAX_LIMIT: usize = 1000;

/// Default limit for ticket searches
const DEFAULT_LIMIT: usize = 100;

/// Actor recorded on audit events raised through the API.
const API_ACTOR: &str = "api";

/// Query parameters for searching tickets
#[derive(Debug, Deserialize)]
pub struct SearchTicketsParams {
    /// Substring of the identifier, client name or any text field. Empty matches everything.
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchTicketsResponse {
    pub tickets: Vec<Ticket>,
    pub limit: usize,
}

pub async fn search_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchTicketsParams>,
) -> Result<Json<SearchTicketsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let term = params.q.unwrap_or_default();

    let tickets = state.repository().search_tickets(term.trim(), limit)?;
    Ok(Json(SearchTicketsResponse { tickets, limit }))
}

/// Ticket joined with client, handler, category and project.
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TicketView>, ApiError> {
    state
        .repository()
        .get_ticket_view(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Ticket not found: {}", id)))
}

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<TicketUpdate>,
) -> Result<Json<Ticket>, ApiError> {
    let repository = state.repository();

    // Status before the update, for the audit trail.
    let from_status = match update.status {
        Some(_) => repository.get_ticket(&id)?.map(|t| t.status),
        None => None,
    };

    let ticket = repository.update_ticket(&id, &update)?;

    let fields: Vec<String> = update
        .field_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    info!(ticket_id = %id, fields = ?fields, "Ticket updated");

    state
        .audit()
        .emit(AuditEvent::TicketUpdated {
            ticket_id: ticket.id.clone(),
            updated_by: API_ACTOR.to_string(),
            fields,
            from_status: from_status.map(|s| s.as_str().to_string()),
            to_status: update.status.map(|s| s.as_str().to_string()),
        })
        .await;

    Ok(Json(ticket))
}

/// Create or update a client's contact details by name.
pub async fn upsert_client(
    State(state): State<Arc<AppState>>,
    Json(details): Json<ClientDetails>,
) -> Result<Json<Client>, ApiError> {
    let client = state.repository().upsert_client(&details)?;
    info!(client = %client.name, "Client details saved");
    Ok(Json(client))
}

/// Create or update a project and its manager's contact by code.
pub async fn upsert_project(
    State(state): State<Arc<AppState>>,
    Json(details): Json<ProjectDetails>,
) -> Result<Json<Project>, ApiError> {
    let project = state.repository().upsert_project(&details)?;
    info!(project = %project.code, "Project details saved");
    Ok(Json(project))
}
