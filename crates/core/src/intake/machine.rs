use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use super::messages::{self, Tokens};
use super::session::{IntakeDraft, IntakeSession, IntakeStep};
use crate::audit::{emit_to, AuditEvent, AuditHandle};
use crate::config::{IdentifierConfig, IntakeConfig};
use crate::identifier::IdentifierAllocator;
use crate::metrics;
use crate::sync::KeyedMutex;
use crate::ticket::{NewTicket, TicketRepository, TicketStatus};

/// Chat front door: turns a sequence of free-text messages from one sender
/// into a resolved ticket.
///
/// Messages from the same sender are handled one at a time, in arrival
/// order. Different senders never wait on each other.
pub struct IntakeSessionMachine {
    repository: Arc<dyn TicketRepository>,
    allocator: IdentifierAllocator,
    max_attempts: u32,
    config: IntakeConfig,
    audit: Option<AuditHandle>,
    sessions: KeyedMutex<String, Option<IntakeSession>>,
    active: AtomicUsize,
}

impl IntakeSessionMachine {
    pub fn new(
        repository: Arc<dyn TicketRepository>,
        identifier: &IdentifierConfig,
        config: IntakeConfig,
    ) -> Self {
        Self {
            repository,
            allocator: IdentifierAllocator::from_config(identifier),
            max_attempts: identifier.max_attempts,
            config,
            audit: None,
            sessions: KeyedMutex::new(),
            active: AtomicUsize::new(0),
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Number of conversations in progress.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Snapshot of a sender's conversation.
    pub async fn session(&self, sender: &str) -> Option<IntakeSession> {
        self.sessions.lock(sender.to_string()).await.clone()
    }

    /// Handle one message and return the reply to send back.
    pub async fn handle(&self, sender: &str, text: &str) -> String {
        let tokens = self.tokens();
        let command = normalize(text);
        let mut slot = self.sessions.lock(sender.to_string()).await;

        if command == normalize(&self.config.trigger_phrase) {
            if slot.is_none() {
                self.opened();
            }
            *slot = Some(IntakeSession::new());
            debug!(sender, "Intake session started");
            record("started");
            return messages::prompt(IntakeStep::AwaitingClient).to_string();
        }

        let Some(session) = slot.as_mut() else {
            return self.idle_reply(text, &tokens);
        };

        if command == normalize(&self.config.cancel_phrase) {
            *slot = None;
            self.closed();
            debug!(sender, "Intake session cancelled");
            record("cancelled");
            return messages::cancelled().to_string();
        }

        if session.step() != IntakeStep::AwaitingConfirmation {
            record("step");
            return session
                .answer(text, &tokens)
                .unwrap_or_else(|| messages::confirm_again(&tokens));
        }

        if command == normalize(&self.config.affirmative) {
            let new_ticket = self.new_ticket(sender, session.draft());
            match self
                .repository
                .create_ticket(&self.allocator, self.max_attempts, &new_ticket)
            {
                Ok(ticket) => {
                    *slot = None;
                    self.closed();
                    record("confirmed");
                    metrics::TICKETS_CREATED.with_label_values(&["intake"]).inc();
                    info!(ticket_id = %ticket.id, sender, "Ticket registered through intake");

                    emit_to(
                        self.audit.as_ref(),
                        AuditEvent::TicketCreated {
                            ticket_id: ticket.id.clone(),
                            created_by: sender.to_string(),
                            client: new_ticket.client_name,
                            priority: ticket.priority.as_str().to_string(),
                            status: ticket.status.as_str().to_string(),
                        },
                    )
                    .await;

                    messages::registered(&ticket.id)
                }
                Err(e) => {
                    // Session stays at confirmation so the sender can retry.
                    record("failed");
                    error!(sender, error = %e, "Failed to register ticket from intake");
                    messages::registration_failed(&tokens)
                }
            }
        } else if command == normalize(&self.config.negative) {
            session.restart();
            record("restarted");
            messages::restarted()
        } else {
            record("step");
            messages::confirm_again(&tokens)
        }
    }

    fn idle_reply(&self, text: &str, tokens: &Tokens<'_>) -> String {
        let term = strip_prefix_ignore_case(text.trim(), &self.config.search_prefix)
            .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            .map(str::trim)
            .filter(|term| !term.is_empty());

        let Some(term) = term else {
            record("help");
            return messages::help(tokens);
        };

        record("search");
        match self
            .repository
            .search_tickets(term, self.config.search_result_limit)
        {
            Ok(tickets) => messages::search_results(term, &tickets),
            Err(e) => {
                error!(error = %e, "History search failed");
                "Não foi possível consultar o histórico agora.".to_string()
            }
        }
    }

    fn new_ticket(&self, sender: &str, draft: &IntakeDraft) -> NewTicket {
        NewTicket {
            client_name: draft.client.clone(),
            requester: draft.requester.clone(),
            handler_name: sender.to_string(),
            category_name: self.config.default_category.clone(),
            project_code: Some(draft.project.clone()),
            priority: draft.priority(),
            status: Some(TicketStatus::Resolved),
            motive: draft.motive.clone(),
            analysis: draft.diagnosis.clone(),
            ..Default::default()
        }
    }

    fn tokens(&self) -> Tokens<'_> {
        Tokens {
            trigger: &self.config.trigger_phrase,
            affirmative: &self.config.affirmative,
            negative: &self.config.negative,
            search: &self.config.search_prefix,
        }
    }

    fn opened(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
        metrics::INTAKE_SESSIONS_ACTIVE.inc();
    }

    fn closed(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        metrics::INTAKE_SESSIONS_ACTIVE.dec();
    }
}

fn record(kind: &str) {
    metrics::INTAKE_MESSAGES.with_label_values(&[kind]).inc();
}

/// Lowercase with whitespace runs collapsed.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let chars = prefix.chars().count();
    let split = text
        .char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (head, rest) = text.split_at(split);
    (head.to_lowercase() == prefix.to_lowercase()).then_some(rest)
}
