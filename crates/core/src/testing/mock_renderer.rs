//! Mock renderer for testing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::report::{RenderError, Renderer};
use crate::ticket::TicketView;

/// Mock implementation of the Renderer trait.
///
/// Renders `RAC <ticket id>` and records every ticket it was asked to render.
/// Failures can be configured per ticket or for the next call only.
#[derive(Debug, Default)]
pub struct MockRenderer {
    /// Ticket ids passed to `render`, in call order.
    renders: Arc<RwLock<Vec<String>>>,
    /// Tickets that always fail to render.
    failing: Arc<RwLock<HashSet<String>>>,
    /// If set, the next render will fail with this error.
    next_error: Arc<RwLock<Option<RenderError>>>,
    /// Simulated render duration.
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the ticket ids rendered so far.
    pub async fn recorded_renders(&self) -> Vec<String> {
        self.renders.read().await.clone()
    }

    pub async fn render_count(&self) -> usize {
        self.renders.read().await.len()
    }

    /// Make every render of `ticket_id` fail.
    pub async fn fail_for(&self, ticket_id: &str) {
        self.failing.write().await.insert(ticket_id.to_string());
    }

    /// Configure the next render to fail with the given error.
    pub async fn set_next_error(&self, error: RenderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated render duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    fn file_extension(&self) -> &str {
        "txt"
    }

    async fn render(&self, view: &TicketView) -> Result<Vec<u8>, RenderError> {
        let ticket_id = view.ticket.id.clone();
        self.renders.write().await.push(ticket_id.clone());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        if self.failing.read().await.contains(&ticket_id) {
            return Err(RenderError::Failed(format!("mock failure for {}", ticket_id)));
        }

        Ok(format!("RAC {}", ticket_id).into_bytes())
    }
}
