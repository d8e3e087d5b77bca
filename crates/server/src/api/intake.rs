//! Chat intake endpoint.
//!
//! Messaging integrations forward each inbound chat message here and send
//! the returned reply back to the sender.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IntakeMessageBody {
    /// Sender identity, usually the chat phone number.
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct IntakeReplyResponse {
    pub reply: String,
}

pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IntakeMessageBody>,
) -> Result<Json<IntakeReplyResponse>, ApiError> {
    let sender = body.sender.trim();
    if sender.is_empty() {
        return Err(ApiError::unprocessable("sender cannot be empty"));
    }

    let reply = state.intake().handle(sender, &body.text).await;
    Ok(Json(IntakeReplyResponse { reply }))
}
