//! Per-sender conversation state. Pure: no I/O happens here.

use serde::Serialize;

use super::messages;
use crate::ticket::Priority;

/// Where a conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStep {
    AwaitingClient,
    AwaitingRequester,
    AwaitingProject,
    AwaitingMotive,
    AwaitingPriority,
    AwaitingDiagnosis,
    AwaitingConfirmation,
}

impl IntakeStep {
    /// Step that follows this one, `None` once every field is collected.
    pub fn next(self) -> Option<IntakeStep> {
        use IntakeStep::*;
        match self {
            AwaitingClient => Some(AwaitingRequester),
            AwaitingRequester => Some(AwaitingProject),
            AwaitingProject => Some(AwaitingMotive),
            AwaitingMotive => Some(AwaitingPriority),
            AwaitingPriority => Some(AwaitingDiagnosis),
            AwaitingDiagnosis => Some(AwaitingConfirmation),
            AwaitingConfirmation => None,
        }
    }
}

/// Fields collected so far. Answers are stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntakeDraft {
    pub client: String,
    pub requester: String,
    pub project: String,
    pub motive: String,
    pub priority_answer: String,
    pub diagnosis: String,
}

impl IntakeDraft {
    /// Priority that will be persisted. Unrecognised answers fall back to Medium.
    pub fn priority(&self) -> Priority {
        Priority::from_label(&self.priority_answer).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeSession {
    step: IntakeStep,
    draft: IntakeDraft,
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeSession {
    pub fn new() -> Self {
        Self {
            step: IntakeStep::AwaitingClient,
            draft: IntakeDraft::default(),
        }
    }

    pub fn step(&self) -> IntakeStep {
        self.step
    }

    pub fn draft(&self) -> &IntakeDraft {
        &self.draft
    }

    /// Discard the draft and start over from the client name.
    pub fn restart(&mut self) {
        *self = Self::new();
    }

    /// Store the answer for the current field and move on.
    ///
    /// Returns the prompt for the next field, or the confirmation summary
    /// once the last field is filled. Answers in `AwaitingConfirmation` are
    /// not fields and leave the session untouched (returns `None`).
    pub fn answer(&mut self, text: &str, tokens: &messages::Tokens<'_>) -> Option<String> {
        let value = text.to_string();
        match self.step {
            IntakeStep::AwaitingClient => self.draft.client = value,
            IntakeStep::AwaitingRequester => self.draft.requester = value,
            IntakeStep::AwaitingProject => self.draft.project = value,
            IntakeStep::AwaitingMotive => self.draft.motive = value,
            IntakeStep::AwaitingPriority => self.draft.priority_answer = value,
            IntakeStep::AwaitingDiagnosis => self.draft.diagnosis = value,
            IntakeStep::AwaitingConfirmation => return None,
        }

        let next = self.step.next()?;
        self.step = next;
        Some(match next {
            IntakeStep::AwaitingConfirmation => messages::summary(&self.draft, tokens),
            step => messages::prompt(step).to_string(),
        })
    }
}
