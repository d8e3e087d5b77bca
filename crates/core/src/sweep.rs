//! Result of a batch run over many tickets.

use serde::Serialize;

/// One item that failed during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub ticket_id: String,
    pub error: String,
}

/// Outcomes of a sweep. Failures are isolated per item; a cancelled sweep
/// holds what was done before the cancellation and nothing more.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport<T> {
    pub completed: Vec<T>,
    pub failed: Vec<SweepFailure>,
    pub cancelled: bool,
}

impl<T> Default for SweepReport<T> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }
}

impl<T> SweepReport<T> {
    pub fn fail(&mut self, ticket_id: impl Into<String>, error: impl ToString) {
        self.failed.push(SweepFailure {
            ticket_id: ticket_id.into(),
            error: error.to_string(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}
