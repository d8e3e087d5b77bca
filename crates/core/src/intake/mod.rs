//! Conversational ticket intake over chat.
//!
//! A sender types the trigger phrase, answers six prompts (client, requester,
//! project, motive, priority, diagnosis) and confirms. Confirmation registers
//! a Resolved ticket; the scheduler then generates and delivers its report.

mod machine;
mod messages;
mod session;

pub(crate) use machine::normalize;
pub use machine::IntakeSessionMachine;
pub use session::{IntakeDraft, IntakeSession, IntakeStep};
