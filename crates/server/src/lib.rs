//! HTTP surface of the racdesk ticket workflow.

pub mod api;
pub mod metrics;
pub mod state;
