//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Ticket creation and identifier conflicts
//! - Intake conversations
//! - Report generation and delivery channels

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Tickets
// =============================================================================

/// Tickets created, by origin.
pub static TICKETS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("racdesk_tickets_created_total", "Total tickets created"),
        &["origin"], // "intake"
    )
    .unwrap()
});

/// Identifier conflicts that forced a retry.
pub static ALLOCATION_CONFLICTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "racdesk_identifier_conflicts_total",
        "Ticket identifier allocations that hit an existing identifier",
    )
    .unwrap()
});

// =============================================================================
// Intake
// =============================================================================

/// Messages handled by the intake machine, by outcome.
pub static INTAKE_MESSAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("racdesk_intake_messages_total", "Chat messages handled"),
        &["kind"], // "help", "search", "step", "confirmed", "restarted", "cancelled", "failed"
    )
    .unwrap()
});

/// Open intake sessions.
pub static INTAKE_SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "racdesk_intake_sessions_active",
        "Intake conversations in progress",
    )
    .unwrap()
});

// =============================================================================
// Reports
// =============================================================================

/// Report generations, by result.
pub static REPORTS_GENERATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("racdesk_reports_generated_total", "Report generation attempts"),
        &["result"], // "success", "failed", "timeout"
    )
    .unwrap()
});

/// Render duration in seconds.
pub static RENDER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "racdesk_report_render_duration_seconds",
            "Duration of report rendering",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["renderer"],
    )
    .unwrap()
});

// =============================================================================
// Delivery
// =============================================================================

/// Delivery outcomes, by outcome and method.
pub static DELIVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("racdesk_deliveries_total", "Report delivery outcomes"),
        &["outcome", "method"], // outcome: "delivered", "already_sent", "undeliverable"
    )
    .unwrap()
});

/// Channel attempts, by channel and result.
pub static CHANNEL_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "racdesk_delivery_channel_attempts_total",
            "Delivery channel attempts",
        ),
        &["method", "result"], // result: "success", "failed", "timeout", "skipped"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Tickets
        Box::new(TICKETS_CREATED.clone()),
        Box::new(ALLOCATION_CONFLICTS.clone()),
        // Intake
        Box::new(INTAKE_MESSAGES.clone()),
        Box::new(INTAKE_SESSIONS_ACTIVE.clone()),
        // Reports
        Box::new(REPORTS_GENERATED.clone()),
        Box::new(RENDER_DURATION.clone()),
        // Delivery
        Box::new(DELIVERIES.clone()),
        Box::new(CHANNEL_ATTEMPTS.clone()),
    ]
}
