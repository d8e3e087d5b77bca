//! Prometheus metrics for the HTTP surface.
//!
//! HTTP request metrics live here; workflow metrics come from
//! `racdesk_core::metrics` and are registered into the same registry.
//! A few gauges are refreshed from application state on every scrape.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use racdesk_core::TicketRepository;
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "racdesk_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("racdesk_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "racdesk_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Workflow state (collected dynamically)
// =============================================================================

/// Scheduler running state (1 = running, 0 = stopped).
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "racdesk_scheduler_running",
        "Whether the sweep scheduler is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Reports registered but not yet delivered.
pub static REPORTS_UNSENT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "racdesk_reports_unsent",
        "Number of generated reports waiting for delivery",
    )
    .unwrap()
});

/// Resolved tickets that still have no report.
pub static REPORTS_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "racdesk_reports_pending",
        "Number of resolved tickets without a report",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Workflow state
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(REPORTS_UNSENT.clone())).unwrap();
    registry
        .register(Box::new(REPORTS_PENDING.clone()))
        .unwrap();

    // Core metrics (intake, reports, delivery)
    for metric in racdesk_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges that mirror application state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    SCHEDULER_RUNNING.set(if state.scheduler().is_running() { 1 } else { 0 });

    let repository = state.repository();
    if let Ok(reports) = repository.list_unsent_reports() {
        REPORTS_UNSENT.set(reports.len() as i64);
    }
    if let Ok(tickets) = repository.list_resolved_without_report() {
        REPORTS_PENDING.set(tickets.len() as i64);
    }
}

static TICKET_ID_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[A-Z]+\d+(/|$)").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels.
///
/// Numeric segments and ticket identifiers (uppercase letters followed by
/// digits, e.g. `RAC0042`) become `{id}` so label cardinality stays bounded.
pub fn normalize_path(path: &str) -> String {
    let result = TICKET_ID_SEGMENT.replace_all(path, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
