use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{audit, handlers, intake, middleware::metrics_middleware, tickets, workflow};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Audit
        .route("/audit", get(audit::query_audit))
        // Chat intake
        .route("/intake/messages", post(intake::handle_message))
        // Tickets
        .route("/tickets", get(tickets::search_tickets))
        .route(
            "/tickets/{id}",
            get(tickets::get_ticket).patch(tickets::update_ticket),
        )
        .route("/tickets/{id}/report", post(workflow::generate_report))
        // Master data
        .route("/clients", put(tickets::upsert_client))
        .route("/projects", put(tickets::upsert_project))
        // Reports and delivery
        .route("/reports/sweep", post(workflow::sweep_reports))
        .route("/reports/{id}/deliver", post(workflow::deliver_report))
        .route("/deliveries/sweep", post(workflow::sweep_deliveries))
        .route("/scheduler/status", get(handlers::scheduler_status));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
