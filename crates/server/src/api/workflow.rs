//! Report generation and delivery endpoints.
//!
//! These trigger the same operations the scheduler runs in the background,
//! for one ticket/report or as a full sweep.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use racdesk_core::{DeliveryOutcome, ReportHandle, SweepReport};

use super::error::ApiError;
use crate::state::AppState;

pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> Result<Json<ReportHandle>, ApiError> {
    let handle = state.reports().generate(&ticket_id).await?;
    Ok(Json(handle))
}

pub async fn sweep_reports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepReport<ReportHandle>>, ApiError> {
    let report = state
        .reports()
        .sweep_pending(&CancellationToken::new())
        .await?;
    Ok(Json(report))
}

/// Deliver one report. An undeliverable report is a normal outcome, not an error.
pub async fn deliver_report(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<i64>,
) -> Result<Json<DeliveryOutcome>, ApiError> {
    let outcome = state.deliveries().deliver(report_id).await?;
    Ok(Json(outcome))
}

pub async fn sweep_deliveries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepReport<DeliveryOutcome>>, ApiError> {
    let report = state
        .deliveries()
        .sweep_unsent(&CancellationToken::new())
        .await?;
    Ok(Json(report))
}
