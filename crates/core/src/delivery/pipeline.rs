use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::channel::{ContactInfo, DeliveryChannel, DeliveryParcel};
use super::transport::Attachment;
use crate::audit::{emit_to, AuditEvent, AuditHandle};
use crate::metrics;
use crate::report::{ArtifactError, ArtifactStore};
use crate::sweep::SweepReport;
use crate::sync::KeyedMutex;
use crate::ticket::{DeliveryMethod, Report, RepositoryError, TicketRepository};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Report not found: {0}")]
    ReportNotFound(i64),

    #[error("Artifact of report {report_id} is missing: {artifact}")]
    ArtifactMissing { report_id: i64, artifact: String },

    #[error("Artifact storage failed: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What happened with one channel during a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum AttemptResult {
    /// The contact lacks the details this channel needs. Not a failure.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelAttempt {
    pub method: DeliveryMethod,
    #[serde(flatten)]
    pub result: AttemptResult,
}

impl std::fmt::Display for ChannelAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            AttemptResult::Skipped => write!(f, "{}: skipped", self.method.as_str()),
            AttemptResult::Failed(reason) => write!(f, "{}: {}", self.method.as_str(), reason),
        }
    }
}

/// Result of a delivery request. None of these are errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Sent through `method`; earlier channels in `attempts` were skipped or failed.
    Delivered {
        report_id: i64,
        ticket_id: String,
        method: DeliveryMethod,
        sent_at: DateTime<Utc>,
        attempts: Vec<ChannelAttempt>,
    },
    /// The report had already been sent. Nothing was sent again.
    AlreadySent { report_id: i64 },
    /// Every channel was skipped or failed. The report stays unsent.
    Undeliverable {
        report_id: i64,
        ticket_id: String,
        attempts: Vec<ChannelAttempt>,
    },
}

impl DeliveryOutcome {
    pub fn report_id(&self) -> i64 {
        match self {
            DeliveryOutcome::Delivered { report_id, .. }
            | DeliveryOutcome::AlreadySent { report_id }
            | DeliveryOutcome::Undeliverable { report_id, .. } => *report_id,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Sends registered reports through an ordered list of channels and records
/// the first success.
///
/// A report is never sent successfully twice: attempts for the same report
/// are serialized in-process, and the sent flag is flipped with a
/// conditional update that only succeeds while the report is unsent.
pub struct DeliveryPipeline {
    repository: Arc<dyn TicketRepository>,
    artifacts: Arc<dyn ArtifactStore>,
    channels: Vec<Arc<dyn DeliveryChannel>>,
    attempt_timeout: Duration,
    in_flight: KeyedMutex<i64, ()>,
    audit: Option<AuditHandle>,
}

impl DeliveryPipeline {
    pub fn new(
        repository: Arc<dyn TicketRepository>,
        artifacts: Arc<dyn ArtifactStore>,
        channels: Vec<Arc<dyn DeliveryChannel>>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            artifacts,
            channels,
            attempt_timeout,
            in_flight: KeyedMutex::new(),
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Configured channels, in the order they are tried.
    pub fn methods(&self) -> Vec<DeliveryMethod> {
        self.channels.iter().map(|c| c.method()).collect()
    }

    pub async fn deliver(&self, report_id: i64) -> Result<DeliveryOutcome, DeliveryError> {
        let _guard = self.in_flight.lock(report_id).await;

        let report = self
            .repository
            .get_report(report_id)?
            .ok_or(DeliveryError::ReportNotFound(report_id))?;

        if report.sent {
            debug!(report_id, "Report already sent");
            metrics::DELIVERIES
                .with_label_values(&["already_sent", report.delivery_method.as_str()])
                .inc();
            return Ok(DeliveryOutcome::AlreadySent { report_id });
        }

        let bytes = self.artifacts.load(&report.artifact).await?.ok_or_else(|| {
            DeliveryError::ArtifactMissing {
                report_id,
                artifact: report.artifact.clone(),
            }
        })?;

        let view = self
            .repository
            .get_ticket_view(&report.ticket_id)?
            .ok_or_else(|| RepositoryError::NotFound(report.ticket_id.clone()))?;

        let parcel = DeliveryParcel {
            report_id,
            ticket_id: report.ticket_id.clone(),
            attachment: Attachment {
                file_name: attachment_name(&report),
                bytes,
            },
            contact: ContactInfo::from_view(&view),
        };

        let mut attempts = Vec::new();
        for channel in &self.channels {
            let method = channel.method();

            if !channel.is_applicable(&parcel.contact) {
                debug!(report_id, method = method.as_str(), "Channel not applicable, skipping");
                record_attempt(method, "skipped");
                attempts.push(ChannelAttempt {
                    method,
                    result: AttemptResult::Skipped,
                });
                continue;
            }

            let attempt = tokio::time::timeout(self.attempt_timeout, channel.attempt(&parcel));
            let failure = match attempt.await {
                Ok(Ok(())) => {
                    record_attempt(method, "success");
                    return self.record_sent(&parcel, channel.as_ref(), attempts).await;
                }
                Ok(Err(e)) => {
                    record_attempt(method, "failed");
                    e.to_string()
                }
                Err(_) => {
                    record_attempt(method, "timeout");
                    format!("timed out after {:?}", self.attempt_timeout)
                }
            };

            warn!(
                report_id,
                ticket_id = %parcel.ticket_id,
                method = method.as_str(),
                error = %failure,
                "Delivery attempt failed"
            );
            attempts.push(ChannelAttempt {
                method,
                result: AttemptResult::Failed(failure),
            });
        }

        warn!(report_id, ticket_id = %parcel.ticket_id, "Report undeliverable");
        metrics::DELIVERIES
            .with_label_values(&["undeliverable", DeliveryMethod::None.as_str()])
            .inc();
        emit_to(
            self.audit.as_ref(),
            AuditEvent::DeliveryFailed {
                ticket_id: parcel.ticket_id.clone(),
                report_id,
                attempts: attempts.iter().map(ToString::to_string).collect(),
            },
        )
        .await;

        Ok(DeliveryOutcome::Undeliverable {
            report_id,
            ticket_id: parcel.ticket_id,
            attempts,
        })
    }

    async fn record_sent(
        &self,
        parcel: &DeliveryParcel,
        channel: &dyn DeliveryChannel,
        attempts: Vec<ChannelAttempt>,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let method = channel.method();
        let sent_at = Utc::now().trunc_subsecs(6);

        if !self
            .repository
            .mark_report_sent(parcel.report_id, method, sent_at)?
        {
            // Someone else recorded a delivery first.
            warn!(
                report_id = parcel.report_id,
                method = method.as_str(),
                "Report was marked sent concurrently"
            );
            metrics::DELIVERIES
                .with_label_values(&["already_sent", method.as_str()])
                .inc();
            return Ok(DeliveryOutcome::AlreadySent {
                report_id: parcel.report_id,
            });
        }

        info!(
            report_id = parcel.report_id,
            ticket_id = %parcel.ticket_id,
            method = method.as_str(),
            "Report delivered"
        );
        metrics::DELIVERIES
            .with_label_values(&["delivered", method.as_str()])
            .inc();
        emit_to(
            self.audit.as_ref(),
            AuditEvent::ReportDelivered {
                ticket_id: parcel.ticket_id.clone(),
                report_id: parcel.report_id,
                method: method.as_str().to_string(),
            },
        )
        .await;

        if tokio::time::timeout(self.attempt_timeout, channel.follow_up(parcel))
            .await
            .is_err()
        {
            warn!(report_id = parcel.report_id, "Delivery follow-up timed out");
        }

        Ok(DeliveryOutcome::Delivered {
            report_id: parcel.report_id,
            ticket_id: parcel.ticket_id.clone(),
            method,
            sent_at,
            attempts,
        })
    }

    /// Try to deliver every unsent report.
    ///
    /// Errors are recorded per report and do not stop the sweep. The token is
    /// checked between reports.
    pub async fn sweep_unsent(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SweepReport<DeliveryOutcome>, DeliveryError> {
        let unsent = self.repository.list_unsent_reports()?;
        let mut sweep = SweepReport::default();

        if !unsent.is_empty() {
            info!(count = unsent.len(), "Sweeping unsent reports");
        }

        for report in unsent {
            if cancel.is_cancelled() {
                sweep.cancelled = true;
                info!(
                    done = sweep.completed.len() + sweep.failed.len(),
                    "Delivery sweep cancelled"
                );
                break;
            }

            match self.deliver(report.id).await {
                Ok(outcome) => sweep.completed.push(outcome),
                Err(e) => {
                    warn!(
                        report_id = report.id,
                        ticket_id = %report.ticket_id,
                        error = %e,
                        "Delivery failed"
                    );
                    sweep.fail(report.ticket_id, e);
                }
            }
        }

        Ok(sweep)
    }
}

fn record_attempt(method: DeliveryMethod, result: &str) {
    metrics::CHANNEL_ATTEMPTS
        .with_label_values(&[method.as_str(), result])
        .inc();
}

fn attachment_name(report: &Report) -> String {
    Path::new(&report.artifact)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.ticket_id.clone())
}
