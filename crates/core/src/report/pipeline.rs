use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::artifact::{ArtifactError, ArtifactStore};
use super::renderer::{RenderError, Renderer};
use crate::audit::{emit_to, AuditEvent, AuditHandle};
use crate::metrics;
use crate::sweep::SweepReport;
use crate::ticket::{RepositoryError, TicketRepository, TicketStatus};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("Ticket {id} is {status}, reports are only generated for resolved tickets")]
    TicketNotResolved { id: String, status: TicketStatus },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Rendering timed out after {0:?}")]
    RenderTimeout(Duration),

    #[error("Artifact storage failed: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ReportError {
    /// Errors caused by the request rather than by the system.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ReportError::TicketNotFound(_) | ReportError::TicketNotResolved { .. }
        )
    }
}

/// The registered report of a ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportHandle {
    pub report_id: i64,
    pub ticket_id: String,
    pub artifact: String,
    pub generated_at: DateTime<Utc>,
    /// An earlier report of the same ticket was overwritten.
    pub regenerated: bool,
}

/// Renders resolved tickets and registers exactly one report per ticket.
pub struct ReportPipeline {
    repository: Arc<dyn TicketRepository>,
    renderer: Arc<dyn Renderer>,
    artifacts: Arc<dyn ArtifactStore>,
    render_timeout: Duration,
    audit: Option<AuditHandle>,
}

impl ReportPipeline {
    pub fn new(
        repository: Arc<dyn TicketRepository>,
        renderer: Arc<dyn Renderer>,
        artifacts: Arc<dyn ArtifactStore>,
        render_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            renderer,
            artifacts,
            render_timeout,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Render the ticket and register (or overwrite) its report.
    ///
    /// The report row is written only after rendering and storage succeed,
    /// so a failed generation leaves no trace in the repository.
    pub async fn generate(&self, ticket_id: &str) -> Result<ReportHandle, ReportError> {
        match self.try_generate(ticket_id).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                if !e.is_precondition() {
                    let result = match &e {
                        ReportError::RenderTimeout(_) => "timeout",
                        _ => "failed",
                    };
                    metrics::REPORTS_GENERATED.with_label_values(&[result]).inc();
                    emit_to(
                        self.audit.as_ref(),
                        AuditEvent::ReportGenerationFailed {
                            ticket_id: ticket_id.to_string(),
                            error: e.to_string(),
                        },
                    )
                    .await;
                }
                Err(e)
            }
        }
    }

    async fn try_generate(&self, ticket_id: &str) -> Result<ReportHandle, ReportError> {
        let view = self
            .repository
            .get_ticket_view(ticket_id)?
            .ok_or_else(|| ReportError::TicketNotFound(ticket_id.to_string()))?;

        if view.ticket.status != TicketStatus::Resolved {
            return Err(ReportError::TicketNotResolved {
                id: ticket_id.to_string(),
                status: view.ticket.status,
            });
        }

        let regenerated = self.repository.get_report_for_ticket(ticket_id)?.is_some();

        let started = Instant::now();
        let bytes = tokio::time::timeout(self.render_timeout, self.renderer.render(&view))
            .await
            .map_err(|_| ReportError::RenderTimeout(self.render_timeout))??;
        metrics::RENDER_DURATION
            .with_label_values(&[self.renderer.name()])
            .observe(started.elapsed().as_secs_f64());
        debug!(ticket_id, bytes = bytes.len(), "Rendered report");

        let artifact = self
            .artifacts
            .store(ticket_id, self.renderer.file_extension(), &bytes)
            .await?;

        let report = self
            .repository
            .upsert_report(ticket_id, &artifact, Utc::now().trunc_subsecs(6))?;

        metrics::REPORTS_GENERATED.with_label_values(&["success"]).inc();
        info!(
            ticket_id,
            report_id = report.id,
            artifact = %report.artifact,
            regenerated,
            "Report generated"
        );

        emit_to(
            self.audit.as_ref(),
            AuditEvent::ReportGenerated {
                ticket_id: ticket_id.to_string(),
                report_id: report.id,
                artifact: report.artifact.clone(),
                renderer: self.renderer.name().to_string(),
                regenerated,
            },
        )
        .await;

        Ok(ReportHandle {
            report_id: report.id,
            ticket_id: report.ticket_id,
            artifact: report.artifact,
            generated_at: report.generated_at,
            regenerated,
        })
    }

    /// Generate a report for every resolved ticket that has none yet.
    ///
    /// A failure for one ticket is recorded and the sweep moves on. The
    /// token is checked between tickets.
    pub async fn sweep_pending(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SweepReport<ReportHandle>, ReportError> {
        let pending = self.repository.list_resolved_without_report()?;
        let mut report = SweepReport::default();

        if !pending.is_empty() {
            info!(count = pending.len(), "Sweeping tickets without report");
        }

        for ticket_id in pending {
            if cancel.is_cancelled() {
                report.cancelled = true;
                info!(
                    done = report.completed.len() + report.failed.len(),
                    "Report sweep cancelled"
                );
                break;
            }

            match self.generate(&ticket_id).await {
                Ok(handle) => report.completed.push(handle),
                Err(e) => {
                    warn!(ticket_id = %ticket_id, error = %e, "Report generation failed");
                    report.fail(ticket_id, e);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MemoryArtifactStore, MockRenderer};
    use crate::ticket::{SqliteTicketRepository, TicketUpdate};

    struct Harness {
        repo: Arc<SqliteTicketRepository>,
        renderer: Arc<MockRenderer>,
        artifacts: Arc<MemoryArtifactStore>,
        pipeline: ReportPipeline,
    }

    fn harness() -> Harness {
        let repo = Arc::new(SqliteTicketRepository::in_memory().unwrap());
        let renderer = Arc::new(MockRenderer::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let pipeline = ReportPipeline::new(
            repo.clone(),
            renderer.clone(),
            artifacts.clone(),
            Duration::from_millis(200),
        );
        Harness {
            repo,
            renderer,
            artifacts,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_generate_registers_report() {
        let h = harness();
        let ticket = fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket("ACME"));

        let handle = h.pipeline.generate(&ticket.id).await.unwrap();

        assert_eq!(handle.ticket_id, ticket.id);
        assert!(!handle.regenerated);
        assert_eq!(h.renderer.recorded_renders().await, vec![ticket.id.clone()]);
        assert!(h.artifacts.load(&handle.artifact).await.unwrap().is_some());

        let stored = h.repo.get_report_for_ticket(&ticket.id).unwrap().unwrap();
        assert_eq!(stored.id, handle.report_id);
        assert!(!stored.sent);
    }

    #[tokio::test]
    async fn test_generate_twice_keeps_one_report() {
        let h = harness();
        let ticket = fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket("ACME"));

        let first = h.pipeline.generate(&ticket.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = h.pipeline.generate(&ticket.id).await.unwrap();

        assert_eq!(first.report_id, second.report_id);
        assert!(second.regenerated);
        assert!(second.generated_at > first.generated_at);

        let stored = h.repo.get_report_for_ticket(&ticket.id).unwrap().unwrap();
        assert_eq!(stored.generated_at, second.generated_at);
        assert!(h.repo.list_resolved_without_report().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_generate_keeps_one_report() {
        let h = harness();
        let ticket = fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket("ACME"));

        let (a, b) = tokio::join!(h.pipeline.generate(&ticket.id), h.pipeline.generate(&ticket.id));
        assert_eq!(a.unwrap().report_id, b.unwrap().report_id);
    }

    #[tokio::test]
    async fn test_generate_unknown_ticket() {
        let h = harness();
        let result = h.pipeline.generate("RAC9999").await;
        assert!(matches!(result, Err(ReportError::TicketNotFound(_))));
        assert_eq!(h.renderer.render_count().await, 0);
    }

    #[tokio::test]
    async fn test_generate_open_ticket_is_rejected() {
        let h = harness();
        let mut new = fixtures::new_ticket("ACME");
        new.status = Some(TicketStatus::Open);
        let ticket = fixtures::create_ticket(h.repo.as_ref(), &new);

        let result = h.pipeline.generate(&ticket.id).await;

        assert!(matches!(
            result,
            Err(ReportError::TicketNotResolved {
                status: TicketStatus::Open,
                ..
            })
        ));
        assert_eq!(h.renderer.render_count().await, 0);
        assert!(h.repo.get_report_for_ticket(&ticket.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_render_failure_leaves_no_report() {
        let h = harness();
        let ticket = fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket("ACME"));
        h.renderer.fail_for(&ticket.id).await;

        let result = h.pipeline.generate(&ticket.id).await;

        assert!(matches!(result, Err(ReportError::Render(_))));
        assert!(h.repo.get_report_for_ticket(&ticket.id).unwrap().is_none());
        assert_eq!(h.artifacts.len().await, 0);
    }

    #[tokio::test]
    async fn test_render_timeout() {
        let h = harness();
        let ticket = fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket("ACME"));
        h.renderer.set_delay(Duration::from_secs(5)).await;

        let result = h.pipeline.generate(&ticket.id).await;

        assert!(matches!(result, Err(ReportError::RenderTimeout(_))));
        assert!(h.repo.get_report_for_ticket(&ticket.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_no_report() {
        let h = harness();
        let ticket = fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket("ACME"));
        h.artifacts.set_fail_store(true).await;

        let result = h.pipeline.generate(&ticket.id).await;

        assert!(matches!(result, Err(ReportError::Artifact(_))));
        assert!(h.repo.get_report_for_ticket(&ticket.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_isolates_failures() {
        let h = harness();
        let ids: Vec<String> = ["ACME", "Globex", "Initech"]
            .iter()
            .map(|c| fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket(c)).id)
            .collect();
        h.renderer.fail_for(&ids[1]).await;

        let report = h
            .pipeline
            .sweep_pending(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].ticket_id, ids[1]);
        assert!(!report.cancelled);
        assert!(h.repo.get_report_for_ticket(&ids[1]).unwrap().is_none());
        assert_eq!(h.repo.list_resolved_without_report().unwrap(), vec![ids[1].clone()]);
    }

    #[tokio::test]
    async fn test_sweep_skips_unresolved_tickets() {
        let h = harness();
        let mut open = fixtures::new_ticket("ACME");
        open.status = Some(TicketStatus::InProgress);
        let open = fixtures::create_ticket(h.repo.as_ref(), &open);

        let report = h
            .pipeline
            .sweep_pending(&CancellationToken::new())
            .await
            .unwrap();
        assert!(report.completed.is_empty());

        h.repo
            .update_ticket(
                &open.id,
                &TicketUpdate {
                    status: Some(TicketStatus::Resolved),
                    ..Default::default()
                },
            )
            .unwrap();

        let report = h
            .pipeline
            .sweep_pending(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.completed.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_sweep_does_nothing() {
        let h = harness();
        fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket("ACME"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = h.pipeline.sweep_pending(&cancel).await.unwrap();

        assert!(report.cancelled);
        assert!(report.completed.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(h.renderer.render_count().await, 0);
    }
}
