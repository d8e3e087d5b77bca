use std::sync::Arc;

use racdesk_core::{
    AuditHandle, AuditStore, Config, DeliveryPipeline, IntakeSessionMachine, ReportPipeline,
    SanitizedConfig, TicketRepository, WorkflowScheduler,
};

/// Shared application state
pub struct AppState {
    config: Config,
    audit: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    repository: Arc<dyn TicketRepository>,
    intake: Arc<IntakeSessionMachine>,
    reports: Arc<ReportPipeline>,
    deliveries: Arc<DeliveryPipeline>,
    scheduler: Arc<WorkflowScheduler>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        repository: Arc<dyn TicketRepository>,
        intake: Arc<IntakeSessionMachine>,
        reports: Arc<ReportPipeline>,
        deliveries: Arc<DeliveryPipeline>,
        scheduler: Arc<WorkflowScheduler>,
    ) -> Self {
        Self {
            config,
            audit,
            audit_store,
            repository,
            intake,
            reports,
            deliveries,
            scheduler,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn repository(&self) -> &dyn TicketRepository {
        self.repository.as_ref()
    }

    pub fn intake(&self) -> &IntakeSessionMachine {
        &self.intake
    }

    pub fn reports(&self) -> &ReportPipeline {
        &self.reports
    }

    pub fn deliveries(&self) -> &DeliveryPipeline {
        &self.deliveries
    }

    pub fn scheduler(&self) -> &WorkflowScheduler {
        &self.scheduler
    }
}
