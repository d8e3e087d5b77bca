pub mod audit;
pub mod config;
pub mod delivery;
pub mod identifier;
pub mod intake;
pub mod metrics;
pub mod report;
pub mod scheduler;
pub mod sweep;
pub mod sync;
pub mod testing;
pub mod ticket;

pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditEventEnvelope, AuditFilter, AuditHandle,
    AuditRecord, AuditStore, AuditWriter, SqliteAuditStore,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use delivery::{
    AlternateChannel, DeliveryChannel, DeliveryError, DeliveryOutcome, DeliveryPipeline,
    EmailChannel, HttpEmailTransport, HttpMessagingTransport,
};
pub use identifier::{AllocationError, IdentifierAllocator};
pub use intake::IntakeSessionMachine;
pub use report::{
    FsArtifactStore, ReportError, ReportHandle, ReportPipeline, TextReportRenderer,
};
pub use scheduler::{SchedulerStatus, WorkflowScheduler};
pub use sweep::{SweepFailure, SweepReport};
pub use ticket::{
    RepositoryError, SqliteTicketRepository, Ticket, TicketRepository, TicketStatus,
    TicketUpdate, TicketView,
};
