use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use racdesk_core::{
    config::DeliveryConfig,
    create_audit_system,
    delivery::DeliveryChannel,
    load_config,
    report::ArtifactStore,
    validate_config, AlternateChannel, AuditEvent, AuditStore, DeliveryPipeline, EmailChannel,
    FsArtifactStore, HttpEmailTransport, HttpMessagingTransport, IntakeSessionMachine,
    ReportPipeline, SqliteAuditStore, SqliteTicketRepository, TextReportRenderer,
    TicketRepository, WorkflowScheduler,
};
use racdesk_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("RACDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Report output directory: {:?}", config.reports.output_dir);

    // Compute config hash for audit
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Tickets, reports and the audit trail share one database file.
    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("Failed to create audit store")?,
    );
    info!("Audit store initialized");

    let repository: Arc<dyn TicketRepository> = Arc::new(
        SqliteTicketRepository::new(&config.database.path)
            .context("Failed to create ticket repository")?,
    );
    info!("Ticket repository initialized");

    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted audit event");

    let intake = Arc::new(
        IntakeSessionMachine::new(
            Arc::clone(&repository),
            &config.identifier,
            config.intake.clone(),
        )
        .with_audit(audit_handle.clone()),
    );

    let artifacts: Arc<dyn ArtifactStore> =
        Arc::new(FsArtifactStore::new(config.reports.output_dir.clone()));

    let reports = Arc::new(
        ReportPipeline::new(
            Arc::clone(&repository),
            Arc::new(TextReportRenderer::new()),
            Arc::clone(&artifacts),
            config.reports.render_timeout(),
        )
        .with_audit(audit_handle.clone()),
    );

    let channels = build_channels(&config.delivery)?;
    if channels.is_empty() {
        warn!("No delivery channel configured, reports will stay unsent");
    }
    let deliveries = Arc::new(
        DeliveryPipeline::new(
            Arc::clone(&repository),
            artifacts,
            channels,
            config.delivery.attempt_timeout(),
        )
        .with_audit(audit_handle.clone()),
    );
    info!("Delivery channels: {:?}", deliveries.methods());

    let scheduler = Arc::new(WorkflowScheduler::new(
        config.scheduler.clone(),
        Arc::clone(&reports),
        Arc::clone(&deliveries),
    ));
    if config.scheduler.enabled {
        scheduler.start().await;
    } else {
        info!("Scheduler disabled in config, sweeps run on request only");
    }

    let state = Arc::new(AppState::new(
        config.clone(),
        audit_handle.clone(),
        audit_store,
        repository,
        intake,
        reports,
        deliveries,
        Arc::clone(&scheduler),
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if scheduler.is_running() {
        info!("Stopping scheduler...");
        scheduler.stop().await;
    }

    info!("Server shutting down...");
    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // The writer exits once every AuditHandle clone is gone. The scheduler
    // still holds the pipelines (and their handles); the router state was
    // dropped when the server returned.
    drop(scheduler);
    drop(audit_handle);

    let _ = writer_handle.await;
    info!("Audit writer stopped");

    Ok(())
}

/// Channels in the order they are tried: email first, then messaging.
fn build_channels(config: &DeliveryConfig) -> Result<Vec<Arc<dyn DeliveryChannel>>> {
    let mut channels: Vec<Arc<dyn DeliveryChannel>> = Vec::new();

    if let Some(email) = &config.email {
        info!("Initializing email relay at {}", email.url);
        let copy_manager = email.copy_project_manager;
        let transport = HttpEmailTransport::new(email.clone(), config.attempt_timeout())
            .context("Failed to create email transport")?;
        channels.push(Arc::new(
            EmailChannel::new(Arc::new(transport)).with_manager_copy(copy_manager),
        ));
    }

    if let Some(messaging) = &config.messaging {
        info!("Initializing messaging gateway at {}", messaging.url);
        let transport = HttpMessagingTransport::new(messaging.clone(), config.attempt_timeout())
            .context("Failed to create messaging transport")?;
        channels.push(Arc::new(AlternateChannel::new(Arc::new(transport))));
    }

    Ok(channels)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
