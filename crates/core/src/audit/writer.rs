use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore};

/// Upper bound on events written per blocking task.
const MAX_BATCH: usize = 64;

/// Drains the audit channel into an [`AuditStore`].
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    /// Write events until every [`AuditHandle`] is dropped.
    pub async fn run(mut self) {
        info!("Audit writer started");

        while let Some(first) = self.rx.recv().await {
            let mut batch = vec![first];
            while batch.len() < MAX_BATCH {
                match self.rx.try_recv() {
                    Ok(envelope) => batch.push(envelope),
                    Err(_) => break,
                }
            }

            let store = Arc::clone(&self.store);
            match tokio::task::spawn_blocking(move || write_batch(store.as_ref(), batch)).await {
                Ok(0) => {}
                Ok(failed) => warn!(failed, "Some audit events were not stored"),
                Err(e) => error!(error = %e, "Audit write task failed"),
            }
        }

        info!("Audit writer shutting down");
    }
}

/// Store each event in arrival order; returns how many inserts failed.
fn write_batch(store: &dyn AuditStore, batch: Vec<AuditEventEnvelope>) -> usize {
    let mut failed = 0;
    for envelope in batch {
        let record = AuditRecord::unsaved(envelope.timestamp, envelope.event);
        if let Err(e) = store.insert(&record) {
            error!(
                event_type = %record.event_type,
                ticket_id = record.ticket_id.as_deref().unwrap_or("-"),
                error = %e,
                "Failed to write audit event"
            );
            failed += 1;
        }
    }
    failed
}

/// Create the audit pipeline.
///
/// Returns the handle to clone into components and the writer to spawn.
/// `buffer_size` bounds the channel.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}
