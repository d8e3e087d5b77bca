//! Background sweeps for report generation and delivery.
//!
//! When enabled, the scheduler runs [`ReportPipeline::sweep_pending`] and
//! [`DeliveryPipeline::sweep_unsent`] on their own intervals. Stopping the
//! scheduler cancels in-flight sweeps between tickets and waits for both
//! loops to exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::delivery::DeliveryPipeline;
use crate::report::ReportPipeline;
use crate::sweep::SweepReport;

/// Counts from the most recent run of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub finished_at: DateTime<Utc>,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: bool,
    /// Set when the sweep could not list its work at all.
    pub error: Option<String>,
}

impl SweepSummary {
    fn from_result<T, E: std::fmt::Display>(result: &Result<SweepReport<T>, E>) -> Self {
        let finished_at = Utc::now();
        match result {
            Ok(report) => Self {
                finished_at,
                completed: report.completed.len(),
                failed: report.failed.len(),
                cancelled: report.cancelled,
                error: None,
            },
            Err(e) => Self {
                finished_at,
                completed: 0,
                failed: 0,
                cancelled: false,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub report_sweep_interval_ms: u64,
    pub delivery_sweep_interval_ms: u64,
    pub last_report_sweep: Option<SweepSummary>,
    pub last_delivery_sweep: Option<SweepSummary>,
}

#[derive(Debug, Default)]
struct LastRuns {
    reports: Option<SweepSummary>,
    deliveries: Option<SweepSummary>,
}

pub struct WorkflowScheduler {
    config: SchedulerConfig,
    reports: Arc<ReportPipeline>,
    deliveries: Arc<DeliveryPipeline>,

    // Runtime state
    running: Arc<AtomicBool>,
    cancel: Mutex<CancellationToken>,
    tasks: AsyncMutex<Vec<JoinHandle<()>>>,
    last_runs: Arc<RwLock<LastRuns>>,
}

impl WorkflowScheduler {
    pub fn new(
        config: SchedulerConfig,
        reports: Arc<ReportPipeline>,
        deliveries: Arc<DeliveryPipeline>,
    ) -> Self {
        Self {
            config,
            reports,
            deliveries,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(CancellationToken::new()),
            tasks: AsyncMutex::new(Vec::new()),
            last_runs: Arc::new(RwLock::new(LastRuns::default())),
        }
    }

    /// Spawn both sweep loops.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        info!("Starting workflow scheduler");

        let token = CancellationToken::new();
        match self.cancel.lock() {
            Ok(mut cancel) => *cancel = token.clone(),
            Err(poisoned) => *poisoned.into_inner() = token.clone(),
        }

        let mut tasks = self.tasks.lock().await;
        tasks.push(self.spawn_report_loop(token.clone()));
        tasks.push(self.spawn_delivery_loop(token));

        info!("Workflow scheduler started");
    }

    /// Cancel both loops and wait for them to finish their current ticket.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }

        info!("Stopping workflow scheduler");

        match self.cancel.lock() {
            Ok(cancel) => cancel.cancel(),
            Err(poisoned) => poisoned.into_inner().cancel(),
        }

        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Scheduler loop ended abnormally: {}", e);
            }
        }

        info!("Workflow scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let last_runs = self.last_runs.read().await;
        SchedulerStatus {
            running: self.is_running(),
            report_sweep_interval_ms: self.config.report_sweep_interval_ms,
            delivery_sweep_interval_ms: self.config.delivery_sweep_interval_ms,
            last_report_sweep: last_runs.reports.clone(),
            last_delivery_sweep: last_runs.deliveries.clone(),
        }
    }

    fn spawn_report_loop(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let pipeline = Arc::clone(&self.reports);
        let last_runs = Arc::clone(&self.last_runs);
        let interval = Duration::from_millis(self.config.report_sweep_interval_ms);

        tokio::spawn(async move {
            info!("Report sweep loop started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Report sweep loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let result = pipeline.sweep_pending(&cancel).await;
                        if let Err(e) = &result {
                            warn!("Report sweep error: {}", e);
                        }
                        last_runs.write().await.reports = Some(SweepSummary::from_result(&result));
                    }
                }
            }
            info!("Report sweep loop stopped");
        })
    }

    fn spawn_delivery_loop(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let pipeline = Arc::clone(&self.deliveries);
        let last_runs = Arc::clone(&self.last_runs);
        let interval = Duration::from_millis(self.config.delivery_sweep_interval_ms);

        tokio::spawn(async move {
            info!("Delivery sweep loop started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Delivery sweep loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let result = pipeline.sweep_unsent(&cancel).await;
                        if let Err(e) = &result {
                            warn!("Delivery sweep error: {}", e);
                        }
                        let summary = SweepSummary::from_result(&result);
                        last_runs.write().await.deliveries = Some(summary);
                    }
                }
            }
            info!("Delivery sweep loop stopped");
        })
    }
}
