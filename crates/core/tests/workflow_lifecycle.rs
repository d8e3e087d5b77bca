//! Workflow integration tests.
//!
//! These tests drive the whole ticket workflow against a file-backed
//! repository:
//! - Chat intake creating a resolved ticket
//! - Report generation to disk with the text renderer
//! - Delivery through email with fallback to the messaging channel
//! - Concurrent ticket creation and sweep failure isolation

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use racdesk_core::{
    config::{IdentifierConfig, IntakeConfig},
    delivery::{AlternateChannel, DeliveryChannel, DeliveryOutcome, DeliveryPipeline, EmailChannel},
    intake::IntakeStep,
    report::{ArtifactStore, FsArtifactStore, ReportPipeline, TextReportRenderer},
    testing::{fixtures, MockAlternateTransport, MockEmailTransport, MockRenderer},
    ticket::{ClientDetails, DeliveryMethod, ProjectDetails, TicketStatus},
    IntakeSessionMachine, SqliteTicketRepository, TicketRepository,
};

const ANSWERS: [&str; 6] = [
    "ACME Ltda",
    "Maria Souza",
    "SUP",
    "Servidor de arquivos fora do ar",
    "Alta",
    "Disco cheio, logs antigos removidos",
];

struct TestHarness {
    repo: Arc<SqliteTicketRepository>,
    intake: Arc<IntakeSessionMachine>,
    reports: ReportPipeline,
    deliveries: DeliveryPipeline,
    email: Arc<MockEmailTransport>,
    alternate: Arc<MockAlternateTransport>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = Arc::new(
            SqliteTicketRepository::new(&temp_dir.path().join("racdesk.db"))
                .expect("Failed to create repository"),
        );
        let artifacts: Arc<dyn ArtifactStore> =
            Arc::new(FsArtifactStore::new(temp_dir.path().join("relatorios")));

        let intake = Arc::new(IntakeSessionMachine::new(
            repo.clone(),
            &IdentifierConfig::default(),
            IntakeConfig::default(),
        ));
        let reports = ReportPipeline::new(
            repo.clone(),
            Arc::new(TextReportRenderer::new()),
            artifacts.clone(),
            Duration::from_secs(5),
        );

        let email = Arc::new(MockEmailTransport::new());
        let alternate = Arc::new(MockAlternateTransport::new());
        let channels: Vec<Arc<dyn DeliveryChannel>> = vec![
            Arc::new(EmailChannel::new(email.clone()).with_manager_copy(true)),
            Arc::new(AlternateChannel::new(alternate.clone())),
        ];
        let deliveries =
            DeliveryPipeline::new(repo.clone(), artifacts, channels, Duration::from_secs(5));

        Self {
            repo,
            intake,
            reports,
            deliveries,
            email,
            alternate,
            _temp_dir: temp_dir,
        }
    }

    /// Run a full conversation and return the final reply.
    async fn converse(&self, sender: &str, answers: &[&str]) -> String {
        self.intake.handle(sender, "novo chamado").await;
        for answer in answers {
            self.intake.handle(sender, answer).await;
        }
        self.intake.handle(sender, "sim").await
    }
}

fn ticket_id_in(reply: &str) -> String {
    reply
        .split("ID: ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .expect("reply should contain the ticket id")
        .to_string()
}

#[tokio::test]
async fn test_chat_to_delivered_report() {
    let h = TestHarness::new();
    h.repo
        .upsert_client(&ClientDetails {
            name: "ACME Ltda".to_string(),
            email: "ti@acme.example".to_string(),
            phone: "(11) 97712-3444".to_string(),
            ..Default::default()
        })
        .unwrap();
    h.repo
        .upsert_project(&ProjectDetails {
            code: "SUP".to_string(),
            name: "Suporte".to_string(),
            manager_email: "gerente@example.com".to_string(),
            ..Default::default()
        })
        .unwrap();

    let reply = h.converse("5511988887777", &ANSWERS).await;
    assert!(reply.starts_with("Chamado registrado com sucesso! ID: RAC0001"));
    assert_eq!(h.intake.active_sessions(), 0);

    let ticket_id = ticket_id_in(&reply);
    let view = h.repo.get_ticket_view(&ticket_id).unwrap().unwrap();
    assert_eq!(view.client.name, ANSWERS[0]);
    assert_eq!(view.ticket.requester, ANSWERS[1]);
    assert_eq!(view.project.as_ref().map(|p| p.code.as_str()), Some(ANSWERS[2]));
    assert_eq!(view.ticket.motive, ANSWERS[3]);
    assert_eq!(view.ticket.priority.label(), ANSWERS[4]);
    assert_eq!(view.ticket.analysis, ANSWERS[5]);
    assert_eq!(view.ticket.status, TicketStatus::Resolved);
    assert_eq!(view.ticket.closed_at, Some(view.ticket.created_at));

    let sweep = h.reports.sweep_pending(&CancellationToken::new()).await.unwrap();
    assert_eq!(sweep.completed.len(), 1);
    let handle = &sweep.completed[0];
    let document = std::fs::read_to_string(&handle.artifact).unwrap();
    assert!(document.contains("Chamado: RAC0001"));
    assert!(document.contains("Motivo: Servidor de arquivos fora do ar"));

    let outcome = h.deliveries.deliver(handle.report_id).await.unwrap();
    assert!(matches!(
        outcome,
        DeliveryOutcome::Delivered {
            method: DeliveryMethod::Email,
            ..
        }
    ));

    let messages = h.email.recorded_messages().await;
    assert_eq!(messages.len(), 2, "client message and manager copy");
    assert_eq!(messages[0].to, "ti@acme.example");
    assert_eq!(messages[0].attachment.file_name, "RAC0001.txt");
    assert_eq!(messages[1].to, "gerente@example.com");
    assert!(messages[1].subject.starts_with("[Cópia]"));

    // Nothing left to do.
    let sweep = h.deliveries.sweep_unsent(&CancellationToken::new()).await.unwrap();
    assert!(sweep.completed.is_empty());
    assert_eq!(h.alternate.send_count().await, 0);
}

#[tokio::test]
async fn test_rejected_summary_restarts_conversation() {
    let h = TestHarness::new();

    h.intake.handle("a", "Novo Chamado").await;
    for answer in ANSWERS {
        h.intake.handle("a", answer).await;
    }
    let reply = h.intake.handle("a", "não").await;

    assert_eq!(reply, "Vamos recomeçar. Por favor, informe o nome do cliente:");
    let session = h.intake.session("a").await.unwrap();
    assert_eq!(session.step(), IntakeStep::AwaitingClient);
    assert!(session.draft().client.is_empty());
    assert_eq!(h.repo.max_ticket_identifier().unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_conversations_get_distinct_identifiers() {
    let h = TestHarness::new();
    let senders = 12;

    let mut tasks = Vec::new();
    for i in 0..senders {
        let intake = Arc::clone(&h.intake);
        tasks.push(tokio::spawn(async move {
            let sender = format!("55119000000{:02}", i);
            intake.handle(&sender, "novo chamado").await;
            for answer in ANSWERS {
                intake.handle(&sender, answer).await;
            }
            intake.handle(&sender, "sim").await
        }));
    }

    let ids: HashSet<String> = join_all(tasks)
        .await
        .into_iter()
        .map(|reply| ticket_id_in(&reply.unwrap()))
        .collect();

    let expected: HashSet<String> = (1..=senders).map(|n| format!("RAC{:04}", n)).collect();
    assert_eq!(ids, expected);
    assert_eq!(h.intake.active_sessions(), 0);
}

#[tokio::test]
async fn test_report_regeneration_keeps_single_row() {
    let h = TestHarness::new();
    let ticket = fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket("ACME"));

    let first = h.reports.generate(&ticket.id).await.unwrap();
    let second = h.reports.generate(&ticket.id).await.unwrap();

    assert_eq!(first.report_id, second.report_id);
    assert_eq!(first.artifact, second.artifact);
    assert!(second.regenerated);
    assert_eq!(h.repo.list_unsent_reports().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sweep_with_one_render_failure() {
    let temp_dir = TempDir::new().unwrap();
    let repo = Arc::new(SqliteTicketRepository::new(&temp_dir.path().join("t.db")).unwrap());
    let renderer = Arc::new(MockRenderer::new());
    let reports = ReportPipeline::new(
        repo.clone(),
        renderer.clone(),
        Arc::new(FsArtifactStore::new(temp_dir.path())),
        Duration::from_secs(5),
    );

    let ids: Vec<String> = ["ACME", "Globex", "Initech"]
        .iter()
        .map(|client| fixtures::create_ticket(repo.as_ref(), &fixtures::new_ticket(client)).id)
        .collect();
    renderer.fail_for(&ids[2]).await;

    let sweep = reports.sweep_pending(&CancellationToken::new()).await.unwrap();

    assert_eq!(sweep.completed.len(), 2);
    assert_eq!(sweep.failed.len(), 1);
    assert_eq!(sweep.failed[0].ticket_id, ids[2]);
    assert!(repo.get_report_for_ticket(&ids[2]).unwrap().is_none());

    // The failed ticket is picked up again once the renderer recovers.
    let renderer_ok = ReportPipeline::new(
        repo.clone(),
        Arc::new(TextReportRenderer::new()),
        Arc::new(FsArtifactStore::new(temp_dir.path())),
        Duration::from_secs(5),
    );
    let retry = renderer_ok.sweep_pending(&CancellationToken::new()).await.unwrap();
    assert_eq!(retry.completed.len(), 1);
    assert_eq!(retry.completed[0].ticket_id, ids[2]);
}

#[tokio::test]
async fn test_delivery_falls_back_to_messaging() {
    let h = TestHarness::new();
    h.repo
        .upsert_client(&ClientDetails {
            name: "ACME".to_string(),
            email: "ti@acme.example".to_string(),
            phone: "+55 11 97712-3444".to_string(),
            ..Default::default()
        })
        .unwrap();
    let ticket = fixtures::create_ticket(h.repo.as_ref(), &fixtures::new_ticket("ACME"));
    let report = h.reports.generate(&ticket.id).await.unwrap();
    h.email.set_fail(true).await;

    let outcome = h.deliveries.deliver(report.report_id).await.unwrap();
    assert!(matches!(
        outcome,
        DeliveryOutcome::Delivered {
            method: DeliveryMethod::AlternateChannel,
            ..
        }
    ));

    let sends = h.alternate.recorded_sends().await;
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].phone, "5511977123444");

    // A second request does not reach any channel.
    h.email.set_fail(false).await;
    let again = h.deliveries.deliver(report.report_id).await.unwrap();
    assert_eq!(
        again,
        DeliveryOutcome::AlreadySent {
            report_id: report.report_id
        }
    );
    assert_eq!(h.email.send_count().await, 0);
    assert_eq!(h.alternate.send_count().await, 1);
}
