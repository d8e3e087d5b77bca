//! Common test utilities for in-process API testing.
//!
//! Builds the full application state against a temporary database with
//! mock delivery transports, and drives the router with `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use racdesk_core::{
    config::DatabaseConfig,
    create_audit_system,
    delivery::DeliveryChannel,
    report::ArtifactStore,
    testing::{MockAlternateTransport, MockEmailTransport},
    AlternateChannel, AuditStore, Config, DeliveryPipeline, EmailChannel, FsArtifactStore,
    IntakeSessionMachine, ReportPipeline, SqliteAuditStore, SqliteTicketRepository,
    TextReportRenderer, TicketRepository, WorkflowScheduler,
};
use racdesk_server::state::AppState;

/// Re-export fixtures for test convenience
pub use racdesk_core::testing::fixtures;

/// Answers to the six intake questions, in order.
pub const ANSWERS: [&str; 6] = [
    "ACME Ltda",
    "Maria Souza",
    "SUP",
    "Servidor de arquivos fora do ar",
    "Alta",
    "Disco cheio, logs antigos removidos",
];

/// Test fixture with an in-process router and controllable transports.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new().await;
/// let response = fixture.post("/api/v1/intake/messages", json!({
///     "sender": "5511999990000",
///     "text": "novo chamado"
/// })).await;
/// assert_eq!(response.status, StatusCode::OK);
/// ```
pub struct TestFixture {
    pub router: Router,
    /// Direct repository access for arranging data.
    pub repository: Arc<SqliteTicketRepository>,
    pub email: Arc<MockEmailTransport>,
    pub alternate: Arc<MockAlternateTransport>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            ..Default::default()
        };

        let audit_store: Arc<dyn AuditStore> = Arc::new(
            SqliteAuditStore::new(&db_path).expect("Failed to create audit store"),
        );
        let repository = Arc::new(
            SqliteTicketRepository::new(&db_path).expect("Failed to create repository"),
        );

        let (audit_handle, audit_writer) = create_audit_system(Arc::clone(&audit_store), 100);
        tokio::spawn(audit_writer.run());

        let intake = Arc::new(
            IntakeSessionMachine::new(repository.clone(), &config.identifier, config.intake.clone())
                .with_audit(audit_handle.clone()),
        );

        let artifacts: Arc<dyn ArtifactStore> =
            Arc::new(FsArtifactStore::new(temp_dir.path().join("relatorios")));
        let reports = Arc::new(
            ReportPipeline::new(
                repository.clone(),
                Arc::new(TextReportRenderer::new()),
                artifacts.clone(),
                Duration::from_secs(5),
            )
            .with_audit(audit_handle.clone()),
        );

        let email = Arc::new(MockEmailTransport::new());
        let alternate = Arc::new(MockAlternateTransport::new());
        let channels: Vec<Arc<dyn DeliveryChannel>> = vec![
            Arc::new(EmailChannel::new(email.clone()).with_manager_copy(true)),
            Arc::new(AlternateChannel::new(alternate.clone())),
        ];
        let deliveries = Arc::new(
            DeliveryPipeline::new(repository.clone(), artifacts, channels, Duration::from_secs(5))
                .with_audit(audit_handle.clone()),
        );

        let scheduler = Arc::new(WorkflowScheduler::new(
            config.scheduler.clone(),
            reports.clone(),
            deliveries.clone(),
        ));

        let state = Arc::new(AppState::new(
            config,
            audit_handle,
            audit_store,
            repository.clone() as Arc<dyn TicketRepository>,
            intake,
            reports,
            deliveries,
            scheduler,
        ));

        Self {
            router: racdesk_server::api::create_router(state),
            repository,
            email,
            alternate,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// POST without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body)).await
    }

    /// Send one chat message and return the reply text.
    pub async fn say(&self, sender: &str, text: &str) -> String {
        let response = self
            .post(
                "/api/v1/intake/messages",
                json!({ "sender": sender, "text": text }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "body: {}", response.body);
        response.body["reply"]
            .as_str()
            .expect("reply should be a string")
            .to_string()
    }

    /// Run a full conversation through the API and return the ticket id.
    pub async fn open_ticket_via_chat(&self, sender: &str) -> String {
        self.say(sender, "novo chamado").await;
        for answer in ANSWERS {
            self.say(sender, answer).await;
        }
        let reply = self.say(sender, "sim").await;
        reply
            .split("ID: ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .expect("confirmation should contain the ticket id")
            .to_string()
    }

    /// Poll the audit endpoint until `event_type` shows up for `ticket_id`.
    pub async fn wait_for_audit(&self, event_type: &str, ticket_id: &str) -> Vec<Value> {
        let path = format!(
            "/api/v1/audit?event_type={}&ticket_id={}",
            event_type, ticket_id
        );
        for _ in 0..50 {
            let response = self.get(&path).await;
            if let Some(events) = response.body["events"].as_array() {
                if !events.is_empty() {
                    return events.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Vec::new()
    }

    /// Raw GET returning the status and the body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
