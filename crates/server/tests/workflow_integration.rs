//! Report generation and delivery through the HTTP API.

mod common;

use axum::http::StatusCode;
use common::{fixtures, TestFixture};
use racdesk_core::ticket::TicketStatus;
use serde_json::json;

async fn register_acme(fixture: &TestFixture, email: &str, phone: &str) {
    let response = fixture
        .put(
            "/api/v1/clients",
            json!({ "name": "ACME Ltda", "email": email, "phone": phone }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
}

#[tokio::test]
async fn test_chat_ticket_is_reported_and_delivered() {
    let fixture = TestFixture::new().await;
    register_acme(&fixture, "ti@acme.example", "").await;
    let ticket_id = fixture.open_ticket_via_chat("5511988887777").await;

    let report = fixture
        .post_empty(&format!("/api/v1/tickets/{}/report", ticket_id))
        .await;
    assert_status!(report, StatusCode::OK);
    assert_eq!(report.body["ticket_id"], ticket_id.as_str());
    assert_eq!(report.body["regenerated"], false);
    let report_id = report.body["report_id"].as_i64().unwrap();

    let delivered = fixture
        .post_empty(&format!("/api/v1/reports/{}/deliver", report_id))
        .await;
    assert_status!(delivered, StatusCode::OK);
    assert_eq!(delivered.body["outcome"], "delivered");
    assert_eq!(delivered.body["method"], "email");

    let messages = fixture.email.recorded_messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].to, "ti@acme.example");
    assert_eq!(messages[0].attachment.file_name, format!("{}.txt", ticket_id));

    let events = fixture.wait_for_audit("report_delivered", &ticket_id).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["data"]["method"], "email");
}

#[tokio::test]
async fn test_second_delivery_is_a_no_op() {
    let fixture = TestFixture::new().await;
    register_acme(&fixture, "ti@acme.example", "").await;
    let ticket = fixtures::create_ticket(
        fixture.repository.as_ref(),
        &fixtures::new_ticket("ACME Ltda"),
    );
    let report = fixture
        .post_empty(&format!("/api/v1/tickets/{}/report", ticket.id))
        .await;
    let path = format!(
        "/api/v1/reports/{}/deliver",
        report.body["report_id"].as_i64().unwrap()
    );

    fixture.post_empty(&path).await;
    let again = fixture.post_empty(&path).await;

    assert_status!(again, StatusCode::OK);
    assert_eq!(again.body["outcome"], "already_sent");
    assert_eq!(fixture.email.send_count().await, 1);
}

#[tokio::test]
async fn test_delivery_falls_back_to_messaging() {
    let fixture = TestFixture::new().await;
    register_acme(&fixture, "ti@acme.example", "(11) 97712-3444").await;
    fixture.email.set_fail(true).await;
    let ticket = fixtures::create_ticket(
        fixture.repository.as_ref(),
        &fixtures::new_ticket("ACME Ltda"),
    );
    let report = fixture
        .post_empty(&format!("/api/v1/tickets/{}/report", ticket.id))
        .await;

    let delivered = fixture
        .post_empty(&format!(
            "/api/v1/reports/{}/deliver",
            report.body["report_id"].as_i64().unwrap()
        ))
        .await;

    assert_status!(delivered, StatusCode::OK);
    assert_eq!(delivered.body["method"], "alternate_channel");
    assert_eq!(delivered.body["attempts"][0]["method"], "email");
    assert_eq!(delivered.body["attempts"][0]["result"], "failed");

    let sends = fixture.alternate.recorded_sends().await;
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].phone, "11977123444");
}

#[tokio::test]
async fn test_undeliverable_report_stays_unsent() {
    let fixture = TestFixture::new().await;
    let ticket = fixtures::create_ticket(
        fixture.repository.as_ref(),
        &fixtures::new_ticket("Sem Contato"),
    );
    let report = fixture
        .post_empty(&format!("/api/v1/tickets/{}/report", ticket.id))
        .await;

    let outcome = fixture
        .post_empty(&format!(
            "/api/v1/reports/{}/deliver",
            report.body["report_id"].as_i64().unwrap()
        ))
        .await;

    assert_status!(outcome, StatusCode::OK);
    assert_eq!(outcome.body["outcome"], "undeliverable");
    assert_eq!(outcome.body["attempts"].as_array().unwrap().len(), 2);

    let events = fixture.wait_for_audit("delivery_failed", &ticket.id).await;
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_report_requires_resolved_ticket() {
    let fixture = TestFixture::new().await;
    let mut new_ticket = fixtures::new_ticket("ACME Ltda");
    new_ticket.status = Some(TicketStatus::InProgress);
    let ticket = fixtures::create_ticket(fixture.repository.as_ref(), &new_ticket);

    let response = fixture
        .post_empty(&format!("/api/v1/tickets/{}/report", ticket.id))
        .await;
    assert_status!(response, StatusCode::CONFLICT);

    let missing = fixture.post_empty("/api/v1/tickets/RAC0404/report").await;
    assert_status!(missing, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deliver_unknown_report_returns_404() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_empty("/api/v1/reports/42/deliver").await;

    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sweeps_generate_and_deliver_everything_pending() {
    let fixture = TestFixture::new().await;
    register_acme(&fixture, "ti@acme.example", "").await;
    for _ in 0..3 {
        fixtures::create_ticket(
            fixture.repository.as_ref(),
            &fixtures::new_ticket("ACME Ltda"),
        );
    }

    let reports = fixture.post_empty("/api/v1/reports/sweep").await;
    assert_status!(reports, StatusCode::OK);
    assert_eq!(reports.body["completed"].as_array().unwrap().len(), 3);
    assert_eq!(reports.body["failed"].as_array().unwrap().len(), 0);
    assert_eq!(reports.body["cancelled"], false);

    let deliveries = fixture.post_empty("/api/v1/deliveries/sweep").await;
    assert_status!(deliveries, StatusCode::OK);
    let completed = deliveries.body["completed"].as_array().unwrap();
    assert_eq!(completed.len(), 3);
    assert!(completed.iter().all(|o| o["outcome"] == "delivered"));

    // Nothing left for either sweep.
    let reports = fixture.post_empty("/api/v1/reports/sweep").await;
    assert!(reports.body["completed"].as_array().unwrap().is_empty());
    let deliveries = fixture.post_empty("/api/v1/deliveries/sweep").await;
    assert!(deliveries.body["completed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_scheduler_status_when_disabled() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/scheduler/status").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["running"], false);
    assert!(response.body["last_report_sweep"].is_null());
}
