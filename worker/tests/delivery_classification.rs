//! Exercises the HTTP response classification table end to end against a
//! local server, without touching Postgres.

use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use webhook_core::model::DueAttempt;

fn attempt(target_url: String) -> DueAttempt {
    DueAttempt {
        id: 1,
        payload_id: Uuid::nil(),
        attempt_number: 1,
        subscription_id: Uuid::nil(),
        target_url,
        secret_key: Some("secret".to_owned()),
        event_type: Some("order.created".to_owned()),
        body: json!({"hello": "world"}),
    }
}

#[tokio::test]
async fn classifies_2xx_as_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/").with_status(200).create_async().await;

    let client = reqwest::Client::new();
    let outcome =
        webhook_worker::delivery::deliver(&client, &attempt(server.url()), Duration::from_secs(5))
            .await;

    mock.assert_async().await;
    assert!(matches!(
        outcome,
        webhook_worker::delivery::Outcome::Success { status_code: 200 }
    ));
}

#[tokio::test]
async fn classifies_503_as_retryable() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(503)
        .with_body("service unavailable")
        .create_async()
        .await;

    let client = reqwest::Client::new();
    let outcome =
        webhook_worker::delivery::deliver(&client, &attempt(server.url()), Duration::from_secs(5))
            .await;

    mock.assert_async().await;
    assert!(matches!(
        outcome,
        webhook_worker::delivery::Outcome::Retryable { status_code: Some(503), .. }
    ));
}

#[tokio::test]
async fn classifies_404_as_terminal() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/").with_status(404).create_async().await;

    let client = reqwest::Client::new();
    let outcome =
        webhook_worker::delivery::deliver(&client, &attempt(server.url()), Duration::from_secs(5))
            .await;

    mock.assert_async().await;
    assert!(matches!(
        outcome,
        webhook_worker::delivery::Outcome::Terminal { status_code: 404, .. }
    ));
}
