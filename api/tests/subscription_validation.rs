//! Exercises `SubscriptionInput` validation without a database.

use validator::Validate;
use webhook_api::handlers::subscriptions::SubscriptionInput;

#[test]
fn accepts_a_well_formed_subscription() {
    let input = SubscriptionInput {
        target_url: "https://example.com/hook".to_owned(),
        secret_key: Some("shh".to_owned()),
        event_types: vec!["order.created".to_owned()],
        is_enabled: true,
    };
    assert!(input.validate().is_ok());
}

#[test]
fn rejects_a_non_http_target_url() {
    let input = SubscriptionInput {
        target_url: "ftp://example.com/hook".to_owned(),
        secret_key: None,
        event_types: vec![],
        is_enabled: true,
    };
    assert!(input.validate().is_err());
}
