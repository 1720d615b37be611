//! Exercises the claim → complete → retry cycle against a real Postgres
//! instance, provisioned and migrated automatically by `sqlx::test`.

use webhook_core::model::AttemptStatus;
use webhook_core::store::PgStore;

#[sqlx::test(migrator = "webhook_core::store::MIGRATOR")]
async fn ingestion_creates_a_payload_with_one_pending_attempt(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let sub = store
        .create_subscription("https://example.com/hook", Some("s3cr3t"), &[])
        .await
        .unwrap();

    let payload = store
        .create_payload_with_initial_attempt(sub.id, Some("order.created"), serde_json::json!({"ok": true}))
        .await
        .unwrap();

    let attempts = store.list_attempts_for_payload(payload.id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].attempt_number, 1);
    assert_eq!(attempts[0].status, AttemptStatus::Pending);
}

#[sqlx::test(migrator = "webhook_core::store::MIGRATOR")]
async fn claiming_an_attempt_marks_it_in_flight_and_hides_it_from_a_second_claim(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let sub = store
        .create_subscription("https://example.com/hook", None, &[])
        .await
        .unwrap();
    store
        .create_payload_with_initial_attempt(sub.id, None, serde_json::json!({}))
        .await
        .unwrap();

    let first_claim = store.claim_due_attempts(10).await.unwrap();
    assert_eq!(first_claim.len(), 1);

    let second_claim = store.claim_due_attempts(10).await.unwrap();
    assert!(second_claim.is_empty());
}

#[sqlx::test(migrator = "webhook_core::store::MIGRATOR")]
async fn a_retryable_failure_schedules_a_second_attempt(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let sub = store
        .create_subscription("https://example.com/hook", None, &[])
        .await
        .unwrap();
    let payload = store
        .create_payload_with_initial_attempt(sub.id, None, serde_json::json!({}))
        .await
        .unwrap();

    let claimed = store.claim_due_attempts(10).await.unwrap();
    let attempt = &claimed[0];

    store
        .complete_attempt(attempt.id, AttemptStatus::FailedAttempt, Some(503), Some("service unavailable"))
        .await
        .unwrap();
    store
        .create_next_attempt(payload.id, attempt.attempt_number + 1, chrono::Utc::now())
        .await
        .unwrap();

    let attempts = store.list_attempts_for_payload(payload.id).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].status, AttemptStatus::FailedAttempt);
    assert_eq!(attempts[1].status, AttemptStatus::Pending);
    assert_eq!(attempts[1].attempt_number, 2);
}

#[sqlx::test(migrator = "webhook_core::store::MIGRATOR")]
async fn aggregate_stats_counts_attempts_by_status(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let sub = store
        .create_subscription("https://example.com/hook", None, &[])
        .await
        .unwrap();
    store
        .create_payload_with_initial_attempt(sub.id, None, serde_json::json!({}))
        .await
        .unwrap();

    let claimed = store.claim_due_attempts(10).await.unwrap();
    store
        .complete_attempt(claimed[0].id, AttemptStatus::Success, Some(200), None)
        .await
        .unwrap();

    let stats = store.aggregate_stats(sub.id).await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.failure, 0);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.success_rate(), 1.0);

    // A second payload that never gets delivered contributes to `pending`.
    store
        .create_payload_with_initial_attempt(sub.id, None, serde_json::json!({}))
        .await
        .unwrap();
    let stats = store.aggregate_stats(sub.id).await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.pending, 1);
}

#[sqlx::test(migrator = "webhook_core::store::MIGRATOR")]
async fn retention_sweep_only_deletes_completed_attempts_past_the_cutoff(pool: sqlx::PgPool) {
    let store = PgStore::new(pool);
    let sub = store
        .create_subscription("https://example.com/hook", None, &[])
        .await
        .unwrap();
    let payload = store
        .create_payload_with_initial_attempt(sub.id, None, serde_json::json!({}))
        .await
        .unwrap();

    // Still pending: the sweep must not touch it regardless of cutoff.
    let deleted = store
        .delete_attempts_older_than(chrono::Utc::now() + chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(deleted, 0);

    let claimed = store.claim_due_attempts(10).await.unwrap();
    store
        .complete_attempt(claimed[0].id, AttemptStatus::Success, Some(200), None)
        .await
        .unwrap();

    let deleted = store
        .delete_attempts_older_than(chrono::Utc::now() + chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let attempts = store.list_attempts_for_payload(payload.id).await.unwrap();
    assert!(attempts.is_empty());
}
