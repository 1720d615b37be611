use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{error, info, warn};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::task::TaskTracker;
use webhook_core::backoff::RetrySchedule;
use webhook_core::model::AttemptStatus;
use webhook_core::store::PgStore;

use crate::Config;
use crate::delivery::{self, Outcome};

pub struct WorkerContext {
    pub store: PgStore,
    pub http: reqwest::Client,
    pub config: Config,
    pub retry_schedule: RetrySchedule,
}

/// Runs the worker until a termination signal is received, then drains
/// in-flight delivery tasks before returning.
pub async fn run(ctx: Arc<WorkerContext>) -> anyhow::Result<()> {
    let tracker = TaskTracker::new();

    let shutdown_tracker = tracker.clone();
    tokio::spawn(async move {
        let mut sighup = signal(SignalKind::hangup()).expect("failed to register SIGHUP handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = sighup.recv() => info!("received SIGHUP, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
        shutdown_tracker.close();
    });

    let mut poll_interval = tokio::time::interval(ctx.config.polling_interval);
    let mut cleanup_interval = tokio::time::interval(Duration::from_secs(3600));

    loop {
        if tracker.is_closed() {
            break;
        }

        tokio::select! {
            _ = poll_interval.tick() => {
                if let Err(e) = run_poll_cycle(&ctx, &tracker).await {
                    error!("poll cycle failed: {e:#}");
                }
            }
            _ = cleanup_interval.tick() => {
                if let Err(e) = run_retention_cleanup(&ctx).await {
                    error!("retention cleanup failed: {e:#}");
                }
            }
        }
    }

    info!(
        "waiting for {} in-flight delivery task(s) to finish",
        tracker.len()
    );
    tracker.wait().await;
    Ok(())
}

async fn run_poll_cycle(ctx: &Arc<WorkerContext>, tracker: &TaskTracker) -> anyhow::Result<()> {
    let reclaimed = ctx
        .store
        .reclaim_stale_in_flight(ctx.config.claim_timeout_seconds)
        .await?;
    if reclaimed > 0 {
        warn!("reclaimed {reclaimed} stale in-flight attempt(s)");
    }

    let due = ctx.store.claim_due_attempts(ctx.config.batch_size).await?;
    if due.is_empty() {
        return Ok(());
    }
    info!("claimed {} due attempt(s)", due.len());

    for chunk in due.chunks(ctx.config.chunk_size) {
        let mut handles = Vec::with_capacity(chunk.len());
        for attempt in chunk.to_vec() {
            let ctx = Arc::clone(ctx);
            handles.push(tracker.spawn(async move { dispatch(&ctx, attempt).await }));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!("delivery task panicked: {e}");
            }
        }
    }

    Ok(())
}

async fn dispatch(ctx: &WorkerContext, attempt: webhook_core::model::DueAttempt) {
    let outcome = delivery::deliver(&ctx.http, &attempt, ctx.config.delivery_timeout).await;

    let result = match outcome {
        Outcome::Success { status_code } => {
            ctx.store
                .complete_attempt(attempt.id, AttemptStatus::Success, Some(status_code as i32), None)
                .await
        }
        Outcome::Terminal {
            status_code,
            error_details,
        } => {
            ctx.store
                .complete_attempt(
                    attempt.id,
                    AttemptStatus::Failure,
                    Some(status_code as i32),
                    Some(&error_details),
                )
                .await
        }
        Outcome::Retryable {
            status_code,
            error_details,
        } => {
            handle_retryable(ctx, &attempt, status_code, &error_details).await
        }
    };

    if let Err(e) = result {
        error!(
            "failed to record outcome for attempt {}: {e}",
            attempt.id
        );
    }
}

async fn handle_retryable(
    ctx: &WorkerContext,
    attempt: &webhook_core::model::DueAttempt,
    status_code: Option<u16>,
    error_details: &str,
) -> Result<(), webhook_core::WebhookProblem> {
    let exhausted = attempt.attempt_number as u32 >= ctx.config.max_retry_attempts;

    let final_status = if exhausted {
        AttemptStatus::Failure
    } else {
        AttemptStatus::FailedAttempt
    };

    ctx.store
        .complete_attempt(
            attempt.id,
            final_status,
            status_code.map(i32::from),
            Some(error_details),
        )
        .await?;

    if !exhausted {
        let next_attempt_at = ctx
            .retry_schedule
            .next_attempt_at(attempt.attempt_number as u32, Utc::now());
        ctx.store
            .create_next_attempt(
                attempt.payload_id,
                attempt.attempt_number + 1,
                next_attempt_at,
            )
            .await?;
    }

    Ok(())
}

async fn run_retention_cleanup(ctx: &Arc<WorkerContext>) -> anyhow::Result<()> {
    let cutoff = Utc::now() - ctx.config.log_retention();
    let deleted = ctx.store.delete_attempts_older_than(cutoff).await?;
    if deleted > 0 {
        info!("retention sweep deleted {deleted} completed attempt(s) older than {cutoff}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use webhook_core::CommonConfig;

    use super::*;

    fn test_config(max_retry_attempts: u32) -> Config {
        Config {
            common: CommonConfig {
                database_url: String::new(),
                max_db_connections: 5,
                redis_url: String::new(),
                max_retry_attempts,
                retry_intervals: vec![10, 30, 60, 300, 900],
                delivery_timeout: Duration::from_secs(10),
                log_retention_hours: 72,
                claim_timeout_seconds: 60,
                rust_log: "info".to_owned(),
            },
            batch_size: 50,
            chunk_size: 20,
            polling_interval: Duration::from_secs(2),
        }
    }

    /// Regression test for a wiring bug where the *next* attempt's number
    /// was handed to `RetrySchedule::next_attempt_at` instead of the
    /// attempt that just failed, shifting every delay one slot ahead of the
    /// table (e.g. the first failure waiting 30s instead of 10s).
    #[sqlx::test(migrator = "webhook_core::store::MIGRATOR")]
    async fn a_retry_is_scheduled_using_the_failing_attempt_s_delay(pool: sqlx::PgPool) {
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
        let attempt = claimed.into_iter().next().unwrap();
        assert_eq!(attempt.attempt_number, 1);

        let ctx = WorkerContext {
            store,
            http: reqwest::Client::new(),
            config: test_config(5),
            retry_schedule: RetrySchedule::new(&[10, 30, 60, 300, 900]),
        };

        let before = Utc::now();
        handle_retryable(&ctx, &attempt, Some(503), "service unavailable")
            .await
            .unwrap();

        let attempts = ctx
            .store
            .list_attempts_for_payload(attempt.payload_id)
            .await
            .unwrap();
        assert_eq!(attempts.len(), 2);

        let scheduled_delay = attempts[1].next_attempt_at - before;
        // attempt_number 1 failed, so the delay must come from
        // delay_for(1) == 10s, not delay_for(2) == 30s.
        assert!(scheduled_delay < chrono::Duration::seconds(20));
    }
}
