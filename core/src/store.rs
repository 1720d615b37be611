use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::model::{Attempt, AttemptStatus, DueAttempt, Payload, Stats, Subscription};
use crate::problem::WebhookProblem;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations");

/// Everything the API and worker need from Postgres, behind a thin wrapper
/// around a `PgPool` rather than calling `sqlx::query!` inline at every call
/// site that needs it.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn get_subscription(
        &self,
        id: Uuid,
    ) -> Result<Subscription, WebhookProblem> {
        sqlx::query_as!(
            Subscription,
            r#"
                SELECT id, target_url, secret_key, event_types, is_enabled, created_at, updated_at
                FROM subscriptions
                WHERE id = $1
            "#,
            id
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or(WebhookProblem::SubscriptionNotFound)
    }

    pub async fn list_subscriptions(
        &self,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Subscription>, WebhookProblem> {
        let subs = sqlx::query_as!(
            Subscription,
            r#"
                SELECT id, target_url, secret_key, event_types, is_enabled, created_at, updated_at
                FROM subscriptions
                ORDER BY created_at DESC
                OFFSET $1 LIMIT $2
            "#,
            skip,
            limit,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(subs)
    }

    pub async fn create_subscription(
        &self,
        target_url: &str,
        secret_key: Option<&str>,
        event_types: &[String],
    ) -> Result<Subscription, WebhookProblem> {
        let sub = sqlx::query_as!(
            Subscription,
            r#"
                INSERT INTO subscriptions (target_url, secret_key, event_types)
                VALUES ($1, $2, $3)
                RETURNING id, target_url, secret_key, event_types, is_enabled, created_at, updated_at
            "#,
            target_url,
            secret_key,
            event_types,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(sub)
    }

    pub async fn update_subscription(
        &self,
        id: Uuid,
        target_url: &str,
        secret_key: Option<&str>,
        event_types: &[String],
        is_enabled: bool,
    ) -> Result<Subscription, WebhookProblem> {
        let sub = sqlx::query_as!(
            Subscription,
            r#"
                UPDATE subscriptions
                SET target_url = $2, secret_key = $3, event_types = $4, is_enabled = $5, updated_at = now()
                WHERE id = $1
                RETURNING id, target_url, secret_key, event_types, is_enabled, created_at, updated_at
            "#,
            id,
            target_url,
            secret_key,
            event_types,
            is_enabled,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or(WebhookProblem::SubscriptionNotFound)?;
        Ok(sub)
    }

    pub async fn delete_subscription(&self, id: Uuid) -> Result<(), WebhookProblem> {
        let result = sqlx::query!("DELETE FROM subscriptions WHERE id = $1", id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(WebhookProblem::SubscriptionNotFound);
        }
        Ok(())
    }

    /// Inserts the payload and its first (PENDING) attempt in one
    /// transaction: a caller never observes a payload with no attempt row.
    pub async fn create_payload_with_initial_attempt(
        &self,
        subscription_id: Uuid,
        event_type: Option<&str>,
        body: serde_json::Value,
    ) -> Result<Payload, WebhookProblem> {
        let mut tx = self.pool.begin().await?;

        let payload = sqlx::query_as!(
            Payload,
            r#"
                INSERT INTO webhook_payloads (subscription_id, event_type, body)
                VALUES ($1, $2, $3)
                RETURNING id, subscription_id, event_type, body, received_at
            "#,
            subscription_id,
            event_type,
            body,
        )
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query!(
            r#"
                INSERT INTO delivery_attempts (payload_id, attempt_number, status, next_attempt_at)
                VALUES ($1, 1, 'PENDING', now())
            "#,
            payload.id,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(payload)
    }

    /// Reverts any `IN_FLIGHT` attempt whose claim is older than
    /// `claim_timeout_seconds` back to `PENDING`. Called at the start of
    /// every poll cycle, before claiming new work.
    pub async fn reclaim_stale_in_flight(&self, claim_timeout_seconds: i64) -> Result<u64, WebhookProblem> {
        let result = sqlx::query!(
            r#"
                UPDATE delivery_attempts
                SET status = 'PENDING', claimed_at = NULL
                WHERE status = 'IN_FLIGHT'
                  AND claimed_at < now() - make_interval(secs => $1)
            "#,
            claim_timeout_seconds as f64,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Claims up to `limit` due `PENDING` attempts, marking them
    /// `IN_FLIGHT` within the same transaction that selects them so two
    /// worker processes polling concurrently never dispatch the same row.
    pub async fn claim_due_attempts(&self, limit: i64) -> Result<Vec<DueAttempt>, WebhookProblem> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as!(
            DueAttempt,
            r#"
                SELECT
                    a.id, a.payload_id, a.attempt_number,
                    p.subscription_id, s.target_url, s.secret_key, p.event_type, p.body
                FROM delivery_attempts a
                JOIN webhook_payloads p ON p.id = a.payload_id
                JOIN subscriptions s ON s.id = p.subscription_id
                WHERE a.status = 'PENDING'
                  AND a.next_attempt_at <= now()
                  AND s.is_enabled
                ORDER BY a.next_attempt_at
                FOR UPDATE OF a SKIP LOCKED
                LIMIT $1
            "#,
            limit,
        )
        .fetch_all(&mut *tx)
        .await?;

        if !rows.is_empty() {
            let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
            sqlx::query!(
                r#"
                    UPDATE delivery_attempts
                    SET status = 'IN_FLIGHT', claimed_at = now()
                    WHERE id = ANY($1)
                "#,
                &ids,
            )
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(rows)
    }

    /// Records the terminal outcome of a claimed attempt: `SUCCESS` or
    /// `FAILURE` is final, `FAILED_ATTEMPT` means a follow-up attempt will
    /// be scheduled separately via [`PgStore::create_next_attempt`].
    pub async fn complete_attempt(
        &self,
        attempt_id: i64,
        status: AttemptStatus,
        response_status_code: Option<i32>,
        error_details: Option<&str>,
    ) -> Result<(), WebhookProblem> {
        sqlx::query!(
            r#"
                UPDATE delivery_attempts
                SET status = $2, response_status_code = $3, error_details = $4, completed_at = now(), claimed_at = NULL
                WHERE id = $1
            "#,
            attempt_id,
            status as _,
            response_status_code,
            error_details,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn create_next_attempt(
        &self,
        payload_id: Uuid,
        attempt_number: i32,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), WebhookProblem> {
        sqlx::query!(
            r#"
                INSERT INTO delivery_attempts (payload_id, attempt_number, status, next_attempt_at)
                VALUES ($1, $2, 'PENDING', $3)
            "#,
            payload_id,
            attempt_number,
            next_attempt_at,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_attempts_for_payload(
        &self,
        payload_id: Uuid,
    ) -> Result<Vec<Attempt>, WebhookProblem> {
        let attempts = sqlx::query_as!(
            Attempt,
            r#"
                SELECT
                    id, payload_id, attempt_number,
                    status as "status: AttemptStatus",
                    next_attempt_at, response_status_code, error_details,
                    created_at, completed_at
                FROM delivery_attempts
                WHERE payload_id = $1
                ORDER BY attempt_number
            "#,
            payload_id,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    pub async fn get_payload(&self, id: Uuid) -> Result<Payload, WebhookProblem> {
        sqlx::query_as!(
            Payload,
            r#"
                SELECT id, subscription_id, event_type, body, received_at
                FROM webhook_payloads
                WHERE id = $1
            "#,
            id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or(WebhookProblem::PayloadNotFound)
    }

    pub async fn list_payloads_for_subscription(
        &self,
        subscription_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Payload>, WebhookProblem> {
        let payloads = sqlx::query_as!(
            Payload,
            r#"
                SELECT id, subscription_id, event_type, body, received_at
                FROM webhook_payloads
                WHERE subscription_id = $1
                ORDER BY received_at DESC
                OFFSET $2 LIMIT $3
            "#,
            subscription_id,
            skip,
            limit,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(payloads)
    }

    /// Permanently deletes completed attempts older than `cutoff`. Run
    /// once an hour by the worker loop.
    pub async fn delete_attempts_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, WebhookProblem> {
        let result = sqlx::query!(
            r#"
                DELETE FROM delivery_attempts
                WHERE completed_at IS NOT NULL AND completed_at < $1
            "#,
            cutoff,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn aggregate_stats(&self, subscription_id: Uuid) -> Result<Stats, WebhookProblem> {
        let row = sqlx::query!(
            r#"
                SELECT
                    count(a.id) AS "total!",
                    count(a.id) FILTER (WHERE a.status = 'SUCCESS') AS "success!",
                    count(a.id) FILTER (WHERE a.status = 'FAILURE') AS "failure!",
                    count(a.id) FILTER (WHERE a.status IN ('PENDING', 'IN_FLIGHT', 'FAILED_ATTEMPT')) AS "pending!"
                FROM webhook_payloads p
                LEFT JOIN delivery_attempts a ON a.payload_id = p.id
                WHERE p.subscription_id = $1
            "#,
            subscription_id,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(Stats {
            subscription_id,
            total: row.total,
            success: row.success,
            failure: row.failure,
            pending: row.pending,
        })
    }
}
