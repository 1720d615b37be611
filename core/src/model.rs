use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

/// A named delivery target that payloads are ingested against.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub target_url: String,
    pub secret_key: Option<String>,
    /// Event types this subscription accepts; an empty list accepts everything.
    pub event_types: Vec<String>,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The subset of a [`Subscription`] that the cache stores and the delivery
/// engine needs; smaller than the full row so a cache hit doesn't carry
/// timestamps nobody reads on the hot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSubscription {
    pub id: Uuid,
    pub target_url: String,
    pub secret_key: Option<String>,
    pub event_types: Vec<String>,
    pub is_enabled: bool,
}

impl From<Subscription> for CachedSubscription {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id,
            target_url: s.target_url,
            secret_key: s.secret_key,
            event_types: s.event_types,
            is_enabled: s.is_enabled,
        }
    }
}

/// A single ingested webhook body, durably recorded before any delivery is attempted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payload {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub event_type: Option<String>,
    pub body: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

/// Wire-level delivery status. `InFlight` is a storage-only claim marker
/// (see [`AttemptStatus::public`]) and is never produced by anything
/// that reads attempts back out through a public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, strum::Display)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Pending,
    InFlight,
    FailedAttempt,
    Success,
    Failure,
}

impl AttemptStatus {
    /// Attempt statuses as they should be observed by API clients: the
    /// internal claim marker reads back as `Pending`.
    pub fn public(self) -> Self {
        match self {
            AttemptStatus::InFlight => AttemptStatus::Pending,
            other => other,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Success | AttemptStatus::Failure)
    }
}

/// One delivery attempt against a payload. `attempt_number` starts at 1 and
/// increments by one for each subsequent retry of the same payload.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attempt {
    pub id: i64,
    pub payload_id: Uuid,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub next_attempt_at: DateTime<Utc>,
    pub response_status_code: Option<i32>,
    pub error_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Row shape returned by a claim query: an attempt joined with just enough
/// of its payload and subscription to perform the delivery without a
/// second round trip.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueAttempt {
    pub id: i64,
    pub payload_id: Uuid,
    pub attempt_number: i32,
    pub subscription_id: Uuid,
    pub target_url: String,
    pub secret_key: Option<String>,
    pub event_type: Option<String>,
    pub body: serde_json::Value,
}

/// Aggregate attempt counters returned by the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub subscription_id: Uuid,
    pub total: i64,
    pub success: i64,
    pub failure: i64,
    pub pending: i64,
}

impl Stats {
    /// Fraction of all attempts so far that ended in `SUCCESS`; `0.0` when
    /// there have been none yet.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.success as f64 / self.total as f64
        }
    }
}
