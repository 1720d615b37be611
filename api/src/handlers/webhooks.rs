use actix_web::http::header::HeaderMap;
use actix_web::web::Data;
use actix_web::{HttpResponse, web as actix_web_web};
use chrono::{DateTime, Utc};
use log::warn;
use paperclip::actix::{Apiv2Schema, api_v2_operation, web};
use serde::Serialize;
use uuid::Uuid;
use webhook_core::WebhookProblem;
use webhook_core::model::{Attempt, Payload};
use webhook_core::signing;

use super::subscriptions::get_cached_subscription;
use super::{AppState, PageQuery};

const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const EVENT_TYPE_HEADER: &str = "X-Webhook-Event";

#[derive(Debug, Serialize, Apiv2Schema)]
pub struct IngestAccepted {
    pub status: &'static str,
    pub webhook_id: Uuid,
}

#[derive(Debug, Serialize, Apiv2Schema)]
pub struct IngestSkipped {
    pub status: &'static str,
    pub message: String,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// A subscription with no configured event types accepts everything; one
/// with a non-empty list only accepts event types it explicitly lists.
fn accepts_event_type(subscription_event_types: &[String], event_type: &str) -> bool {
    subscription_event_types.is_empty()
        || subscription_event_types.iter().any(|t| t == event_type)
}

/// `POST /api/v1/webhooks/ingest/{subscription_id}`. Verifies the signature
/// against the exact bytes the client sent and persists those same bytes
/// (after parsing, for storage as jsonb) — the request body is never
/// re-serialized before being signed or stored, so a signature computed at
/// ingestion time will always agree with one recomputed later.
#[api_v2_operation]
pub async fn ingest(
    state: Data<AppState>,
    subscription_id: actix_web_web::Path<Uuid>,
    req: actix_web::HttpRequest,
    raw_body: actix_web_web::Bytes,
) -> Result<HttpResponse, WebhookProblem> {
    let subscription_id = subscription_id.into_inner();
    let subscription = get_cached_subscription(&state, subscription_id).await?;

    if !subscription.is_enabled {
        return Err(WebhookProblem::SubscriptionDisabled);
    }

    let event_type = header_str(req.headers(), EVENT_TYPE_HEADER).map(str::to_owned);

    if let Some(event_type) = &event_type {
        if !accepts_event_type(&subscription.event_types, event_type) {
            return Ok(HttpResponse::Ok().json(IngestSkipped {
                status: "skipped",
                message: format!("Subscription does not accept event type '{event_type}'"),
            }));
        }
    }

    if let Some(secret) = &subscription.secret_key {
        let signature = header_str(req.headers(), SIGNATURE_HEADER)
            .ok_or(WebhookProblem::MissingSignatureHeader)?;
        if !signing::verify(secret, &raw_body, signature) {
            return Err(WebhookProblem::InvalidSignature);
        }
    }

    let body: serde_json::Value = serde_json::from_slice(&raw_body)
        .map_err(|e| WebhookProblem::InvalidJsonPayload(e.to_string()))?;

    let payload = state
        .store
        .create_payload_with_initial_attempt(subscription_id, event_type.as_deref(), body)
        .await?;

    Ok(HttpResponse::Accepted().json(IngestAccepted {
        status: "accepted",
        webhook_id: payload.id,
    }))
}

#[derive(Debug, Serialize, Apiv2Schema)]
pub struct AttemptResponse {
    pub attempt_number: i32,
    pub status: String,
    pub next_attempt_at: DateTime<Utc>,
    pub response_status_code: Option<i32>,
    pub error_details: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Attempt> for AttemptResponse {
    fn from(a: Attempt) -> Self {
        Self {
            attempt_number: a.attempt_number,
            status: a.status.public().to_string(),
            next_attempt_at: a.next_attempt_at,
            response_status_code: a.response_status_code,
            error_details: a.error_details,
            completed_at: a.completed_at,
        }
    }
}

#[derive(Debug, Serialize, Apiv2Schema)]
pub struct WebhookStatusResponse {
    pub webhook_id: Uuid,
    pub attempts: Vec<AttemptResponse>,
}

/// `GET /api/v1/webhooks/{webhook_id}/status` — every attempt made so far
/// for one ingested payload, oldest first.
#[api_v2_operation]
pub async fn status(
    state: Data<AppState>,
    webhook_id: web::Path<Uuid>,
) -> Result<web::Json<WebhookStatusResponse>, WebhookProblem> {
    let webhook_id = webhook_id.into_inner();
    // Confirms existence before listing attempts, so an unknown id reports
    // 404 rather than an empty attempt list.
    state.store.get_payload(webhook_id).await?;
    let attempts = state.store.list_attempts_for_payload(webhook_id).await?;
    Ok(web::Json(WebhookStatusResponse {
        webhook_id,
        attempts: attempts.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Serialize, Apiv2Schema)]
pub struct PayloadResponse {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub event_type: Option<String>,
    pub body: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl From<Payload> for PayloadResponse {
    fn from(p: Payload) -> Self {
        Self {
            id: p.id,
            subscription_id: p.subscription_id,
            event_type: p.event_type,
            body: p.body,
            received_at: p.received_at,
        }
    }
}

/// `GET /api/v1/webhooks/subscription/{subscription_id}` — payloads ingested
/// for one subscription, most recent first.
#[api_v2_operation]
pub async fn list_for_subscription(
    state: Data<AppState>,
    subscription_id: web::Path<Uuid>,
    page: web::Query<PageQuery>,
) -> Result<web::Json<Vec<PayloadResponse>>, WebhookProblem> {
    let payloads = state
        .store
        .list_payloads_for_subscription(subscription_id.into_inner(), page.skip, page.limit)
        .await?;
    Ok(web::Json(payloads.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_unconfigured_subscription_accepts_every_event_type() {
        assert!(accepts_event_type(&[], "order.created"));
    }

    #[test]
    fn a_configured_subscription_rejects_unlisted_event_types() {
        let types = vec!["order.created".to_owned()];
        assert!(accepts_event_type(&types, "order.created"));
        assert!(!accepts_event_type(&types, "order.deleted"));
    }
}
