use actix_web::HttpResponse;
use actix_web::web::Data;
use paperclip::actix::{Apiv2Schema, CreatedJson, api_v2_operation, web};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use webhook_core::WebhookProblem;
use webhook_core::model::{CachedSubscription, Subscription};

use crate::validators;

use super::{AppState, PageQuery};

#[derive(Debug, Clone, Serialize, Apiv2Schema)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub target_url: String,
    pub has_secret: bool,
    pub event_types: Vec<String>,
    pub is_enabled: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id,
            target_url: s.target_url,
            has_secret: s.secret_key.is_some(),
            event_types: s.event_types,
            is_enabled: s.is_enabled,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, Apiv2Schema)]
pub struct SubscriptionInput {
    #[validate(custom(function = "validators::target_url"))]
    pub target_url: String,
    pub secret_key: Option<String>,
    #[validate(custom(function = "validators::event_types"))]
    #[serde(default)]
    pub event_types: Vec<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

fn default_true() -> bool {
    true
}

#[api_v2_operation]
pub async fn list(
    state: Data<AppState>,
    page: web::Query<PageQuery>,
) -> Result<web::Json<Vec<SubscriptionResponse>>, WebhookProblem> {
    let subs = state.store.list_subscriptions(page.skip, page.limit).await?;
    Ok(web::Json(subs.into_iter().map(Into::into).collect()))
}

#[api_v2_operation]
pub async fn get(
    state: Data<AppState>,
    subscription_id: web::Path<Uuid>,
) -> Result<web::Json<SubscriptionResponse>, WebhookProblem> {
    let sub = state.store.get_subscription(subscription_id.into_inner()).await?;
    Ok(web::Json(sub.into()))
}

#[api_v2_operation]
pub async fn create(
    state: Data<AppState>,
    body: web::Json<SubscriptionInput>,
) -> Result<CreatedJson<SubscriptionResponse>, WebhookProblem> {
    body.validate()
        .map_err(|e| WebhookProblem::Validation(e.to_string()))?;

    let sub = state
        .store
        .create_subscription(&body.target_url, body.secret_key.as_deref(), &body.event_types)
        .await?;
    Ok(CreatedJson(sub.into()))
}

#[api_v2_operation]
pub async fn update(
    state: Data<AppState>,
    subscription_id: web::Path<Uuid>,
    body: web::Json<SubscriptionInput>,
) -> Result<web::Json<SubscriptionResponse>, WebhookProblem> {
    body.validate()
        .map_err(|e| WebhookProblem::Validation(e.to_string()))?;

    let id = subscription_id.into_inner();
    let sub = state
        .store
        .update_subscription(
            id,
            &body.target_url,
            body.secret_key.as_deref(),
            &body.event_types,
            body.is_enabled,
        )
        .await?;

    // The subscription must never be observed stale: invalidate before
    // returning the fresh row to the caller.
    state.cache.invalidate(id).await;

    Ok(web::Json(sub.into()))
}

#[api_v2_operation]
pub async fn delete(
    state: Data<AppState>,
    subscription_id: web::Path<Uuid>,
) -> Result<HttpResponse, WebhookProblem> {
    let id = subscription_id.into_inner();
    state.store.delete_subscription(id).await?;
    state.cache.invalidate(id).await;
    Ok(HttpResponse::NoContent().finish())
}

/// Resolves a subscription through the read-through cache: a hit serves
/// straight from Redis, a miss falls through to Postgres and repopulates
/// the cache with a 1 hour TTL.
pub async fn get_cached_subscription(
    state: &AppState,
    id: Uuid,
) -> Result<CachedSubscription, WebhookProblem> {
    if let Some(cached) = state.cache.get(id).await {
        return Ok(cached);
    }

    let sub = state.store.get_subscription(id).await?;
    let cached: CachedSubscription = sub.into();
    state.cache.set(&cached).await;
    Ok(cached)
}
