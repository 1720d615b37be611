use actix_web::web::Data;
use paperclip::actix::{Apiv2Schema, api_v2_operation, web};
use serde::Serialize;
use uuid::Uuid;
use webhook_core::WebhookProblem;
use webhook_core::model::Stats;

use super::AppState;

#[derive(Debug, Serialize, Apiv2Schema)]
pub struct StatsResponse {
    pub subscription_id: Uuid,
    pub total: i64,
    pub success: i64,
    pub failure: i64,
    pub pending: i64,
    pub success_rate: f64,
}

impl From<Stats> for StatsResponse {
    fn from(s: Stats) -> Self {
        Self {
            subscription_id: s.subscription_id,
            total: s.total,
            success: s.success,
            failure: s.failure,
            pending: s.pending,
            success_rate: s.success_rate(),
        }
    }
}

/// `GET /api/v1/stats/subscription/{subscription_id}`
#[api_v2_operation]
pub async fn stats(
    state: Data<AppState>,
    subscription_id: web::Path<Uuid>,
) -> Result<web::Json<StatsResponse>, WebhookProblem> {
    let id = subscription_id.into_inner();
    // Confirm the subscription exists so an unknown id reports 404 instead
    // of a zeroed-out stats row.
    state.store.get_subscription(id).await?;
    let stats = state.store.aggregate_stats(id).await?;
    Ok(web::Json(stats.into()))
}
