use actix_web::HttpResponse;
use actix_web::web::Data;
use paperclip::actix::{Apiv2Schema, api_v2_operation};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize, Apiv2Schema)]
pub struct HealthCheck {
    pub database: bool,
    pub cache: bool,
}

impl HealthCheck {
    fn is_healthy(&self) -> bool {
        self.database && self.cache
    }
}

#[api_v2_operation]
pub async fn health(state: Data<AppState>) -> HttpResponse {
    let check = HealthCheck {
        database: sqlx::query("SELECT 1").execute(state.store.pool()).await.is_ok(),
        cache: state.cache.ping().await,
    };

    if check.is_healthy() {
        HttpResponse::Ok().json(check)
    } else {
        HttpResponse::ServiceUnavailable().json(check)
    }
}
