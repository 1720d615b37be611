pub mod health;
pub mod stats;
pub mod subscriptions;
pub mod webhooks;

use paperclip::actix::Apiv2Schema;
use serde::Deserialize;
use webhook_core::cache::SubscriptionCache;
use webhook_core::store::PgStore;

/// Shared handles every handler closes over; built once in `main` and
/// cloned into `actix_web::web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub store: std::sync::Arc<PgStore>,
    pub cache: SubscriptionCache,
}

/// `skip`/`limit` pagination shared by every listing endpoint.
#[derive(Debug, Deserialize, Apiv2Schema)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_page_limit")]
    pub limit: i64,
}

fn default_page_limit() -> i64 {
    50
}
