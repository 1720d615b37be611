use log::warn;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::model::CachedSubscription;

const SUBSCRIPTION_TTL_SECONDS: u64 = 3600;

fn key(id: Uuid) -> String {
    format!("subscription:{id}")
}

/// Read-through cache for subscriptions. A Redis outage degrades to "always
/// miss": every lookup still falls back to the store, it just does so on
/// every call instead of once an hour.
#[derive(Clone)]
pub struct SubscriptionCache {
    conn: ConnectionManager,
}

impl SubscriptionCache {
    pub async fn connect(redis_url: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    pub async fn get(&self, id: Uuid) -> Option<CachedSubscription> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = match conn.get(key(id)).await {
            Ok(v) => v,
            Err(e) => {
                warn!("subscription cache read failed for {id}: {e}");
                return None;
            }
        };
        raw.and_then(|s| match serde_json::from_str(&s) {
            Ok(sub) => Some(sub),
            Err(e) => {
                warn!("subscription cache entry for {id} was not valid JSON: {e}");
                None
            }
        })
    }

    pub async fn set(&self, sub: &CachedSubscription) {
        let mut conn = self.conn.clone();
        match serde_json::to_string(sub) {
            Ok(encoded) => {
                if let Err(e) = conn
                    .set_ex::<_, _, ()>(key(sub.id), encoded, SUBSCRIPTION_TTL_SECONDS)
                    .await
                {
                    warn!("subscription cache write failed for {}: {e}", sub.id);
                }
            }
            Err(e) => warn!("failed to serialize subscription {} for cache: {e}", sub.id),
        }
    }

    pub async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await.is_ok()
    }

    /// Must be called before returning from any mutation (`update`/`delete`)
    /// so a concurrent reader never observes a stale cached entry.
    pub async fn invalidate(&self, id: Uuid) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(key(id)).await {
            warn!("subscription cache invalidation failed for {id}: {e}");
        }
    }
}
