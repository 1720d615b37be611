use std::time::Duration;

use clap::Args;

/// Configuration shared by the API and worker processes. Each binary
/// flattens this into its own `clap::Parser` struct alongside the
/// fields only it needs (`api::Config` adds `ip`/`port`; `worker::Config`
/// adds batching knobs).
#[derive(Debug, Clone, Args)]
pub struct CommonConfig {
    /// Postgres connection string.
    #[arg(long, env)]
    pub database_url: String,

    /// Maximum number of connections kept in the Postgres pool.
    #[arg(long, env, default_value_t = 5)]
    pub max_db_connections: u32,

    /// Redis connection string backing the subscription read-through cache.
    #[arg(long, env)]
    pub redis_url: String,

    /// Number of delivery attempts made (including the first) before an
    /// attempt is marked `FAILURE` instead of scheduling a retry.
    #[arg(long, env, default_value_t = 5)]
    pub max_retry_attempts: u32,

    /// Backoff schedule, in seconds, indexed by attempt number (1-based).
    /// The last entry repeats for any attempt number past the table's end.
    #[arg(long, env, value_delimiter = ',', default_value = "10,30,60,300,900")]
    pub retry_intervals: Vec<u64>,

    /// Timeout applied to each outbound delivery POST.
    #[arg(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub delivery_timeout: Duration,

    /// How long a completed attempt's audit row is kept before the
    /// retention sweep deletes it.
    #[arg(long, env, default_value_t = 72)]
    pub log_retention_hours: i64,

    /// How long an `IN_FLIGHT` claim is honored before a worker's reclaim
    /// sweep puts the row back in the pool; guards against a worker process
    /// that claimed a row and then crashed before writing an outcome.
    #[arg(long, env, default_value_t = 60)]
    pub claim_timeout_seconds: i64,

    /// RUST_LOG-compatible filter; read directly by `env_logger`, not by clap,
    /// but kept here so `--help` documents it alongside the rest.
    #[arg(long, env, default_value = "info")]
    pub rust_log: String,
}

impl CommonConfig {
    pub fn log_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.log_retention_hours)
    }
}
