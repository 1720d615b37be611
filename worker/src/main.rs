use std::sync::Arc;

use clap::Parser;
use log::info;
use sqlx::postgres::PgPoolOptions;
use webhook_core::backoff::RetrySchedule;
use webhook_core::store::{MIGRATOR, PgStore};
use webhook_worker::{Config, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    webhook_core::logging::init();

    let config = Config::parse();

    info!("connecting to Postgres");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;
    let store = PgStore::new(pool);

    let http = reqwest::Client::builder()
        .user_agent(concat!("webhook-worker/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let retry_schedule = RetrySchedule::new(&config.retry_intervals);

    let ctx = Arc::new(run::WorkerContext {
        store,
        http,
        config,
        retry_schedule,
    });

    info!("worker started");
    run::run(ctx).await
}
