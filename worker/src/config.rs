use std::time::Duration;

use clap::Parser;
use webhook_core::CommonConfig;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Polling delivery worker for the webhook delivery service")]
pub struct Config {
    #[command(flatten)]
    pub common: CommonConfig,

    /// Number of due attempts claimed from the database per poll cycle.
    #[arg(long, env, default_value_t = 50)]
    pub batch_size: i64,

    /// Number of claimed attempts dispatched concurrently within a batch.
    #[arg(long, env, default_value_t = 20)]
    pub chunk_size: usize,

    /// How often the worker polls for due attempts when there is nothing to do.
    #[arg(long, env, default_value = "2s", value_parser = humantime::parse_duration)]
    pub polling_interval: Duration,
}

impl std::ops::Deref for Config {
    type Target = CommonConfig;

    fn deref(&self) -> &Self::Target {
        &self.common
    }
}
