// Standalone scheduler worker. Shares the task database with the web
// process and runs the poll/claim/execute loop until Ctrl+C.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use baseone::kernel::{
    BloggerPublisher, SchedulerConfig, SchedulerLoop, TaskExecutor, TaskStore,
};
use baseone::Config;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,baseone=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BaseOne worker");

    let config = Config::from_env().context("Failed to load configuration")?;

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("Invalid DATABASE_URL")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let store = TaskStore::new(pool);
    let publisher = Arc::new(BloggerPublisher::new(&config));
    let executor = TaskExecutor::new(store.clone(), publisher, config.publish_timeout);

    let scheduler = SchedulerLoop::with_config(
        store,
        executor,
        SchedulerConfig {
            batch_size: config.batch_size,
            poll_interval: config.poll_interval,
            ..SchedulerConfig::default()
        },
    );

    scheduler.run_until_shutdown().await
}
