// Main entry point for the BaseOne API server

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use baseone::kernel::{
    AppDeps, BloggerPublisher, SchedulerConfig, SchedulerLoop, TaskExecutor,
};
use baseone::server::build_app;
use baseone::Config;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,baseone=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BaseOne backend");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Connect to database. WAL mode lets the web and worker processes share
    // the file without writers blocking readers.
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("Invalid DATABASE_URL")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let publisher = Arc::new(BloggerPublisher::new(&config));
    let deps = Arc::new(AppDeps::new(pool, publisher));

    // Optionally embed the scheduler loop in this process. Deployments with
    // a dedicated worker process leave RUN_SCHEDULER off.
    if config.run_scheduler {
        let executor = TaskExecutor::new(
            deps.store.clone(),
            deps.publisher.clone(),
            config.publish_timeout,
        );
        let scheduler = SchedulerLoop::with_config(
            deps.store.clone(),
            executor,
            SchedulerConfig {
                batch_size: config.batch_size,
                poll_interval: config.poll_interval,
                ..SchedulerConfig::default()
            },
        );
        tokio::spawn(async move {
            if let Err(e) = scheduler.run().await {
                tracing::error!(error = %e, "scheduler loop exited with error");
            }
        });
        tracing::info!("Scheduler loop running in-process");
    }

    // Build application
    let app = build_app(deps);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
