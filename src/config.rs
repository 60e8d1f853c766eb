use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Whether the web process should run the scheduler loop in-process.
    /// Deployments with a dedicated worker process leave this off.
    pub run_scheduler: bool,
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub publish_timeout: Duration,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub token_file: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:baseone.db".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            run_scheduler: env::var("RUN_SCHEDULER")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            poll_interval: Duration::from_secs(
                env::var("POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| "25".to_string())
                    .parse()
                    .context("POLL_INTERVAL_SECS must be a valid number")?,
            ),
            batch_size: env::var("BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("BATCH_SIZE must be a valid number")?,
            publish_timeout: Duration::from_secs(
                env::var("PUBLISH_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .context("PUBLISH_TIMEOUT_SECS must be a valid number")?,
            ),
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok(),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET").ok(),
            token_file: env::var("TOKEN_FILE")
                .unwrap_or_else(|_| "google_token.json".to_string()),
        })
    }
}
