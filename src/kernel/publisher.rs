//! Publisher client for the Blogger API.
//!
//! The task executor only sees the [`Publisher`] trait; everything else in
//! this module (token file handling, access-token refresh, the Blogger HTTP
//! calls) is internal to the production implementation.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::Config;

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const BLOGGER_API: &str = "https://www.googleapis.com/blogger/v3";

/// Clock skew allowance when deciding whether an access token is still usable.
const EXPIRY_SKEW_SECS: i64 = 60;

/// A publish attempt failed. All failure causes (missing credentials, refresh
/// failure, network error, non-2xx response) collapse into this one type; the
/// message ends up on the task record.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PublishError {
    pub message: String,
}

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Capability to publish a post to an external platform.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `content` under `title` to the blog identified by
    /// `destination`. Returns the URL of the published post.
    async fn publish(
        &self,
        destination: &str,
        title: &str,
        content: &str,
    ) -> Result<String, PublishError>;
}

/// OAuth credentials persisted between runs, shared by the web and worker
/// processes through a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
}

impl StoredToken {
    /// A token with no recorded expiry is assumed usable until the API says
    /// otherwise.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry <= now + ChronoDuration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Publisher backed by the Blogger v3 `posts.insert` endpoint.
pub struct BloggerPublisher {
    http: reqwest::Client,
    token_file: PathBuf,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl BloggerPublisher {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_file: PathBuf::from(&config.token_file),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
        }
    }

    async fn load_token(&self) -> Result<StoredToken, PublishError> {
        let bytes = fs::read(&self.token_file).await.map_err(|e| {
            PublishError::new(format!(
                "OAuth not connected: cannot read {}: {}",
                self.token_file.display(),
                e
            ))
        })?;

        serde_json::from_slice(&bytes)
            .map_err(|e| PublishError::new(format!("OAuth token file is corrupt: {}", e)))
    }

    async fn save_token(&self, token: &StoredToken) -> Result<(), PublishError> {
        let bytes = serde_json::to_vec_pretty(token)
            .map_err(|e| PublishError::new(format!("failed to serialize token: {}", e)))?;

        fs::write(&self.token_file, bytes).await.map_err(|e| {
            PublishError::new(format!(
                "failed to write {}: {}",
                self.token_file.display(),
                e
            ))
        })
    }

    /// Exchange the refresh token for a fresh access token.
    async fn refresh(&self, mut token: StoredToken) -> Result<StoredToken, PublishError> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| PublishError::new("access token expired and no refresh token"))?;
        let client_id = token
            .client_id
            .clone()
            .or_else(|| self.client_id.clone())
            .ok_or_else(|| PublishError::new("access token expired and no OAuth client id"))?;
        let client_secret = token
            .client_secret
            .clone()
            .or_else(|| self.client_secret.clone())
            .ok_or_else(|| PublishError::new("access token expired and no OAuth client secret"))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];

        let response = self
            .http
            .post(TOKEN_URI)
            .form(&params)
            .send()
            .await
            .map_err(|e| PublishError::new(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::new(format!(
                "token refresh returned {}: {}",
                status, body
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| PublishError::new(format!("token refresh response invalid: {}", e)))?;

        token.token = refreshed.access_token;
        token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + ChronoDuration::seconds(secs.max(0)));

        debug!("refreshed Blogger access token");
        Ok(token)
    }

    async fn access_token(&self) -> Result<String, PublishError> {
        let mut token = self.load_token().await?;

        if token.is_expired(Utc::now()) {
            token = self.refresh(token).await?;
            if let Err(e) = self.save_token(&token).await {
                // The refreshed token still works for this call.
                warn!(error = %e, "failed to persist refreshed token");
            }
        }

        Ok(token.token)
    }
}

#[async_trait]
impl Publisher for BloggerPublisher {
    async fn publish(
        &self,
        destination: &str,
        title: &str,
        content: &str,
    ) -> Result<String, PublishError> {
        let access_token = self.access_token().await?;

        let url = format!("{}/blogs/{}/posts/", BLOGGER_API, destination);
        let response = self
            .http
            .post(&url)
            .query(&[("isDraft", "false")])
            .bearer_auth(&access_token)
            .json(&serde_json::json!({ "title": title, "content": content }))
            .send()
            .await
            .map_err(|e| PublishError::new(format!("blogger request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::new(format!(
                "blogger returned {}: {}",
                status, body
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PublishError::new(format!("blogger response invalid: {}", e)))?;

        body.get("url")
            .and_then(|u| u.as_str())
            .map(str::to_owned)
            .ok_or_else(|| PublishError::new("blogger response missing post url"))
    }
}
