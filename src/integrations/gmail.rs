use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{ensure_success, IntegrationError};
use crate::models::EmailConfig;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

#[derive(Debug, Clone, PartialEq)]
pub struct WatchResponse {
    pub history_id: String,
    pub expiration: DateTime<Utc>,
}

/// `users.watch` for push notifications on a mailbox.
#[async_trait]
pub trait GmailWatchClient: Send + Sync {
    async fn watch(&self, config: &EmailConfig, topic: &str) -> Result<WatchResponse, IntegrationError>;
}

pub struct HttpGmailWatchClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGmailWatchClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, GMAIL_API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

// Gmail encodes both values as strings; expiration is epoch millis.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWatchResponse {
    history_id: String,
    expiration: String,
}

fn parse_watch(raw: RawWatchResponse) -> Result<WatchResponse, IntegrationError> {
    let invalid = |message: String| IntegrationError::InvalidResponse { service: "gmail", message };
    let millis: i64 = raw
        .expiration
        .parse()
        .map_err(|_| invalid(format!("expiration '{}' is not a number", raw.expiration)))?;
    let expiration = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| invalid(format!("expiration {} out of range", millis)))?;
    Ok(WatchResponse {
        history_id: raw.history_id,
        expiration,
    })
}

#[async_trait]
impl GmailWatchClient for HttpGmailWatchClient {
    async fn watch(&self, config: &EmailConfig, topic: &str) -> Result<WatchResponse, IntegrationError> {
        let token = config
            .access_token
            .as_deref()
            .ok_or_else(|| IntegrationError::MissingCredentials(format!("no access token for {}", config.email)))?;

        let response = self
            .client
            .post(format!("{}/users/me/watch", self.base_url.trim_end_matches('/')))
            .bearer_auth(token)
            .json(&json!({
                "topicName": topic,
                "labelIds": ["INBOX"],
                "labelFilterBehavior": "include",
            }))
            .send()
            .await?;
        let raw: RawWatchResponse = ensure_success("gmail", response).await?.json().await?;
        parse_watch(raw)
    }
}
