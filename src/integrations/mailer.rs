use async_trait::async_trait;
use std::sync::Arc;
use serde::Serialize;
use serde_json::json;

use super::{ensure_success, IntegrationError};
use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), IntegrationError>;

    fn name(&self) -> &'static str;
}

/// Transactional mail API: `POST {url}` with a bearer key.
pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    /// HTTP delivery when an endpoint is configured, logging otherwise.
    pub fn from_config(config: &MailConfig, client: reqwest::Client) -> Arc<dyn Mailer> {
        match &config.api_url {
            Some(url) => Arc::new(Self::new(client, url.clone(), config.api_key.clone().unwrap_or_default(), config.from.clone())),
            None => Arc::new(LogMailer),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), IntegrationError> {
        let body = json!({
            "from": self.from,
            "to": mail.to,
            "subject": mail.subject,
            "text": mail.text,
        });
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        ensure_success("mail", response).await?;
        tracing::info!(to = ?mail.to, subject = %mail.subject, "mail sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Development mailer: logs instead of delivering.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), IntegrationError> {
        tracing::info!(to = ?mail.to, subject = %mail.subject, "mail delivery disabled, logging only");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
