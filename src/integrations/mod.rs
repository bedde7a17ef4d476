//! Outbound HTTP adapters. Each sits behind a trait so handlers and jobs can be
//! exercised against in-process fakes.

pub mod gmail;
pub mod mailer;
pub mod oauth;

use std::time::Duration;

use thiserror::Error;

pub use gmail::{GmailWatchClient, HttpGmailWatchClient, WatchResponse};
pub use mailer::{HttpMailer, LogMailer, Mailer, OutgoingMail};
pub use oauth::{HttpOAuthTokenClient, OAuthTokenClient, TokenResponse};

/// Timeout applied to every outbound request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} responded with {status}: {body}")]
    Status { service: &'static str, status: u16, body: String },

    #[error("Invalid response from {service}: {message}")]
    InvalidResponse { service: &'static str, message: String },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// Shared client for all adapters.
pub fn http_client() -> Result<reqwest::Client, IntegrationError> {
    Ok(reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("taskilo-api/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Turn a non-2xx response into `IntegrationError::Status`, keeping a short body excerpt.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    body.truncate(512);
    Err(IntegrationError::Status { service, status: status.as_u16(), body })
}
