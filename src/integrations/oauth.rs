use async_trait::async_trait;
use serde::Deserialize;

use super::{ensure_success, IntegrationError};
use crate::config::DatevConfig;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Authorization-code exchange against a provider's token endpoint.
#[async_trait]
pub trait OAuthTokenClient: Send + Sync {
    async fn exchange_code(&self, code: &str, code_verifier: &str, redirect_uri: &str) -> Result<TokenResponse, IntegrationError>;
}

/// Form POST with HTTP basic client authentication.
pub struct HttpOAuthTokenClient {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpOAuthTokenClient {
    pub fn new(client: reqwest::Client, config: &DatevConfig) -> Self {
        Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }
}

#[async_trait]
impl OAuthTokenClient for HttpOAuthTokenClient {
    async fn exchange_code(&self, code: &str, code_verifier: &str, redirect_uri: &str) -> Result<TokenResponse, IntegrationError> {
        if self.client_id.is_empty() {
            return Err(IntegrationError::NotConfigured("DATEV"));
        }

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ];
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&params)
            .send()
            .await?;
        let tokens = ensure_success("datev", response).await?.json::<TokenResponse>().await?;
        tracing::debug!(scope = ?tokens.scope, "authorization code exchanged");
        Ok(tokens)
    }
}
