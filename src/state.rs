use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::integrations::{
    http_client, GmailWatchClient, HttpGmailWatchClient, HttpMailer, HttpOAuthTokenClient, IntegrationError, Mailer,
    OAuthTokenClient,
};
use crate::observer::ObserverPipeline;

/// Shared application state handed to every handler through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub mailer: Arc<dyn Mailer>,
    pub gmail: Arc<dyn GmailWatchClient>,
    pub oauth: Arc<dyn OAuthTokenClient>,
    pub pipeline: Arc<ObserverPipeline>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        gmail: Arc<dyn GmailWatchClient>,
        oauth: Arc<dyn OAuthTokenClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            mailer,
            gmail,
            oauth,
            pipeline: Arc::new(ObserverPipeline::standard()),
        }
    }

    /// Production wiring: HTTP adapters sharing one client.
    pub fn from_config(config: AppConfig, store: Arc<dyn DocumentStore>) -> Result<Self, IntegrationError> {
        let client = http_client()?;
        let mailer = HttpMailer::from_config(&config.mail, client.clone());
        let gmail: Arc<dyn GmailWatchClient> = Arc::new(HttpGmailWatchClient::new(client.clone()));
        let oauth: Arc<dyn OAuthTokenClient> = Arc::new(HttpOAuthTokenClient::new(client, &config.datev));
        tracing::info!(mailer = mailer.name(), store = store.backend_name(), "integrations configured");
        Ok(Self::new(config, store, mailer, gmail, oauth))
    }
}
