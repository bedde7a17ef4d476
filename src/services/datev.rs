use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::DatevConfig;
use crate::database::{update_typed, DocumentStore, StoreError, WriteOp};
use crate::integrations::OAuthTokenClient;
use crate::messages::Msg;
use crate::middleware::AuthUser;
use crate::models::company::COMPANIES;
use crate::models::oauth::{integrations_collection, OAUTH_STATES};
use crate::models::{Company, IntegrationTokens, OAuthState};
use crate::services::error::{DomainError, DomainResult};

pub const PROVIDER: &str = "datev";

/// Random URL-safe string of 43 characters, valid as a PKCE verifier and as a state token.
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge for `verifier`.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeRedirect {
    pub url: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub provider: &'static str,
    pub company_id: String,
    pub connected: bool,
}

pub struct DatevService {
    store: Arc<dyn DocumentStore>,
    oauth: Arc<dyn OAuthTokenClient>,
    config: DatevConfig,
}

impl DatevService {
    pub fn new(store: Arc<dyn DocumentStore>, oauth: Arc<dyn OAuthTokenClient>, config: DatevConfig) -> Self {
        Self { store, oauth, config }
    }

    /// Start an authorization-code flow with PKCE.
    pub async fn authorize(&self, auth: &AuthUser, company_id: &str) -> DomainResult<AuthorizeRedirect> {
        if self.config.client_id.is_empty() {
            return Err(DomainError::BadRequest(Msg::OAuthNotConfigured));
        }
        let state = random_token();
        let verifier = random_token();
        let record = OAuthState {
            provider: PROVIDER.to_string(),
            company_id: company_id.to_string(),
            uid: auth.uid.clone(),
            code_verifier: verifier.clone(),
            created_at: Utc::now(),
        };
        self.store
            .commit(vec![WriteOp::create(OAUTH_STATES, state.clone(), &record)?])
            .await?;

        let challenge = code_challenge(&verifier);
        let url = url::Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope.as_str()),
                ("state", state.as_str()),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| {
            tracing::error!("invalid DATEV authorize url: {}", e);
            DomainError::BadRequest(Msg::OAuthNotConfigured)
        })?;

        tracing::info!(company_id, uid = %auth.uid, "datev authorization started");
        Ok(AuthorizeRedirect { url: url.into(), state })
    }

    /// Finish the flow: consume the state, exchange the code, store the tokens.
    pub async fn callback(&self, code: &str, state: &str) -> DomainResult<Connection> {
        if code.is_empty() || state.is_empty() {
            return Err(DomainError::BadRequest(Msg::OAuthStateInvalid));
        }
        let doc = match self.store.get(OAUTH_STATES, state).await {
            Ok(Some(doc)) => doc,
            Ok(None) | Err(StoreError::InvalidPath(_)) => return Err(DomainError::BadRequest(Msg::OAuthStateInvalid)),
            Err(e) => return Err(e.into()),
        };
        let record: OAuthState = doc.parse()?;

        // Single use: a concurrent callback loses the version race.
        match self
            .store
            .commit(vec![WriteOp::delete(OAUTH_STATES, state, Some(doc.version))])
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_conflict() || matches!(e, StoreError::NotFound { .. }) => {
                return Err(DomainError::BadRequest(Msg::OAuthStateInvalid));
            }
            Err(e) => return Err(e.into()),
        }
        if record.provider != PROVIDER || record.is_expired(Utc::now()) {
            tracing::warn!(company_id = %record.company_id, "expired or foreign oauth state");
            return Err(DomainError::BadRequest(Msg::OAuthStateInvalid));
        }

        let tokens = self
            .oauth
            .exchange_code(code, &record.code_verifier, &self.config.redirect_uri)
            .await
            .map_err(|e| {
                tracing::error!(company_id = %record.company_id, "datev code exchange failed: {}", e);
                DomainError::from(e)
            })?;

        let now = Utc::now();
        let stored = IntegrationTokens {
            provider: PROVIDER.to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type.unwrap_or_else(|| "Bearer".to_string()),
            scope: tokens.scope,
            expires_at: tokens.expires_in.map(|secs| now + Duration::seconds(secs)),
            connected_by: record.uid.clone(),
            connected_at: now,
        };
        self.store
            .commit(vec![WriteOp::set(integrations_collection(&record.company_id), PROVIDER, &stored)?])
            .await?;
        self.set_connected(&record.company_id, true).await?;

        tracing::info!(company_id = %record.company_id, uid = %record.uid, "datev connected");
        Ok(Connection { provider: PROVIDER, company_id: record.company_id, connected: true })
    }

    pub async fn disconnect(&self, auth: &AuthUser, company_id: &str) -> DomainResult<Connection> {
        self.store
            .commit(vec![WriteOp::delete(integrations_collection(company_id), PROVIDER, None)])
            .await?;
        self.set_connected(company_id, false).await?;
        tracing::info!(company_id, uid = %auth.uid, "datev disconnected");
        Ok(Connection { provider: PROVIDER, company_id: company_id.to_string(), connected: false })
    }

    async fn set_connected(&self, company_id: &str, connected: bool) -> DomainResult<()> {
        match update_typed::<Company, _, DomainError>(self.store.as_ref(), COMPANIES, company_id, |company| {
            company.integrations.datev_connected = connected;
            company.updated_at = Utc::now();
            Ok(())
        })
        .await
        {
            Ok(_) => Ok(()),
            Err(DomainError::Store(StoreError::NotFound { .. })) => Err(DomainError::NotFound(Msg::CompanyNotFound)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;
    use crate::integrations::{IntegrationError, TokenResponse};
    use async_trait::async_trait;

    #[test]
    fn challenge_matches_rfc7636_vector() {
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
        let token = random_token();
        assert_eq!(token.len(), 43);
        assert_ne!(token, random_token());
    }

    struct StaticTokens;

    #[async_trait]
    impl OAuthTokenClient for StaticTokens {
        async fn exchange_code(&self, code: &str, verifier: &str, _redirect_uri: &str) -> Result<TokenResponse, IntegrationError> {
            assert_eq!(code, "auth-code");
            assert_eq!(verifier.len(), 43);
            Ok(TokenResponse {
                access_token: "at".into(),
                refresh_token: Some("rt".into()),
                token_type: None,
                expires_in: Some(900),
                scope: None,
            })
        }
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        store
            .create(COMPANIES, "c1", crate::database::store::to_map(&Company::new("Muster GmbH", "u1")).unwrap())
            .await
            .unwrap();
        let mut config = AppConfig::development().datev;
        config.client_id = "client".into();
        let service = DatevService::new(store.clone(), Arc::new(StaticTokens), config);
        let user = AuthUser { uid: "u1".into(), role: Role::User, email: None, companies: vec![] };

        let redirect = service.authorize(&user, "c1").await.unwrap();
        assert!(redirect.url.contains("code_challenge_method=S256"));
        assert!(redirect.url.contains(&format!("state={}", redirect.state)));

        let connection = service.callback("auth-code", &redirect.state).await.unwrap();
        assert!(connection.connected);
        let company: Company = store.get(COMPANIES, "c1").await.unwrap().unwrap().parse().unwrap();
        assert!(company.integrations.datev_connected);
        assert!(store.get("companies/c1/integrations", PROVIDER).await.unwrap().is_some());

        assert!(matches!(
            service.callback("auth-code", &redirect.state).await,
            Err(DomainError::BadRequest(Msg::OAuthStateInvalid))
        ));

        service.disconnect(&user, "c1").await.unwrap();
        assert!(store.get("companies/c1/integrations", PROVIDER).await.unwrap().is_none());
    }
}
