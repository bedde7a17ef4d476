#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;

use taskilo_api::auth::{generate_jwt, Claims, Role};
use taskilo_api::config::AppConfig;
use taskilo_api::database::{DocumentStore, MemoryStore};
use taskilo_api::integrations::{
    GmailWatchClient, IntegrationError, Mailer, OAuthTokenClient, OutgoingMail, TokenResponse, WatchResponse,
};
use taskilo_api::models::EmailConfig;
use taskilo_api::state::AppState;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Records every mail instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), IntegrationError> {
        self.sent.lock().map_err(|_| IntegrationError::NotConfigured("mailer"))?.push(mail.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub struct FakeGmail;

#[async_trait]
impl GmailWatchClient for FakeGmail {
    async fn watch(&self, _config: &EmailConfig, _topic: &str) -> Result<WatchResponse, IntegrationError> {
        Ok(WatchResponse { history_id: "1000".into(), expiration: Utc::now() + Duration::days(7) })
    }
}

pub struct FakeOAuth;

#[async_trait]
impl OAuthTokenClient for FakeOAuth {
    async fn exchange_code(&self, code: &str, _verifier: &str, _redirect_uri: &str) -> Result<TokenResponse, IntegrationError> {
        Ok(TokenResponse {
            access_token: format!("access-{}", code),
            refresh_token: Some("refresh".into()),
            token_type: Some("Bearer".into()),
            expires_in: Some(900),
            scope: None,
        })
    }
}

/// Router over a fresh in-memory store with fake adapters.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<dyn DocumentStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::development();
        config.jobs.enable_scheduler = false;
        config.stripe.webhook_secret = Some(WEBHOOK_SECRET.to_string());
        config.datev.client_id = "taskilo-test".to_string();
        Self::with_config(config)
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(config, store.clone(), mailer.clone(), Arc::new(FakeGmail), Arc::new(FakeOAuth));
        Self { router: taskilo_api::app(state.clone()), state, store, mailer }
    }

    pub fn token(&self, uid: &str, role: Role, companies: &[&str]) -> String {
        let claims = Claims::new(uid, role, companies.iter().map(|c| c.to_string()).collect(), &self.state.config.security);
        generate_jwt(&claims, &self.state.config.security).expect("token")
    }

    pub fn user_token(&self, uid: &str) -> String {
        self.token(uid, Role::User, &[])
    }

    pub fn admin_token(&self) -> String {
        self.token("admin-1", Role::Admin, &[])
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, json))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Creates a company owned by `uid` and returns its id.
    pub async fn create_company(&self, uid: &str, name: &str) -> Result<String> {
        let (status, body) = self
            .post("/api/companies", &self.user_token(uid), serde_json::json!({ "name": name }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "company creation failed: {} {}", status, body);
        Ok(body["data"]["id"].as_str().unwrap_or_default().to_string())
    }
}
