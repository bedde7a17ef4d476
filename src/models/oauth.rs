use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const OAUTH_STATES: &str = "oauth_states";

/// Authorization attempts expire after this many minutes.
pub const STATE_TTL_MINUTES: i64 = 10;

/// Pending authorization-code flow, stored at `oauth_states/{state}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthState {
    pub provider: String,
    pub company_id: String,
    pub uid: String,
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
}

impl OAuthState {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::minutes(STATE_TTL_MINUTES)
    }
}

/// Provider credentials at `companies/{cid}/integrations/{provider}`. Never returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationTokens {
    pub provider: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub connected_by: String,
    pub connected_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

pub fn integrations_collection(company_id: &str) -> String {
    format!("companies/{}/integrations", company_id)
}
