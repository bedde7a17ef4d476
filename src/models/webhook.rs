use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const WEBHOOK_EVENTS: &str = "webhook_events";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Processed,
    Ignored,
}

/// Marker that a provider event has been applied; its id is the event id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub provider: String,
    pub event_type: String,
    pub outcome: WebhookOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub processed_at: DateTime<Utc>,
}

/// Ledger entry under `companies/{cid}/balance_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub amount_cents: i64,
    pub balance_after_cents: i64,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    pub event_id: String,
    pub created_at: DateTime<Utc>,
}
