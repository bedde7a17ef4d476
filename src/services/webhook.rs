use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::Sha256;
use std::sync::Arc;
use thiserror::Error;

use crate::database::store::MAX_UPDATE_ATTEMPTS;
use crate::database::{DocumentStore, StoreError, WriteOp};
use crate::filter::Filter;
use crate::models::company::COMPANIES;
use crate::models::webhook::WEBHOOK_EVENTS;
use crate::models::{BalanceEntry, Company, DocumentKind, DocumentStatus, FinanceDocument, WebhookEvent, WebhookOutcome};

type HmacSha256 = Hmac<Sha256>;

/// Payment types whose `company_receives` amount is credited to the platform hold.
pub const HANDLED_PAYMENT_TYPES: [&str; 2] = ["invoice_payment", "additional_hours_platform_hold"];

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook secret is not configured")]
    NotConfigured,

    #[error("signature header missing")]
    MissingSignature,

    #[error("signature does not match")]
    InvalidSignature,

    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Verify a `stripe-signature` header (`t=...,v1=...`) against the raw body.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, tolerance_secs: i64, now: i64) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignature);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| match hex::decode(candidate) {
        // verify_slice compares in constant time
        Ok(bytes) => mac.clone().verify_slice(&bytes).is_ok(),
        Err(_) => false,
    });
    if !matched {
        return Err(WebhookError::InvalidSignature);
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(WebhookError::StaleTimestamp);
    }
    Ok(())
}

/// Header value for `payload`, as Stripe would send it.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut signed = timestamp.to_string().into_bytes();
    signed.push(b'.');
    signed.extend_from_slice(payload);
    let signature = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(&signed);
            hex::encode(mac.finalize().into_bytes())
        }
        Err(_) => String::new(),
    };
    format!("t={},v1={}", timestamp, signature)
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookReceipt {
    pub received: bool,
    pub event_id: String,
    pub event_type: String,
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<WebhookOutcome>,
}

/// Writes for one event; committed together with the event marker.
struct Effects {
    writes: Vec<WriteOp>,
    details: Map<String, Value>,
}

impl Effects {
    fn new() -> Self {
        Self { writes: Vec::new(), details: Map::new() }
    }

    fn outcome(&self) -> WebhookOutcome {
        if self.writes.is_empty() {
            WebhookOutcome::Ignored
        } else {
            WebhookOutcome::Processed
        }
    }
}

pub struct WebhookService {
    store: Arc<dyn DocumentStore>,
}

impl WebhookService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn parse_event(payload: &[u8]) -> Result<StripeEvent, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    /// Apply an event exactly once. The marker under `webhook_events/{id}` is created in the
    /// same batch as the effects, so a replay cannot apply them twice.
    pub async fn handle(&self, event: StripeEvent) -> Result<WebhookReceipt, WebhookError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if self.store.get(WEBHOOK_EVENTS, &event.id).await?.is_some() {
                tracing::info!(event_id = %event.id, event_type = %event.event_type, "duplicate webhook event");
                return Ok(self.receipt(&event, true, None));
            }

            let effects = match event.event_type.as_str() {
                "payment_intent.succeeded" | "charge.succeeded" => self.payment_effects(&event).await?,
                "account.updated" => self.account_effects(&event).await?,
                _ => Effects::new(),
            };
            let outcome = effects.outcome();
            let marker = WebhookEvent {
                provider: "stripe".to_string(),
                event_type: event.event_type.clone(),
                outcome,
                details: if effects.details.is_empty() { None } else { Some(Value::Object(effects.details)) },
                processed_at: Utc::now(),
            };

            let mut writes = effects.writes;
            writes.push(WriteOp::create(WEBHOOK_EVENTS, event.id.clone(), &marker)?);

            match self.store.commit(writes).await {
                Ok(_) => {
                    tracing::info!(event_id = %event.id, event_type = %event.event_type, outcome = ?outcome, "webhook event applied");
                    return Ok(self.receipt(&event, false, Some(outcome)));
                }
                Err(StoreError::AlreadyExists { collection, .. }) if collection == WEBHOOK_EVENTS => {
                    tracing::info!(event_id = %event.id, "webhook event recorded concurrently");
                    return Ok(self.receipt(&event, true, None));
                }
                Err(e) if e.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn receipt(&self, event: &StripeEvent, duplicate: bool, outcome: Option<WebhookOutcome>) -> WebhookReceipt {
        WebhookReceipt {
            received: true,
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            duplicate,
            outcome,
        }
    }

    async fn payment_effects(&self, event: &StripeEvent) -> Result<Effects, WebhookError> {
        let object = &event.data.object;
        let metadata = object.get("metadata").and_then(Value::as_object).cloned().unwrap_or_default();
        let meta = |key: &str| metadata.get(key).and_then(Value::as_str).map(str::to_string);

        let payment_intent_id = match event.event_type.as_str() {
            "charge.succeeded" => object.get("payment_intent").and_then(Value::as_str).map(str::to_string),
            _ => object.get("id").and_then(Value::as_str).map(str::to_string),
        };
        let payment_type = meta("payment_type");
        let company_id = meta("company_id");

        let mut effects = Effects::new();
        if let Some(kind) = &payment_type {
            effects.details.insert("payment_type".into(), json!(kind));
        }

        if let (Some(invoice_id), Some(company_id)) = (meta("invoice_id"), company_id.as_deref()) {
            self.mark_invoice_paid(&mut effects, company_id, &invoice_id, payment_intent_id.clone()).await?;
        }

        let receives = metadata.get("company_receives").and_then(|v| match v {
            Value::String(s) => s.trim().parse::<i64>().ok(),
            other => other.as_i64(),
        });
        let handled_type = payment_type
            .as_deref()
            .map(|t| HANDLED_PAYMENT_TYPES.contains(&t))
            .unwrap_or(true);
        // A charge event repeats its PaymentIntent; only the intent credits the hold.
        let credits = event.event_type == "payment_intent.succeeded";
        if let (Some(cents), Some(company_id), true, true) = (receives, company_id.as_deref(), handled_type, credits) {
            self.credit_balance(&mut effects, event, company_id, cents, payment_type.clone(), payment_intent_id).await?;
        }
        Ok(effects)
    }

    async fn mark_invoice_paid(
        &self,
        effects: &mut Effects,
        company_id: &str,
        invoice_id: &str,
        payment_intent_id: Option<String>,
    ) -> Result<(), WebhookError> {
        let collection = DocumentKind::Invoice.path(company_id);
        let Some(doc) = self.store.get(&collection, invoice_id).await? else {
            tracing::warn!(company_id, invoice_id, "payment for unknown invoice");
            return Ok(());
        };
        let mut invoice: FinanceDocument = doc.parse()?;
        if invoice.status == DocumentStatus::Paid {
            return Ok(());
        }
        if !invoice.status.can_transition_to(DocumentKind::Invoice, DocumentStatus::Paid) {
            tracing::warn!(company_id, invoice_id, status = invoice.status.as_str(), "payment for invoice that cannot be paid");
            return Ok(());
        }
        let now = Utc::now();
        invoice.status = DocumentStatus::Paid;
        invoice.paid_at = Some(now);
        invoice.payment_intent_id = payment_intent_id;
        invoice.updated_at = now;
        effects.writes.push(WriteOp::update(collection, invoice_id, &invoice, Some(doc.version))?);
        effects.details.insert("invoice_id".into(), json!(invoice_id));
        Ok(())
    }

    async fn credit_balance(
        &self,
        effects: &mut Effects,
        event: &StripeEvent,
        company_id: &str,
        cents: i64,
        payment_type: Option<String>,
        payment_intent_id: Option<String>,
    ) -> Result<(), WebhookError> {
        let history = format!("companies/{}/balance_history", company_id);
        let entry_id = payment_intent_id.clone().unwrap_or_else(|| event.id.clone());
        if self.store.get(&history, &entry_id).await?.is_some() {
            tracing::info!(company_id, entry_id = %entry_id, event_id = %event.id, "payment already credited");
            return Ok(());
        }
        let Some(doc) = self.store.get(COMPANIES, company_id).await? else {
            tracing::warn!(company_id, event_id = %event.id, "balance credit for unknown company");
            return Ok(());
        };
        let mut company: Company = doc.parse()?;
        let now = Utc::now();
        company.platform_hold_balance_cents += cents;
        company.updated_at = now;

        let entry = BalanceEntry {
            amount_cents: cents,
            balance_after_cents: company.platform_hold_balance_cents,
            kind: "credit".to_string(),
            payment_type,
            payment_intent_id,
            event_id: event.id.clone(),
            created_at: now,
        };
        effects.writes.push(WriteOp::update(COMPANIES, company_id, &company, Some(doc.version))?);
        effects.writes.push(WriteOp::create(history, entry_id, &entry)?);
        effects.details.insert("company_id".into(), json!(company_id));
        effects.details.insert("amount_cents".into(), json!(cents));
        Ok(())
    }

    async fn account_effects(&self, event: &StripeEvent) -> Result<Effects, WebhookError> {
        let object = &event.data.object;
        let mut effects = Effects::new();
        let Some(account_id) = object.get("id").and_then(Value::as_str) else {
            return Ok(effects);
        };
        let charges = object.get("charges_enabled").and_then(Value::as_bool).unwrap_or(false);
        let payouts = object.get("payouts_enabled").and_then(Value::as_bool).unwrap_or(false);

        let filter = Filter::new().where_eq("integrations.stripe_account_id", account_id);
        for doc in self.store.query(COMPANIES, &filter).await? {
            let mut company: Company = doc.parse()?;
            company.integrations.charges_enabled = charges;
            company.integrations.payouts_enabled = payouts;
            company.updated_at = Utc::now();
            effects.writes.push(WriteOp::update(COMPANIES, doc.id.clone(), &company, Some(doc.version))?);
        }
        if effects.writes.is_empty() {
            tracing::warn!(account_id, "account update for unknown stripe account");
        }
        effects.details.insert("account_id".into(), json!(account_id));
        Ok(effects)
    }
}
