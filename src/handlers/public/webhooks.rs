use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::webhook::{verify_signature, WebhookError, WebhookReceipt};
use crate::services::WebhookService;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /webhooks/stripe - signature over the raw body, then idempotent handling
pub async fn stripe_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult<WebhookReceipt> {
    let stripe = &state.config.stripe;
    let secret = stripe
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(WebhookError::NotConfigured)?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    verify_signature(&body, signature, secret, stripe.tolerance_secs, chrono::Utc::now().timestamp())?;

    let event = WebhookService::parse_event(&body)?;
    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Stripe event received");

    let receipt = WebhookService::new(state.store.clone()).handle(event).await?;
    Ok(ApiResponse::success(receipt))
}
