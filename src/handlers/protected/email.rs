use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::handlers::{authorized_company, page_limit};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::models::{EmailCacheEntry, EmailConfigView};
use crate::services::email::{EmailConfigInput, MessagePatch};
use crate::services::EmailService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub folder: Option<String>,
    pub limit: Option<usize>,
}

/// PUT /api/companies/:cid/email/config - secrets are stored, never echoed
pub async fn put_config(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    ApiJson(input): ApiJson<EmailConfigInput>,
) -> ApiResult<EmailConfigView> {
    authorized_company(&state, &auth, &company_id).await?;
    let view = EmailService::new(state.store.clone())
        .upsert_config(&auth, &company_id, input)
        .await?;
    Ok(ApiResponse::success(view))
}

/// GET /api/companies/:cid/email/config
pub async fn get_config(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> ApiResult<EmailConfigView> {
    authorized_company(&state, &auth, &company_id).await?;
    let view = EmailService::new(state.store.clone()).get_config(&auth, &company_id).await?;
    Ok(ApiResponse::success(view))
}

/// GET /api/companies/:cid/email/messages?folder=&limit=
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Vec<EmailCacheEntry>> {
    authorized_company(&state, &auth, &company_id).await?;
    let limit = page_limit(&state, query.limit);
    let messages = EmailService::new(state.store.clone())
        .list_messages(&company_id, query.folder.as_deref(), limit)
        .await?;
    Ok(ApiResponse::success(messages))
}

/// POST /api/companies/:cid/email/messages - batch from a sync client
pub async fn upsert_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    ApiJson(entries): ApiJson<Vec<EmailCacheEntry>>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    let stored = EmailService::new(state.store.clone())
        .upsert_messages(&auth, &company_id, entries)
        .await?;
    Ok(ApiResponse::success(json!({ "stored": stored })))
}

/// PATCH /api/companies/:cid/email/messages/:message_id
pub async fn update_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, message_id)): Path<(String, String)>,
    ApiJson(patch): ApiJson<MessagePatch>,
) -> ApiResult<EmailCacheEntry> {
    authorized_company(&state, &auth, &company_id).await?;
    let entry = EmailService::new(state.store.clone())
        .update_message(&company_id, &message_id, patch)
        .await?;
    Ok(ApiResponse::success(entry))
}
