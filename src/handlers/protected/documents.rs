use axum::{
    body::Bytes,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::Document;
use crate::error::ApiError;
use crate::handlers::{authorized_company, optional_body, page_limit};
use crate::messages::Msg;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::models::{DocumentInput, DocumentKind, TransactionLink};
use crate::services::{BankingService, FinanceService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

/// Body of the POST action routes; each action reads its own field.
#[derive(Debug, Default, Deserialize)]
pub struct ActionBody {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

fn finance(state: &AppState) -> FinanceService {
    FinanceService::new(state.store.clone(), state.mailer.clone())
}

/// GET /api/companies/:cid/documents/:kind - newest first
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, kind)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Value>> {
    authorized_company(&state, &auth, &company_id).await?;
    let kind = FinanceService::parse_kind(&kind)?;
    let status = query.status.as_deref().map(FinanceService::parse_status).transpose()?;
    let limit = page_limit(&state, query.limit);

    let docs = finance(&state)
        .list(&company_id, kind, status, limit, query.offset)
        .await?;
    Ok(ApiResponse::success(docs.iter().map(Document::to_json).collect()))
}

/// POST /api/companies/:cid/documents/:kind - new numbered draft
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, kind)): Path<(String, String)>,
    ApiJson(input): ApiJson<DocumentInput>,
) -> ApiResult<Value> {
    let company = authorized_company(&state, &auth, &company_id).await?;
    let kind = FinanceService::parse_kind(&kind)?;
    let doc = finance(&state).create(&auth, &company_id, &company, kind, input).await?;
    Ok(ApiResponse::created(doc.to_json()))
}

/// GET /api/companies/:cid/documents/:kind/:id
///
/// `invoices/stats` is answered here so the static segment never competes with ids.
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, kind, id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    let kind = FinanceService::parse_kind(&kind)?;
    let service = finance(&state);

    if kind == DocumentKind::Invoice && id == "stats" {
        let stats = service.stats(&company_id).await?;
        let value = serde_json::to_value(stats).map_err(|e| {
            tracing::error!("Failed to serialize invoice stats: {}", e);
            ApiError::internal_server_error(Msg::InternalError.text())
        })?;
        return Ok(ApiResponse::success(value));
    }

    let (_, doc) = service.get(&company_id, kind, &id).await?;
    Ok(ApiResponse::success(doc.to_json()))
}

/// PUT /api/companies/:cid/documents/:kind/:id - drafts only
pub async fn replace(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, kind, id)): Path<(String, String, String)>,
    ApiJson(input): ApiJson<DocumentInput>,
) -> ApiResult<Value> {
    let company = authorized_company(&state, &auth, &company_id).await?;
    let kind = FinanceService::parse_kind(&kind)?;
    let doc = finance(&state).replace(&company_id, &company, kind, &id, input).await?;
    Ok(ApiResponse::success(doc.to_json()))
}

/// DELETE /api/companies/:cid/documents/:kind/:id - drafts only
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, kind, id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    let kind = FinanceService::parse_kind(&kind)?;
    finance(&state).delete(&auth, &company_id, kind, &id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/companies/:cid/documents/:kind/:id/:action
///
/// Actions: `status`, `send`, `storno` (invoices) and `convert` (quotes).
pub async fn action(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, kind, id, action)): Path<(String, String, String, String)>,
    body: Bytes,
) -> ApiResult<Value> {
    let company = authorized_company(&state, &auth, &company_id).await?;
    let kind = FinanceService::parse_kind(&kind)?;
    let body: ActionBody = optional_body(&body)?;
    let service = finance(&state);

    match (action.as_str(), kind) {
        ("status", _) => {
            let raw = body.status.as_deref().ok_or_else(|| ApiError::field_error("status", Msg::FieldRequired.text()))?;
            let to = FinanceService::parse_status(raw)?;
            let doc = service.change_status(&auth, &company_id, kind, &id, to).await?;
            Ok(ApiResponse::success(doc.to_json()))
        }
        ("send", _) => {
            let outcome = service.send(&auth, &company_id, &company, kind, &id, body.to).await?;
            Ok(ApiResponse::success(outcome.document.to_json()).with_message(outcome.message))
        }
        ("storno", DocumentKind::Invoice) => {
            let doc = service.storno(&auth, &company_id, &id, body.reason).await?;
            Ok(ApiResponse::created(doc.to_json()).with_message(Msg::StornoCreated))
        }
        ("convert", DocumentKind::Quote) => {
            let doc = service.convert_quote(&auth, &company_id, &company, &id).await?;
            Ok(ApiResponse::created(doc.to_json()))
        }
        _ => Err(ApiError::not_found(Msg::RecordNotFound.text())),
    }
}

/// GET /api/companies/:cid/documents/:kind/:id/links - transactions linked to a document
pub async fn links(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, kind, id, segment)): Path<(String, String, String, String)>,
) -> ApiResult<Vec<TransactionLink>> {
    if segment != "links" {
        return Err(ApiError::not_found(Msg::RecordNotFound.text()));
    }
    authorized_company(&state, &auth, &company_id).await?;
    let kind = FinanceService::parse_kind(&kind)?;
    finance(&state).get(&company_id, kind, &id).await?;

    let links = BankingService::new(state.store.clone())
        .links_for_document(&company_id, kind, &id)
        .await?;
    Ok(ApiResponse::success(links))
}
