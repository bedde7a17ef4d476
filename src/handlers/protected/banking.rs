use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::handlers::authorized_company;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::models::transaction::{TransactionFilter, TransactionImport};
use crate::models::TransactionView;
use crate::services::banking::LinkRequest;
use crate::services::BankingService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub view: TransactionFilter,
}

/// POST /api/companies/:cid/transactions - upsert by provider id
pub async fn import(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    ApiJson(transactions): ApiJson<Vec<TransactionImport>>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    let imported = BankingService::new(state.store.clone())
        .import(&company_id, transactions)
        .await?;
    Ok(ApiResponse::success(json!({ "imported": imported })))
}

/// GET /api/companies/:cid/transactions?view=all|open|booked
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<TransactionView>> {
    authorized_company(&state, &auth, &company_id).await?;
    let views = BankingService::new(state.store.clone())
        .list(&company_id, query.view)
        .await?;
    Ok(ApiResponse::success(views))
}

/// POST /api/companies/:cid/transactions/:tx_id/links
pub async fn link(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, transaction_id)): Path<(String, String)>,
    ApiJson(request): ApiJson<LinkRequest>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    let doc = BankingService::new(state.store.clone())
        .link(&auth, &company_id, &transaction_id, request)
        .await?;
    Ok(ApiResponse::created(doc.to_json()))
}

/// DELETE /api/companies/:cid/transactions/:tx_id/links/:document_id
pub async fn unlink(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, transaction_id, document_id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    BankingService::new(state.store.clone())
        .unlink(&company_id, &transaction_id, &document_id)
        .await?;
    Ok(ApiResponse::success(json!({
        "transaction_id": transaction_id,
        "document_id": document_id,
        "deleted": true,
    })))
}
