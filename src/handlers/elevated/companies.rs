use axum::{
    body::Bytes,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::filter::Filter;
use crate::handlers::{optional_body, page_limit};
use crate::messages::Msg;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::CompanyService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct LockBody {
    #[serde(default)]
    pub reason: Option<String>,
}

/// GET /api/admin/companies
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Value>> {
    let filter = Filter::new()
        .with_limit(page_limit(&state, query.limit))
        .with_offset(query.offset);
    let companies = CompanyService::new(state.store.clone()).list(filter).await?;
    Ok(ApiResponse::success(companies))
}

/// POST /api/admin/companies/:cid/lock
pub async fn lock(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    body: Bytes,
) -> ApiResult<Value> {
    let body: LockBody = optional_body(&body)?;
    let doc = CompanyService::new(state.store.clone())
        .lock(&auth, &company_id, body.reason)
        .await?;
    Ok(ApiResponse::success(doc.to_json()).with_message(Msg::CompanyLockedNow))
}

/// POST /api/admin/companies/:cid/unlock
pub async fn unlock(State(state): State<AppState>, auth: AuthUser, Path(company_id): Path<String>) -> ApiResult<Value> {
    let doc = CompanyService::new(state.store.clone()).unlock(&auth, &company_id).await?;
    Ok(ApiResponse::success(doc.to_json()).with_message(Msg::CompanyUnlockedNow))
}

/// DELETE /api/admin/companies/:cid - 409 while locked
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(company_id): Path<String>) -> ApiResult<Value> {
    CompanyService::new(state.store.clone()).delete(&auth, &company_id).await?;
    Ok(ApiResponse::success(json!({ "id": company_id, "deleted": true })).with_message(Msg::CompanyDeleted))
}
