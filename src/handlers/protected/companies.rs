use axum::extract::{Path, State};
use serde_json::{json, Map, Value};

use crate::messages::Msg;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::models::UsageSnapshot;
use crate::services::CompanyService;
use crate::state::AppState;

/// POST /api/companies - the caller becomes the owner
pub async fn create(State(state): State<AppState>, auth: AuthUser, ApiJson(body): ApiJson<Map<String, Value>>) -> ApiResult<Value> {
    let doc = CompanyService::new(state.store.clone()).create(&auth, body).await?;
    Ok(ApiResponse::created(doc.to_json()))
}

/// GET /api/companies/:company_id
pub async fn get(State(state): State<AppState>, auth: AuthUser, Path(company_id): Path<String>) -> ApiResult<Value> {
    let company = CompanyService::new(state.store.clone()).get(&auth, &company_id).await?;
    Ok(ApiResponse::success(company))
}

/// PATCH /api/companies/:company_id
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    ApiJson(patch): ApiJson<Map<String, Value>>,
) -> ApiResult<Value> {
    let doc = CompanyService::new(state.store.clone())
        .update(&auth, &company_id, patch)
        .await?;
    Ok(ApiResponse::success(doc.to_json()))
}

/// DELETE /api/companies/:company_id - owner only, 409 while locked
pub async fn delete(State(state): State<AppState>, auth: AuthUser, Path(company_id): Path<String>) -> ApiResult<Value> {
    CompanyService::new(state.store.clone()).delete(&auth, &company_id).await?;
    Ok(ApiResponse::success(json!({ "id": company_id, "deleted": true })).with_message(Msg::CompanyDeleted))
}

/// GET /api/companies/:company_id/usage - `null` until the first usage run
pub async fn usage(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> ApiResult<Option<UsageSnapshot>> {
    let usage = CompanyService::new(state.store.clone()).usage(&auth, &company_id).await?;
    Ok(ApiResponse::success(usage))
}
