use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::filter::{Filter, FilterData};
use crate::handlers::{authorized_company, page_limit};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::DataService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

fn data(state: &AppState) -> DataService {
    DataService::new(state.store.clone(), state.pipeline.clone())
}

/// GET /api/companies/:cid/data/:collection
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, collection)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Value>> {
    authorized_company(&state, &auth, &company_id).await?;
    let filter = Filter::new()
        .with_limit(page_limit(&state, query.limit))
        .with_offset(query.offset);
    let records = data(&state).list(&company_id, &collection, filter).await?;
    Ok(ApiResponse::success(records))
}

/// POST /api/companies/:cid/data/:collection
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, collection)): Path<(String, String)>,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    let doc = data(&state).create(&auth, &company_id, &collection, body).await?;
    Ok(ApiResponse::created(doc.to_json()))
}

/// GET /api/companies/:cid/data/:collection/:id
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, collection, id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    let record = data(&state).get(&company_id, &collection, &id).await?;
    Ok(ApiResponse::success(record))
}

/// PUT /api/companies/:cid/data/:collection/:id - full replacement
pub async fn replace(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, collection, id)): Path<(String, String, String)>,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    let doc = data(&state).replace(&auth, &company_id, &collection, &id, body).await?;
    Ok(ApiResponse::success(doc.to_json()))
}

/// PATCH /api/companies/:cid/data/:collection/:id - merge patch
pub async fn merge(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, collection, id)): Path<(String, String, String)>,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    let doc = data(&state).merge(&auth, &company_id, &collection, &id, body).await?;
    Ok(ApiResponse::success(doc.to_json()))
}

/// DELETE /api/companies/:cid/data/:collection/:id
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, collection, id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    authorized_company(&state, &auth, &company_id).await?;
    data(&state).delete(&auth, &company_id, &collection, &id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/companies/:cid/find/:collection - `where`, `order`, `limit`, `offset`
pub async fn find(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, collection)): Path<(String, String)>,
    ApiJson(filter_data): ApiJson<FilterData>,
) -> ApiResult<Vec<Value>> {
    authorized_company(&state, &auth, &company_id).await?;
    let limits = &state.config.filter;
    let filter = Filter::from_data(filter_data)?.bounded(limits.default_limit, limits.max_limit);
    let records = data(&state).find(&company_id, &collection, filter).await?;
    Ok(ApiResponse::success(records))
}
