use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::messages::Msg;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::models::{AnalyticsRange, Priority, TicketStatus};
use crate::services::ticket::{CommentInput, TicketInput, TicketPatch};
use crate::services::TicketService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
}

/// GET /api/admin/tickets?status=&priority=
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Value>> {
    let tickets = TicketService::new(state.store.clone())
        .list(query.status, query.priority)
        .await?;
    Ok(ApiResponse::success(tickets))
}

/// POST /api/admin/tickets
pub async fn create(State(state): State<AppState>, auth: AuthUser, ApiJson(input): ApiJson<TicketInput>) -> ApiResult<Value> {
    let doc = TicketService::new(state.store.clone()).create(&auth, input).await?;
    Ok(ApiResponse::created(doc.to_json()))
}

/// GET /api/admin/tickets/:id
///
/// `analytics?range=1d|7d|30d|90d|1y` is answered here so it never competes with ids.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Value> {
    let service = TicketService::new(state.store.clone());
    if id == "analytics" {
        let analytics = service.analytics(AnalyticsRange::parse(query.range.as_deref())).await?;
        let value = serde_json::to_value(analytics).map_err(|e| {
            tracing::error!("Failed to serialize ticket analytics: {}", e);
            ApiError::internal_server_error(Msg::InternalError.text())
        })?;
        return Ok(ApiResponse::success(value));
    }
    let doc = service.get(&id).await?;
    Ok(ApiResponse::success(doc.to_json()))
}

/// PATCH /api/admin/tickets/:id - resolved/closed stamps `resolved_at`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TicketPatch>,
) -> ApiResult<Value> {
    let doc = TicketService::new(state.store.clone()).update(&id, patch).await?;
    Ok(ApiResponse::success(doc.to_json()))
}

/// POST /api/admin/tickets/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<CommentInput>,
) -> ApiResult<Value> {
    let doc = TicketService::new(state.store.clone()).add_comment(&auth, &id, input).await?;
    Ok(ApiResponse::created(doc.to_json()))
}
