use axum::extract::{Query, State};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::datev::Connection;
use crate::services::DatevService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

/// GET /oauth/datev/callback - the state token identifies company and user
pub async fn datev_callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> ApiResult<Connection> {
    let service = DatevService::new(state.store.clone(), state.oauth.clone(), state.config.datev.clone());
    let connection = service.callback(&query.code, &query.state).await?;
    Ok(ApiResponse::success(connection))
}
