use axum::extract::{Path, State};

use crate::handlers::authorized_company;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::datev::{AuthorizeRedirect, Connection};
use crate::services::DatevService;
use crate::state::AppState;

fn datev(state: &AppState) -> DatevService {
    DatevService::new(state.store.clone(), state.oauth.clone(), state.config.datev.clone())
}

/// GET /api/companies/:cid/integrations/datev/authorize
pub async fn datev_authorize(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> ApiResult<AuthorizeRedirect> {
    authorized_company(&state, &auth, &company_id).await?;
    let redirect = datev(&state).authorize(&auth, &company_id).await?;
    Ok(ApiResponse::success(redirect))
}

/// DELETE /api/companies/:cid/integrations/datev
pub async fn datev_disconnect(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> ApiResult<Connection> {
    authorized_company(&state, &auth, &company_id).await?;
    let connection = datev(&state).disconnect(&auth, &company_id).await?;
    Ok(ApiResponse::success(connection))
}
