use axum::extract::{Path, State};

use crate::handlers::authorized_company;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::models::NumberSequence;
use crate::services::sequence::SequenceUpdate;
use crate::services::SequenceService;
use crate::state::AppState;

/// GET /api/companies/:cid/sequences
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> ApiResult<Vec<NumberSequence>> {
    authorized_company(&state, &auth, &company_id).await?;
    let sequences = SequenceService::new(state.store.clone()).list(&company_id).await?;
    Ok(ApiResponse::success(sequences))
}

/// PUT /api/companies/:cid/sequences/:type
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((company_id, kind)): Path<(String, String)>,
    ApiJson(patch): ApiJson<SequenceUpdate>,
) -> ApiResult<NumberSequence> {
    authorized_company(&state, &auth, &company_id).await?;
    let kind = SequenceService::parse_type(&kind)?;
    let sequence = SequenceService::new(state.store.clone())
        .update(&company_id, kind, patch)
        .await?;
    Ok(ApiResponse::success(sequence))
}
