use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::handlers::authorized_company;
use crate::messages::Msg;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::ticket::TicketInput;
use crate::services::TicketService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CompanyQuery {
    pub company_id: Option<String>,
}

fn required_company(company_id: Option<&str>) -> Result<&str, ApiError> {
    company_id
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::field_error("company_id", Msg::FieldRequired.text()))
}

/// POST /api/support/tickets - a member opens a ticket for their company
pub async fn create_ticket(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<TicketInput>,
) -> ApiResult<Value> {
    let company_id = required_company(input.company_id.as_deref())?.to_string();
    authorized_company(&state, &auth, &company_id).await?;
    let doc = TicketService::new(state.store.clone()).create(&auth, input).await?;
    Ok(ApiResponse::created(doc.to_json()))
}

/// GET /api/support/tickets?company_id= - internal comments are hidden
pub async fn list_tickets(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<CompanyQuery>,
) -> ApiResult<Vec<Value>> {
    let company_id = required_company(query.company_id.as_deref())?;
    authorized_company(&state, &auth, company_id).await?;
    let tickets = TicketService::new(state.store.clone()).list_for_company(company_id).await?;
    Ok(ApiResponse::success(tickets))
}
