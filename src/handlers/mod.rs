// Handlers by security tier:
// public (no auth) → protected (JWT) → elevated (JWT with role admin)

pub mod elevated;
pub mod protected;
pub mod public;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::messages::Msg;
use crate::middleware::AuthUser;
use crate::models::Company;
use crate::services::CompanyService;
use crate::state::AppState;

/// Company the caller may act on, or 403/404.
pub(crate) async fn authorized_company(state: &AppState, auth: &AuthUser, company_id: &str) -> Result<Company, ApiError> {
    Ok(CompanyService::new(state.store.clone())
        .authorize(auth, company_id)
        .await?)
}

/// JSON body that may be omitted entirely.
pub(crate) fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        ApiError::invalid_json(Msg::InvalidJson.text())
    })
}

/// Page size from a query string, within the configured bounds.
pub(crate) fn page_limit(state: &AppState, requested: Option<usize>) -> usize {
    requested
        .unwrap_or(state.config.filter.default_limit)
        .min(state.config.filter.max_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Body {
        reason: Option<String>,
    }

    #[test]
    fn empty_body_means_defaults() {
        let parsed: Body = optional_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(parsed.reason.is_none());
        let parsed: Body = optional_body(&Bytes::from_static(br#"{"reason":"Mahnung"}"#)).unwrap();
        assert_eq!(parsed.reason.as_deref(), Some("Mahnung"));
        assert!(optional_body::<Body>(&Bytes::from_static(b"{nope")).is_err());
    }
}
