use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Claims, JwtError, Role};
use crate::error::ApiError;
use crate::messages::Msg;
use crate::state::AppState;

/// Authenticated caller extracted from a verified JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub uid: String,
    pub role: Role,
    pub email: Option<String>,
    pub companies: Vec<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            uid: claims.sub,
            role: claims.role,
            email: claims.email,
            companies: claims.companies,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden(Msg::AdminRequired.text()))
        }
    }

    /// Membership according to the token; ownership is checked by `CompanyService::authorize`.
    pub fn is_member_of(&self, company_id: &str) -> bool {
        self.companies.iter().any(|c| c == company_id)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(Msg::TokenMissing.text()))
    }
}

/// JWT authentication middleware that validates tokens and injects `AuthUser`
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers(), &state.config.security.admin_cookie_name)
        .ok_or_else(|| ApiError::unauthorized(Msg::TokenMissing.text()))?;

    let claims = validate_jwt(&token, &state.config.security).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        match e {
            JwtError::Expired => ApiError::unauthorized(Msg::TokenExpired.text()),
            _ => ApiError::unauthorized(Msg::TokenInvalid.text()),
        }
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Bearer header first, then the admin session cookie.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("taskilo-admin-token=xyz"));
        assert_eq!(extract_token(&headers, "taskilo-admin-token").as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; taskilo-admin-token=xyz; lang=de"));
        assert_eq!(extract_token(&headers, "taskilo-admin-token").as_deref(), Some("xyz"));
        assert!(extract_token(&HeaderMap::new(), "taskilo-admin-token").is_none());

        let mut basic = HeaderMap::new();
        basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(extract_token(&basic, "taskilo-admin-token").is_none());
    }
}
