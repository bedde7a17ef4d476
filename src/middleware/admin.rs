use axum::{extract::Request, middleware::Next, response::Response};

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::messages::Msg;

/// Elevated routes: runs after `jwt_auth_middleware` and admits only admins.
pub async fn require_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized(Msg::TokenMissing.text()))?;

    if !user.is_admin() {
        tracing::warn!(uid = %user.uid, role = user.role.as_str(), path = %request.uri().path(), "admin route denied");
        return Err(ApiError::forbidden(Msg::AdminRequired.text()));
    }

    Ok(next.run(request).await)
}
