use serde::Serialize;

use crate::middleware::{ApiResponse, AuthUser};

#[derive(Debug, Serialize)]
pub struct Identity {
    pub uid: String,
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub companies: Vec<String>,
}

/// GET /api/auth/whoami
pub async fn whoami(auth: AuthUser) -> ApiResponse<Identity> {
    ApiResponse::success(Identity {
        role: auth.role.as_str(),
        uid: auth.uid,
        email: auth.email,
        companies: auth.companies,
    })
}
