use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::messages::Msg;
use crate::middleware::ApiResponse;
use crate::state::AppState;

/// GET / - service info
pub async fn root() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "Taskilo API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Multi-tenant business backend for companies, finance documents, banking and email",
        "endpoints": {
            "health": "/health (public)",
            "webhooks": "/webhooks/stripe (public, signed)",
            "oauth": "/oauth/datev/callback (public)",
            "auth": "/api/auth/whoami (protected)",
            "companies": "/api/companies[/:company_id] (protected)",
            "documents": "/api/companies/:company_id/documents/:kind[/:id] (protected)",
            "data": "/api/companies/:company_id/data/:collection[/:id] (protected)",
            "find": "/api/companies/:company_id/find/:collection (protected)",
            "transactions": "/api/companies/:company_id/transactions (protected)",
            "email": "/api/companies/:company_id/email/* (protected)",
            "support": "/api/support/tickets (protected)",
            "admin": "/api/admin/* (admin only)",
        }
    }))
}

/// GET /health - 503 while the store is unreachable
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": state.store.backend_name(),
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": Msg::StoreUnavailable.text(),
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store": state.store.backend_name(),
                    }
                })),
            )
        }
    }
}
