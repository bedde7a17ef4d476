// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::database::StoreError;
use crate::filter::FilterError;
use crate::messages::Msg;
use crate::observer::error::ObserverError;
use crate::services::error::DomainError;
use crate::services::webhook::WebhookError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),
    InvalidTransition(String),
    Locked(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidTransition(_) => StatusCode::CONFLICT,
            ApiError::Locked(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::InvalidJson(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InvalidTransition(msg)
            | ApiError::Locked(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InvalidTransition(_) => "INVALID_TRANSITION",
            ApiError::Locked(_) => "LOCKED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });
        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["field_errors"] = json!(field_errors);
        }
        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// One-field validation failure with the catalog's generic headline.
    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), message.into());
        ApiError::validation_error(Msg::ValidationFailed.text(), Some(field_errors))
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::not_found(Msg::RecordNotFound.text()),
            StoreError::AlreadyExists { .. } | StoreError::VersionConflict { .. } => {
                tracing::debug!("Store conflict: {}", err);
                ApiError::conflict(Msg::Conflict.text())
            }
            StoreError::InvalidPath(path) => {
                tracing::debug!("Rejected document path: {}", path);
                ApiError::bad_request(Msg::RecordNotFound.text())
            }
            StoreError::NotAnObject => ApiError::bad_request(Msg::ValidationFailed.text()),
            StoreError::Connection(msg) => {
                tracing::error!("Store connection error: {}", msg);
                ApiError::service_unavailable(Msg::StoreUnavailable.text())
            }
            StoreError::Serialization(e) => {
                // Log the real error but return generic message
                tracing::error!("Document serialization error: {}", e);
                ApiError::internal_server_error(Msg::InternalError.text())
            }
            StoreError::Sqlx(sqlx_err) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error(Msg::InternalError.text())
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        tracing::debug!("Rejected filter: {}", err);
        ApiError::field_error("filter", Msg::InvalidFilter.text())
    }
}

impl From<ObserverError> for ApiError {
    fn from(err: ObserverError) -> Self {
        match err {
            ObserverError::ValidationError { message, field_errors } => {
                ApiError::validation_error(message, if field_errors.is_empty() { None } else { Some(field_errors) })
            }
            ObserverError::NotFound(msg) => ApiError::not_found(msg),
            ObserverError::Forbidden(msg) => ApiError::forbidden(msg),
            ObserverError::Store(store_err) => store_err.into(),
            ObserverError::TimeoutError(msg) => {
                tracing::error!("Observer timeout: {}", msg);
                ApiError::service_unavailable(Msg::InternalError.text())
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => ApiError::not_found(msg.text()),
            DomainError::BadRequest(msg) => ApiError::bad_request(msg.text()),
            DomainError::Forbidden(msg) => ApiError::forbidden(msg.text()),
            DomainError::Conflict(msg) => ApiError::conflict(msg.text()),
            DomainError::Locked(msg) => ApiError::Locked(msg.text().to_string()),
            DomainError::Validation { field, message } => ApiError::field_error(field, message),
            DomainError::InvalidTransition { from, to } => {
                ApiError::InvalidTransition(format!("{} ({} → {})", Msg::InvalidTransition.text(), from, to))
            }
            DomainError::Store(e) => e.into(),
            DomainError::Filter(e) => e.into(),
            DomainError::Observer(e) => e.into(),
            DomainError::Integration(e) => {
                tracing::error!("Integration error: {}", e);
                ApiError::bad_gateway(Msg::UpstreamUnavailable.text())
            }
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::NotConfigured => {
                tracing::error!("Stripe webhook received but no secret is configured");
                ApiError::service_unavailable(Msg::WebhookNotConfigured.text())
            }
            WebhookError::MissingSignature => ApiError::bad_request(Msg::SignatureMissing.text()),
            WebhookError::InvalidSignature | WebhookError::StaleTimestamp => {
                tracing::warn!("Rejected webhook: {}", err);
                ApiError::bad_request(Msg::SignatureInvalid.text())
            }
            WebhookError::InvalidPayload(detail) => {
                tracing::warn!("Rejected webhook payload: {}", detail);
                ApiError::bad_request(Msg::WebhookPayloadInvalid.text())
            }
            WebhookError::Store(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_code_and_german_message() {
        let err = ApiError::from(StoreError::NotFound { collection: "companies".into(), id: "x".into() });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let body = err.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], Msg::RecordNotFound.text());
    }

    #[test]
    fn internal_errors_are_not_leaked() {
        let raw = serde_json::from_str::<Value>("{oops").unwrap_err();
        let err = ApiError::from(StoreError::Serialization(raw));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), Msg::InternalError.text());
    }

    #[test]
    fn filter_detail_stays_in_the_log() {
        let body = ApiError::from(FilterError::UnsupportedOperator("$bogus".into())).to_json();
        assert_eq!(body["field_errors"]["filter"], Msg::InvalidFilter.text());
        assert!(!body.to_string().contains("$bogus"));
    }

    #[test]
    fn field_errors_are_included() {
        let body = ApiError::field_error("name", Msg::FieldRequired.text()).to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["name"], Msg::FieldRequired.text());
    }

    #[test]
    fn locked_and_transition_map_to_conflict() {
        let locked = ApiError::from(DomainError::Locked(Msg::CompanyLocked));
        assert_eq!(locked.status_code(), StatusCode::CONFLICT);
        assert_eq!(locked.error_code(), "LOCKED");

        let transition = ApiError::from(DomainError::InvalidTransition { from: "draft".into(), to: "paid".into() });
        assert_eq!(transition.error_code(), "INVALID_TRANSITION");
    }
}
