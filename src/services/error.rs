use thiserror::Error;

use crate::database::StoreError;
use crate::filter::FilterError;
use crate::integrations::IntegrationError;
use crate::messages::Msg;
use crate::observer::error::ObserverError;

/// Domain-level failures raised by services; converted to `ApiError` at the HTTP edge.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(Msg),

    #[error("bad request: {0}")]
    BadRequest(Msg),

    #[error("forbidden: {0}")]
    Forbidden(Msg),

    #[error("conflict: {0}")]
    Conflict(Msg),

    #[error("locked: {0}")]
    Locked(Msg),

    #[error("invalid field {field}: {message}")]
    Validation { field: String, message: String },

    #[error("invalid transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Observer(#[from] ObserverError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

impl DomainError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation { field: field.into(), message: message.into() }
    }

    pub fn required(field: impl Into<String>) -> Self {
        Self::field(field, Msg::FieldRequired.text())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
