use std::collections::HashMap;
use thiserror::Error;

use crate::database::StoreError;

/// Observer system errors with structured error types
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Security error: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Timeout error: {0}")]
    TimeoutError(String),
}

impl ObserverError {
    pub fn validation(message: impl Into<String>) -> Self {
        ObserverError::ValidationError {
            message: message.into(),
            field_errors: HashMap::new(),
        }
    }

    pub fn field(message: impl Into<String>, field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), reason.into());
        ObserverError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Fold several validation failures into one; the first non-validation error wins.
    pub fn merge(errors: Vec<ObserverError>) -> Option<ObserverError> {
        let mut merged: Option<ObserverError> = None;
        for error in errors {
            merged = Some(match (merged, error) {
                (None, e) => e,
                (
                    Some(ObserverError::ValidationError { message, mut field_errors }),
                    ObserverError::ValidationError { field_errors: more, .. },
                ) => {
                    for (k, v) in more {
                        field_errors.entry(k).or_insert(v);
                    }
                    ObserverError::ValidationError { message, field_errors }
                }
                (Some(ObserverError::ValidationError { .. }), other) => other,
                (Some(first), _) => first,
            });
        }
        merged
    }
}

/// Observer warnings (non-fatal issues)
#[derive(Debug, Clone)]
pub struct ObserverWarning {
    pub observer: String,
    pub ring: u8,
    pub message: String,
}

impl ObserverWarning {
    pub fn new(observer: &str, ring: u8, message: String) -> Self {
        Self {
            observer: observer.to_string(),
            ring,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_combines_field_errors() {
        let merged = ObserverError::merge(vec![
            ObserverError::field("invalid", "name", "required"),
            ObserverError::field("invalid", "id", "system field"),
        ]);
        match merged {
            Some(ObserverError::ValidationError { field_errors, .. }) => {
                assert_eq!(field_errors.len(), 2);
                assert_eq!(field_errors["name"], "required");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn merge_prefers_non_validation_errors() {
        let merged = ObserverError::merge(vec![
            ObserverError::validation("invalid"),
            ObserverError::NotFound("gone".into()),
        ]);
        assert!(matches!(merged, Some(ObserverError::NotFound(_))));
        assert!(ObserverError::merge(vec![]).is_none());
    }
}
