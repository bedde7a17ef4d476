use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::database::{StoreError, WriteOp};

/// Audit trail entry under `companies/{cid}/activities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(with = "crate::models::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            actor: actor.into(),
            details: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn collection(company_id: &str) -> String {
        format!("companies/{}/activities", company_id)
    }

    pub fn write_op(&self, company_id: &str) -> Result<WriteOp, StoreError> {
        WriteOp::create(Self::collection(company_id), Uuid::new_v4().to_string(), self)
    }
}
