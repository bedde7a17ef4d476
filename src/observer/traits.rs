use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;

/// Observer rings with semantic meaning, executed in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObserverRing {
    DataPreparation = 0, // Load existing record, build the outgoing body
    InputValidation = 1, // System fields, required fields
    Security = 2,        // Access checks
    Business = 3,        // Domain rules
    Enrichment = 4,      // Timestamps, ownership, numbering
    Database = 5,        // Atomic commit
    PostDatabase = 6,    // Activity trail; failures are warnings only
}

impl ObserverRing {
    pub const ALL: [ObserverRing; 7] = [
        ObserverRing::DataPreparation,
        ObserverRing::InputValidation,
        ObserverRing::Security,
        ObserverRing::Business,
        ObserverRing::Enrichment,
        ObserverRing::Database,
        ObserverRing::PostDatabase,
    ];

    /// Rings whose errors abort the write
    pub fn is_blocking(&self) -> bool {
        (*self as u8) <= ObserverRing::Database as u8
    }
}

/// Write operations supported by the observer system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    /// Replace the body (PUT)
    Update,
    /// Merge into the body (PATCH)
    Merge,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Merge => "merge",
            Operation::Delete => "delete",
        }
    }

    pub fn writes_body(&self) -> bool {
        !matches!(self, Operation::Delete)
    }
}

#[async_trait]
pub trait Observer: Send + Sync {
    /// Observer name for logging and debugging
    fn name(&self) -> &'static str;

    fn ring(&self) -> ObserverRing;

    fn applies_to_operation(&self, op: Operation) -> bool;

    fn applies_to_collection(&self, _collection: &str) -> bool {
        true
    }

    /// Execution timeout (default 5 seconds)
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Priority within ring (lower numbers execute first)
    fn priority(&self) -> u8 {
        50
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError>;
}
