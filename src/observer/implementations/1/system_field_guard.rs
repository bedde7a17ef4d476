// Ring 1: Input Validation - clients may not set system-managed fields
use async_trait::async_trait;
use std::collections::HashMap;

use crate::messages::Msg;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

pub const SYSTEM_FIELDS: [&str; 6] = ["id", "company_id", "created_at", "updated_at", "created_by", "version"];

#[derive(Default)]
pub struct SystemFieldGuard;

#[async_trait]
impl Observer for SystemFieldGuard {
    fn name(&self) -> &'static str {
        "SystemFieldGuard"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op.writes_body()
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let field_errors: HashMap<String, String> = SYSTEM_FIELDS
            .iter()
            .filter(|field| ctx.input.contains_key(**field))
            .map(|field| (field.to_string(), Msg::SystemFieldNotAllowed.text().to_string()))
            .collect();

        if field_errors.is_empty() {
            return Ok(());
        }
        Err(ObserverError::ValidationError {
            message: Msg::ValidationFailed.text().to_string(),
            field_errors,
        })
    }
}
