// Ring 1: Input Validation - per-collection required fields
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::messages::Msg;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

pub fn required_fields(collection: &str) -> &'static [&'static str] {
    match collection {
        "customers" | "suppliers" | "projects" | "inventory" => &["name"],
        "contacts" => &["name", "email"],
        "expenses" => &["description", "amount", "date"],
        "time_entries" => &["date", "hours"],
        "employees" => &["first_name", "last_name"],
        "reminders" => &["invoice_id"],
        _ => &[],
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

#[derive(Default)]
pub struct RequiredFieldsObserver;

#[async_trait]
impl Observer for RequiredFieldsObserver {
    fn name(&self) -> &'static str {
        "RequiredFieldsObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op.writes_body()
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let field_errors: HashMap<String, String> = required_fields(&ctx.collection)
            .iter()
            .filter(|field| is_blank(ctx.output.get(**field)))
            .map(|field| (field.to_string(), Msg::FieldRequired.text().to_string()))
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
