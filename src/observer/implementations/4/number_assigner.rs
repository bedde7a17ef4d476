// Ring 4: Enrichment - customer and supplier numbers from the company's sequences
use async_trait::async_trait;
use serde_json::Value;

use crate::models::SequenceType;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::services::sequence;

#[derive(Default)]
pub struct NumberAssignerObserver;

impl NumberAssignerObserver {
    fn target(collection: &str) -> Option<(SequenceType, &'static str)> {
        match collection {
            "customers" => Some((SequenceType::Customer, "customer_number")),
            "suppliers" => Some((SequenceType::Supplier, "supplier_number")),
            _ => None,
        }
    }
}

#[async_trait]
impl Observer for NumberAssignerObserver {
    fn name(&self) -> &'static str {
        "NumberAssignerObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Enrichment
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op == Operation::Create
    }

    fn applies_to_collection(&self, collection: &str) -> bool {
        Self::target(collection).is_some()
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let Some((kind, field)) = Self::target(&ctx.collection) else {
            return Ok(());
        };
        let supplied = ctx
            .output
            .get(field)
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        if supplied {
            return Ok(());
        }

        let reservation = sequence::reserve(ctx.store.as_ref(), &ctx.company_id, kind).await?;
        ctx.output.insert(field.to_string(), Value::String(reservation.number));
        ctx.extra_writes.push(reservation.write);
        Ok(())
    }
}
