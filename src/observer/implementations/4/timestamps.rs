// Ring 4: Enrichment - timestamps and ownership
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::models::timestamp;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

#[derive(Default)]
pub struct TimestampsObserver;

#[async_trait]
impl Observer for TimestampsObserver {
    fn name(&self) -> &'static str {
        "TimestampsObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Enrichment
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op.writes_body()
    }

    fn priority(&self) -> u8 {
        10
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let now = Value::String(timestamp::format(&Utc::now()));
        let company_id = Value::String(ctx.company_id.clone());

        match &ctx.existing {
            None => {
                ctx.output.insert("created_at".into(), now.clone());
                ctx.output.insert("created_by".into(), Value::String(ctx.actor.clone()));
            }
            Some(existing) => {
                // Replacing a body must not lose its provenance
                let created_at = existing
                    .data
                    .get("created_at")
                    .cloned()
                    .unwrap_or_else(|| Value::String(timestamp::format(&existing.created_at)));
                ctx.output.insert("created_at".into(), created_at);
                if let Some(created_by) = existing.data.get("created_by") {
                    ctx.output.insert("created_by".into(), created_by.clone());
                }
                ctx.output.insert("updated_by".into(), Value::String(ctx.actor.clone()));
            }
        }
        ctx.output.insert("updated_at".into(), now);
        ctx.output.insert("company_id".into(), company_id);
        Ok(())
    }
}
