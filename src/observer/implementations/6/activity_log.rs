// Ring 6: Post-Database - audit trail for data API writes
use async_trait::async_trait;
use serde_json::json;

use crate::models::Activity;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

#[derive(Default)]
pub struct ActivityLogObserver;

#[async_trait]
impl Observer for ActivityLogObserver {
    fn name(&self) -> &'static str {
        "ActivityLogObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::PostDatabase
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let activity = Activity::new(
            format!("{}.{}", ctx.collection, ctx.operation.as_str()),
            ctx.collection.clone(),
            ctx.record_id.clone(),
            ctx.actor.clone(),
        )
        .with_details(json!({ "version": ctx.result.as_ref().map(|d| d.version) }));

        ctx.store.commit(vec![activity.write_op(&ctx.company_id)?]).await?;
        Ok(())
    }
}
