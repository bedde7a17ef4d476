// Ring 5: Database - commits the record and any staged writes atomically
use async_trait::async_trait;

use crate::database::WriteOp;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

#[derive(Default)]
pub struct DocumentWriterObserver;

#[async_trait]
impl Observer for DocumentWriterObserver {
    fn name(&self) -> &'static str {
        "DocumentWriterObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Database
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        let collection = ctx.collection_path();
        let id = ctx.record_id.clone();
        let expected_version = ctx.existing.as_ref().map(|d| d.version);

        let primary = match ctx.operation {
            Operation::Create => WriteOp::Create { collection, id, data: ctx.output.clone() },
            Operation::Update | Operation::Merge => WriteOp::Update {
                collection,
                id,
                data: ctx.output.clone(),
                expected_version,
            },
            Operation::Delete => WriteOp::Delete { collection, id, expected_version },
        };

        let mut batch = Vec::with_capacity(1 + ctx.extra_writes.len());
        batch.push(primary);
        batch.append(&mut ctx.extra_writes);

        let written = ctx.store.commit(batch).await?;
        ctx.result = match ctx.operation {
            Operation::Delete => ctx.existing.clone(),
            _ => written.into_iter().next(),
        };

        tracing::info!(
            operation = ctx.operation.as_str(),
            company_id = %ctx.company_id,
            collection = %ctx.collection,
            record_id = %ctx.record_id,
            "record written"
        );
        Ok(())
    }
}
