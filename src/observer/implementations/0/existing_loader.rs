// Ring 0: Data Preparation - loads the stored record and builds the body to write
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::messages::Msg;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

#[derive(Default)]
pub struct ExistingRecordLoader;

#[async_trait]
impl Observer for ExistingRecordLoader {
    fn name(&self) -> &'static str {
        "ExistingRecordLoader"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if ctx.operation != Operation::Create {
            let path = ctx.collection_path();
            let existing = ctx.store.get(&path, &ctx.record_id).await?;
            match existing {
                Some(doc) => ctx.existing = Some(doc),
                None => return Err(ObserverError::NotFound(Msg::RecordNotFound.text().to_string())),
            }
        }

        ctx.output = match ctx.operation {
            Operation::Create | Operation::Update => ctx.input.clone(),
            Operation::Merge => {
                let mut merged = ctx.existing.as_ref().map(|d| d.data.clone()).unwrap_or_default();
                merge_patch(&mut merged, &ctx.input);
                merged
            }
            Operation::Delete => Map::new(),
        };
        Ok(())
    }
}

/// JSON merge patch: `null` removes a key, objects merge recursively.
pub fn merge_patch(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(inner) => {
                let slot = target.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(existing) = slot {
                    merge_patch(existing, inner);
                } else {
                    *slot = value.clone();
                }
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
