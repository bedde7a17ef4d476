// Ring 0: Data Preparation - only known company collections are reachable through the data API;
// runs before the loader so unknown names never touch the store
use async_trait::async_trait;

use crate::messages::Msg;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

pub const DATA_COLLECTIONS: [&str; 9] = [
    "customers",
    "suppliers",
    "contacts",
    "expenses",
    "projects",
    "time_entries",
    "inventory",
    "employees",
    "reminders",
];

pub fn is_allowed_collection(collection: &str) -> bool {
    DATA_COLLECTIONS.contains(&collection)
}

#[derive(Default)]
pub struct CollectionAllowlistObserver;

#[async_trait]
impl Observer for CollectionAllowlistObserver {
    fn name(&self) -> &'static str {
        "CollectionAllowlistObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::DataPreparation
    }

    fn priority(&self) -> u8 {
        0
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError> {
        if is_allowed_collection(&ctx.collection) {
            Ok(())
        } else {
            Err(ObserverError::field(
                Msg::UnknownCollection.text(),
                "collection",
                Msg::UnknownCollection.text(),
            ))
        }
    }
}
