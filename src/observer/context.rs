use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::database::{Document, DocumentStore, WriteOp};
use crate::observer::error::{ObserverError, ObserverWarning};
use crate::observer::traits::{ObserverRing, Operation};

/// Context flowing through the observer pipeline for one record write
pub struct ObserverContext {
    pub operation: Operation,
    pub company_id: String,
    /// Short collection name, e.g. `customers`
    pub collection: String,
    /// Uid of the authenticated caller
    pub actor: String,
    pub store: Arc<dyn DocumentStore>,

    pub record_id: String,
    /// Body as submitted by the client
    pub input: Map<String, Value>,
    /// Stored document, loaded in ring 0 for update/merge/delete
    pub existing: Option<Document>,
    /// Body that ring 5 will write
    pub output: Map<String, Value>,
    /// Additional writes committed atomically with the record
    pub extra_writes: Vec<WriteOp>,

    /// Written document (deleted document for deletes), populated by ring 5
    pub result: Option<Document>,

    // Type-safe metadata storage for cross-observer communication
    metadata: HashMap<TypeId, Box<dyn Any + Send + Sync>>,

    pub start_time: Instant,
    pub current_ring: Option<ObserverRing>,
    pub errors: Vec<ObserverError>,
    pub warnings: Vec<ObserverWarning>,
}

impl ObserverContext {
    pub fn new(
        operation: Operation,
        store: Arc<dyn DocumentStore>,
        company_id: impl Into<String>,
        collection: impl Into<String>,
        record_id: impl Into<String>,
        actor: impl Into<String>,
        input: Map<String, Value>,
    ) -> Self {
        Self {
            operation,
            company_id: company_id.into(),
            collection: collection.into(),
            actor: actor.into(),
            store,
            record_id: record_id.into(),
            input,
            existing: None,
            output: Map::new(),
            extra_writes: Vec::new(),
            result: None,
            metadata: HashMap::new(),
            start_time: Instant::now(),
            current_ring: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Full store path of the target collection
    pub fn collection_path(&self) -> String {
        format!("companies/{}/{}", self.company_id, self.collection)
    }

    pub fn set_metadata<T: Send + Sync + 'static>(&mut self, data: T) {
        self.metadata.insert(TypeId::of::<T>(), Box::new(data));
    }

    pub fn get_metadata<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.metadata
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn add_warning(&mut self, warning: ObserverWarning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn execution_time(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl std::fmt::Debug for ObserverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverContext")
            .field("operation", &self.operation)
            .field("company_id", &self.company_id)
            .field("collection", &self.collection)
            .field("record_id", &self.record_id)
            .field("current_ring", &self.current_ring)
            .field("errors", &self.errors.len())
            .finish()
    }
}
