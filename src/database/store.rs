use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::Filter;
use crate::models::timestamp;

/// Attempts made by `update_with` before giving up on a contended document.
pub const MAX_UPDATE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    #[error("Version conflict on {collection}/{id}: expected {expected}")]
    VersionConflict { collection: String, id: String, expected: i64 },

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Document body must be a JSON object")]
    NotAnObject,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. } | StoreError::AlreadyExists { .. })
    }
}

/// A stored JSON document with its concurrency metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub data: Map<String, Value>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Deserialize the body into a typed model.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    /// Body merged with `id`, `version` and timestamps, as returned by the API.
    pub fn to_json(&self) -> Value {
        let mut out = self.data.clone();
        out.insert("id".to_string(), Value::String(self.id.clone()));
        out.insert("version".to_string(), Value::from(self.version));
        out.entry("created_at".to_string())
            .or_insert_with(|| Value::String(timestamp::format(&self.created_at)));
        out.insert("updated_at".to_string(), Value::String(timestamp::format(&self.updated_at)));
        Value::Object(out)
    }
}

/// One write inside an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert; fails with `AlreadyExists` if the id is taken.
    Create { collection: String, id: String, data: Map<String, Value> },
    /// Insert or replace unconditionally.
    Set { collection: String, id: String, data: Map<String, Value> },
    /// Replace an existing document, optionally guarded by its version.
    Update { collection: String, id: String, data: Map<String, Value>, expected_version: Option<i64> },
    /// Remove a document, optionally guarded by its version. Missing documents are ignored
    /// unless a version is expected.
    Delete { collection: String, id: String, expected_version: Option<i64> },
}

impl WriteOp {
    pub fn create<T: Serialize>(collection: impl Into<String>, id: impl Into<String>, body: &T) -> Result<Self, StoreError> {
        Ok(WriteOp::Create { collection: collection.into(), id: id.into(), data: to_map(body)? })
    }

    pub fn set<T: Serialize>(collection: impl Into<String>, id: impl Into<String>, body: &T) -> Result<Self, StoreError> {
        Ok(WriteOp::Set { collection: collection.into(), id: id.into(), data: to_map(body)? })
    }

    pub fn update<T: Serialize>(
        collection: impl Into<String>,
        id: impl Into<String>,
        body: &T,
        expected_version: Option<i64>,
    ) -> Result<Self, StoreError> {
        Ok(WriteOp::Update { collection: collection.into(), id: id.into(), data: to_map(body)?, expected_version })
    }

    pub fn delete(collection: impl Into<String>, id: impl Into<String>, expected_version: Option<i64>) -> Self {
        WriteOp::Delete { collection: collection.into(), id: id.into(), expected_version }
    }

    pub fn target(&self) -> (&str, &str) {
        match self {
            WriteOp::Create { collection, id, .. }
            | WriteOp::Set { collection, id, .. }
            | WriteOp::Update { collection, id, .. }
            | WriteOp::Delete { collection, id, .. } => (collection, id),
        }
    }
}

pub fn to_map<T: Serialize>(body: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// Collection paths alternate collection and document segments, e.g. `companies/c1/invoices`.
pub fn validate_collection(collection: &str) -> Result<(), StoreError> {
    let segments: Vec<&str> = collection.split('/').collect();
    if segments.len() % 2 == 0 || segments.iter().any(|s| !is_valid_segment(s)) {
        return Err(StoreError::InvalidPath(collection.to_string()));
    }
    Ok(())
}

pub fn validate_id(id: &str) -> Result<(), StoreError> {
    if !is_valid_segment(id) {
        return Err(StoreError::InvalidPath(id.to_string()));
    }
    Ok(())
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= 128
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@' | ':'))
        && segment != "."
        && segment != ".."
}

/// Persistence seam: every service talks to documents through this trait.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Apply all writes atomically; any failed precondition aborts the whole batch.
    async fn commit(&self, writes: Vec<WriteOp>) -> Result<Vec<Document>, StoreError>;

    /// Remove every document whose collection equals `prefix` or starts with `prefix/`.
    async fn delete_tree(&self, prefix: &str) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;

    async fn get_required(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        self.get(collection, id).await?.ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    async fn create(&self, collection: &str, id: &str, data: Map<String, Value>) -> Result<Document, StoreError> {
        let mut out = self
            .commit(vec![WriteOp::Create { collection: collection.to_string(), id: id.to_string(), data }])
            .await?;
        out.pop().ok_or(StoreError::NotAnObject)
    }

    async fn set(&self, collection: &str, id: &str, data: Map<String, Value>) -> Result<Document, StoreError> {
        let mut out = self
            .commit(vec![WriteOp::Set { collection: collection.to_string(), id: id.to_string(), data }])
            .await?;
        out.pop().ok_or(StoreError::NotAnObject)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Delete { collection: collection.to_string(), id: id.to_string(), expected_version: None }])
            .await?;
        Ok(())
    }
}

/// Read-modify-write with optimistic concurrency, retried on version conflicts.
///
/// `mutate` may run more than once; it must derive its result only from the
/// document it is handed.
pub async fn update_with<F, E>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    mut mutate: F,
) -> Result<Document, E>
where
    F: FnMut(&mut Map<String, Value>) -> Result<(), E> + Send,
    E: From<StoreError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let current = store.get_required(collection, id).await?;
        let mut data = current.data.clone();
        mutate(&mut data)?;

        let op = WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            expected_version: Some(current.version),
        };
        match store.commit(vec![op]).await {
            Ok(mut docs) => return docs.pop().ok_or_else(|| StoreError::NotAnObject.into()),
            Err(StoreError::VersionConflict { .. }) if attempt < MAX_UPDATE_ATTEMPTS => {
                tracing::debug!(collection, id, attempt, "version conflict, retrying update");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Typed variant of `update_with` for documents backed by a serde model.
pub async fn update_typed<T, F, E>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    mut mutate: F,
) -> Result<(T, Document), E>
where
    T: DeserializeOwned + Serialize + Send,
    F: FnMut(&mut T) -> Result<(), E> + Send,
    E: From<StoreError>,
{
    let doc = update_with(store, collection, id, |data| -> Result<(), E> {
        let mut model: T = serde_json::from_value(Value::Object(data.clone()))
            .map_err(|e| E::from(StoreError::from(e)))?;
        mutate(&mut model)?;
        *data = to_map(&model).map_err(E::from)?;
        Ok(())
    })
    .await?;
    let model = doc.parse::<T>()?;
    Ok((model, doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_paths_must_alternate() {
        assert!(validate_collection("companies").is_ok());
        assert!(validate_collection("companies/c1/invoices").is_ok());
        assert!(validate_collection("companies/c1").is_err());
        assert!(validate_collection("companies//invoices").is_err());
        assert!(validate_collection("companies/../invoices").is_err());
        assert!(validate_id("c1_RE-0001").is_ok());
        assert!(validate_id("a/b").is_err());
    }

    #[derive(Debug)]
    enum CounterError {
        Store(StoreError),
        TooHigh,
    }

    impl From<StoreError> for CounterError {
        fn from(e: StoreError) -> Self {
            CounterError::Store(e)
        }
    }

    #[derive(Debug, serde::Deserialize, Serialize)]
    struct Counter {
        value: u32,
    }

    #[tokio::test]
    async fn update_typed_propagates_caller_errors() {
        let store = crate::database::MemoryStore::new();
        store
            .create("counters", "c1", to_map(&Counter { value: 1 }).unwrap())
            .await
            .unwrap();

        let (counter, doc) = update_typed::<Counter, _, CounterError>(&store, "counters", "c1", |c| {
            c.value += 1;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(counter.value, 2);
        assert_eq!(doc.version, 2);

        let rejected = update_typed::<Counter, _, CounterError>(&store, "counters", "c1", |_| Err(CounterError::TooHigh)).await;
        assert!(matches!(rejected, Err(CounterError::TooHigh)));

        let missing = update_typed::<Counter, _, CounterError>(&store, "counters", "nope", |_| Ok(())).await;
        assert!(matches!(missing, Err(CounterError::Store(StoreError::NotFound { .. }))));
    }
}
