use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::store::{validate_collection, validate_id, Document, DocumentStore, StoreError, WriteOp};
use crate::filter::Filter;

type Key = (String, String);

/// Process-local store used for development without Postgres and for tests.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<Key, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        validate_id(id)?;
        let docs = self.docs.read().await;
        Ok(docs.get(&(collection.to_string(), id.to_string())).cloned())
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let docs = self.docs.read().await;
        let mut matched: Vec<&Document> = docs
            .range((collection.to_string(), String::new())..)
            .take_while(|((c, _), _)| c == collection)
            .map(|(_, doc)| doc)
            .filter(|doc| filter.matches(&doc.data))
            .collect();
        matched.sort_by(|a, b| filter.compare((&a.id, &a.data), (&b.id, &b.data)));

        let offset = filter.offset_value();
        let limit = filter.limit_value().unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        validate_collection(collection)?;
        let docs = self.docs.read().await;
        let count = docs
            .range((collection.to_string(), String::new())..)
            .take_while(|((c, _), _)| c == collection)
            .filter(|(_, doc)| filter.matches(&doc.data))
            .count();
        Ok(count as u64)
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> Result<Vec<Document>, StoreError> {
        for op in &writes {
            let (collection, id) = op.target();
            validate_collection(collection)?;
            validate_id(id)?;
        }

        let mut docs = self.docs.write().await;
        // Apply to a scratch copy of the touched keys so a failed precondition leaves nothing behind.
        let mut staged: BTreeMap<Key, Option<Document>> = BTreeMap::new();
        let mut results = Vec::new();
        let now = Utc::now();

        for op in writes {
            let key: Key = {
                let (c, i) = op.target();
                (c.to_string(), i.to_string())
            };
            let current = match staged.get(&key) {
                Some(v) => v.clone(),
                None => docs.get(&key).cloned(),
            };

            match op {
                WriteOp::Create { collection, id, data } => {
                    if current.is_some() {
                        return Err(StoreError::AlreadyExists { collection, id });
                    }
                    let doc = Document { collection, id, data, version: 1, created_at: now, updated_at: now };
                    results.push(doc.clone());
                    staged.insert(key, Some(doc));
                }
                WriteOp::Set { collection, id, data } => {
                    let doc = match current {
                        Some(existing) => Document {
                            data,
                            version: existing.version + 1,
                            updated_at: now,
                            ..existing
                        },
                        None => Document { collection, id, data, version: 1, created_at: now, updated_at: now },
                    };
                    results.push(doc.clone());
                    staged.insert(key, Some(doc));
                }
                WriteOp::Update { collection, id, data, expected_version } => {
                    let Some(existing) = current else {
                        return Err(StoreError::NotFound { collection, id });
                    };
                    if let Some(expected) = expected_version {
                        if existing.version != expected {
                            return Err(StoreError::VersionConflict { collection, id, expected });
                        }
                    }
                    let doc = Document { data, version: existing.version + 1, updated_at: now, ..existing };
                    results.push(doc.clone());
                    staged.insert(key, Some(doc));
                }
                WriteOp::Delete { collection, id, expected_version } => {
                    if let Some(expected) = expected_version {
                        match &current {
                            None => return Err(StoreError::NotFound { collection, id }),
                            Some(existing) if existing.version != expected => {
                                return Err(StoreError::VersionConflict { collection, id, expected });
                            }
                            _ => {}
                        }
                    }
                    staged.insert(key, None);
                }
            }
        }

        for (key, value) in staged {
            match value {
                Some(doc) => {
                    docs.insert(key, doc);
                }
                None => {
                    docs.remove(&key);
                }
            }
        }
        Ok(results)
    }

    async fn delete_tree(&self, prefix: &str) -> Result<u64, StoreError> {
        let nested = format!("{}/", prefix);
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|(collection, _), _| collection != prefix && !collection.starts_with(&nested));
        Ok((before - docs.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
