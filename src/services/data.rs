use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{Document, DocumentStore};
use crate::filter::{Filter, SortDirection};
use crate::messages::Msg;
use crate::middleware::AuthUser;
use crate::observer::implementations::is_allowed_collection;
use crate::observer::{ObserverContext, ObserverPipeline, Operation};
use crate::services::error::{DomainError, DomainResult};

/// Generic company-scoped records. Writes go through the observer pipeline.
pub struct DataService {
    store: Arc<dyn DocumentStore>,
    pipeline: Arc<ObserverPipeline>,
}

impl DataService {
    pub fn new(store: Arc<dyn DocumentStore>, pipeline: Arc<ObserverPipeline>) -> Self {
        Self { store, pipeline }
    }

    fn path(company_id: &str, collection: &str) -> DomainResult<String> {
        if !is_allowed_collection(collection) {
            return Err(DomainError::BadRequest(Msg::UnknownCollection));
        }
        Ok(format!("companies/{}/{}", company_id, collection))
    }

    /// Newest first unless the filter orders otherwise.
    pub async fn list(&self, company_id: &str, collection: &str, filter: Filter) -> DomainResult<Vec<Value>> {
        let path = Self::path(company_id, collection)?;
        let filter = filter.order_by("created_at", SortDirection::Desc);
        let docs = self.store.query(&path, &filter).await?;
        Ok(docs.iter().map(Document::to_json).collect())
    }

    pub async fn find(&self, company_id: &str, collection: &str, filter: Filter) -> DomainResult<Vec<Value>> {
        let path = Self::path(company_id, collection)?;
        let docs = self.store.query(&path, &filter).await?;
        Ok(docs.iter().map(Document::to_json).collect())
    }

    pub async fn get(&self, company_id: &str, collection: &str, id: &str) -> DomainResult<Value> {
        let path = Self::path(company_id, collection)?;
        self.store
            .get(&path, id)
            .await?
            .map(|doc| doc.to_json())
            .ok_or(DomainError::NotFound(Msg::RecordNotFound))
    }

    pub async fn create(&self, auth: &AuthUser, company_id: &str, collection: &str, body: Map<String, Value>) -> DomainResult<Document> {
        let id = Uuid::new_v4().to_string();
        self.run(Operation::Create, auth, company_id, collection, &id, body).await
    }

    pub async fn replace(
        &self,
        auth: &AuthUser,
        company_id: &str,
        collection: &str,
        id: &str,
        body: Map<String, Value>,
    ) -> DomainResult<Document> {
        self.run(Operation::Update, auth, company_id, collection, id, body).await
    }

    pub async fn merge(
        &self,
        auth: &AuthUser,
        company_id: &str,
        collection: &str,
        id: &str,
        body: Map<String, Value>,
    ) -> DomainResult<Document> {
        self.run(Operation::Merge, auth, company_id, collection, id, body).await
    }

    pub async fn delete(&self, auth: &AuthUser, company_id: &str, collection: &str, id: &str) -> DomainResult<Document> {
        self.run(Operation::Delete, auth, company_id, collection, id, Map::new()).await
    }

    async fn run(
        &self,
        operation: Operation,
        auth: &AuthUser,
        company_id: &str,
        collection: &str,
        id: &str,
        body: Map<String, Value>,
    ) -> DomainResult<Document> {
        let ctx = ObserverContext::new(operation, self.store.clone(), company_id, collection, id, &auth.uid, body);
        Ok(self.pipeline.execute(ctx).await?)
    }
}
