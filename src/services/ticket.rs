use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{update_typed, Document, DocumentStore};
use crate::filter::{Filter, SortDirection};
use crate::messages::Msg;
use crate::middleware::AuthUser;
use crate::models::ticket::ADMIN_TICKETS;
use crate::models::{AnalyticsRange, Comment, Priority, Ticket, TicketAnalytics, TicketStatus};
use crate::services::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Deserialize)]
pub struct TicketInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPatch {
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentInput {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub internal: bool,
}

pub struct TicketService {
    store: Arc<dyn DocumentStore>,
}

impl TicketService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, auth: &AuthUser, input: TicketInput) -> DomainResult<Document> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(DomainError::required("title"));
        }
        let now = Utc::now();
        let ticket = Ticket {
            title: title.to_string(),
            description: input.description,
            status: TicketStatus::Open,
            priority: input.priority,
            category: input.category.filter(|c| !c.trim().is_empty()),
            company_id: input.company_id,
            reporter_id: auth.uid.clone(),
            reporter_email: auth.email.clone(),
            assignee: input.assignee,
            tags: input.tags,
            comments: Vec::new(),
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        let id = Uuid::new_v4().to_string();
        let doc = self
            .store
            .create(ADMIN_TICKETS, &id, crate::database::store::to_map(&ticket)?)
            .await?;
        tracing::info!(ticket_id = %id, company_id = ?ticket.company_id, reporter = %auth.uid, "ticket opened");
        Ok(doc)
    }

    pub async fn list(&self, status: Option<TicketStatus>, priority: Option<Priority>) -> DomainResult<Vec<Value>> {
        let mut filter = Filter::new();
        if let Some(status) = status {
            filter = filter.where_eq("status", serde_json::to_value(status).map_err(crate::database::StoreError::from)?);
        }
        if let Some(priority) = priority {
            filter = filter.where_eq("priority", priority.as_str());
        }
        self.query(filter).await
    }

    /// Tickets of one company, for its members. Internal comments are hidden.
    pub async fn list_for_company(&self, company_id: &str) -> DomainResult<Vec<Value>> {
        let filter = Filter::new().where_eq("company_id", company_id);
        let mut tickets = self.query(filter).await?;
        for ticket in &mut tickets {
            if let Some(Value::Array(comments)) = ticket.get_mut("comments") {
                comments.retain(|c| !c.get("internal").and_then(Value::as_bool).unwrap_or(false));
            }
        }
        Ok(tickets)
    }

    async fn query(&self, filter: Filter) -> DomainResult<Vec<Value>> {
        let filter = filter.order_by("created_at", SortDirection::Desc);
        let docs = self.store.query(ADMIN_TICKETS, &filter).await?;
        Ok(docs.iter().map(Document::to_json).collect())
    }

    pub async fn get(&self, id: &str) -> DomainResult<Document> {
        self.store
            .get(ADMIN_TICKETS, id)
            .await?
            .ok_or(DomainError::NotFound(Msg::TicketNotFound))
    }

    pub async fn update(&self, id: &str, patch: TicketPatch) -> DomainResult<Document> {
        self.get(id).await?;
        let (_, doc) = update_typed::<Ticket, _, DomainError>(self.store.as_ref(), ADMIN_TICKETS, id, |ticket| {
            let now = Utc::now();
            if let Some(status) = patch.status {
                ticket.set_status(status, now);
            }
            if let Some(priority) = patch.priority {
                ticket.priority = Some(priority);
            }
            if let Some(assignee) = &patch.assignee {
                ticket.assignee = Some(assignee.clone()).filter(|a| !a.is_empty());
            }
            if let Some(category) = &patch.category {
                ticket.category = Some(category.clone()).filter(|c| !c.is_empty());
            }
            if let Some(tags) = &patch.tags {
                ticket.tags = tags.clone();
            }
            ticket.updated_at = now;
            Ok(())
        })
        .await?;
        tracing::info!(ticket_id = id, status = ?patch.status, "ticket updated");
        Ok(doc)
    }

    /// Appends under the document's version guard, so concurrent comments are not lost.
    pub async fn add_comment(&self, auth: &AuthUser, id: &str, input: CommentInput) -> DomainResult<Document> {
        let body = input.body.trim().to_string();
        if body.is_empty() {
            return Err(DomainError::field("body", Msg::CommentEmpty.text()));
        }
        self.get(id).await?;

        let mut comment = Comment::new(&auth.uid, body);
        comment.author_name = auth.email.clone();
        comment.internal = input.internal;

        let (_, doc) = update_typed::<Ticket, _, DomainError>(self.store.as_ref(), ADMIN_TICKETS, id, |ticket| {
            ticket.comments.push(comment.clone());
            ticket.updated_at = Utc::now();
            Ok(())
        })
        .await?;
        Ok(doc)
    }

    pub async fn analytics(&self, range: AnalyticsRange) -> DomainResult<TicketAnalytics> {
        let docs = self.store.query(ADMIN_TICKETS, &Filter::new()).await?;
        let tickets = docs
            .iter()
            .map(|d| d.parse::<Ticket>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TicketAnalytics::compute(&tickets, range, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::MemoryStore;
    use serde_json::json;

    fn admin() -> AuthUser {
        AuthUser { uid: "root".into(), role: Role::Admin, email: Some("support@taskilo.de".into()), companies: vec![] }
    }

    fn input(title: &str, company: &str) -> TicketInput {
        serde_json::from_value(json!({ "title": title, "company_id": company, "category": "billing" })).unwrap()
    }

    #[tokio::test]
    async fn resolving_stamps_and_reopening_clears() {
        let service = TicketService::new(Arc::new(MemoryStore::new()));
        let doc = service.create(&admin(), input("Rechnung fehlt", "c1")).await.unwrap();

        let resolved = service
            .update(&doc.id, TicketPatch { status: Some(TicketStatus::Resolved), ..Default::default() })
            .await
            .unwrap();
        assert!(resolved.parse::<Ticket>().unwrap().resolved_at.is_some());

        let reopened = service
            .update(&doc.id, TicketPatch { status: Some(TicketStatus::InProgress), ..Default::default() })
            .await
            .unwrap();
        assert!(reopened.parse::<Ticket>().unwrap().resolved_at.is_none());
    }

    #[tokio::test]
    async fn comments_append_and_internal_ones_stay_private() {
        let service = TicketService::new(Arc::new(MemoryStore::new()));
        let doc = service.create(&admin(), input("Login", "c1")).await.unwrap();
        service.add_comment(&admin(), &doc.id, CommentInput { body: "Antwort".into(), internal: false }).await.unwrap();
        let doc2 = service.add_comment(&admin(), &doc.id, CommentInput { body: "Notiz".into(), internal: true }).await.unwrap();
        assert_eq!(doc2.parse::<Ticket>().unwrap().comments.len(), 2);

        let visible = service.list_for_company("c1").await.unwrap();
        assert_eq!(visible[0]["comments"].as_array().unwrap().len(), 1);

        assert!(matches!(
            service.add_comment(&admin(), &doc.id, CommentInput { body: "  ".into(), internal: false }).await,
            Err(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn filters_by_status_and_counts() {
        let service = TicketService::new(Arc::new(MemoryStore::new()));
        let a = service.create(&admin(), input("A", "c1")).await.unwrap();
        service.create(&admin(), input("B", "c2")).await.unwrap();
        service
            .update(&a.id, TicketPatch { status: Some(TicketStatus::Closed), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(service.list(Some(TicketStatus::Open), None).await.unwrap().len(), 1);
        assert_eq!(service.list(None, Some(Priority::Medium)).await.unwrap().len(), 0);

        let analytics = service.analytics(AnalyticsRange::parse(None)).await.unwrap();
        assert_eq!(analytics.total, 2);
        assert_eq!(analytics.closed, 1);
        assert_eq!(analytics.resolution_rate, 50.0);
        assert_eq!(analytics.by_category["billing"], 2);
        assert_eq!(analytics.by_priority["medium"], 2);
    }
}
