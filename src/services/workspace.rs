use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{update_typed, Document, DocumentStore, WriteOp};
use crate::filter::{Filter, SortDirection};
use crate::messages::Msg;
use crate::middleware::AuthUser;
use crate::models::workspace::ADMIN_WORKSPACES;
use crate::models::{Comment, Priority, TaskStatus, Workspace, WorkspaceStatus, WorkspaceTask};
use crate::services::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub workspace_type: Option<String>,
    #[serde(default)]
    pub status: WorkspaceStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspacePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub workspace_type: Option<String>,
    #[serde(default)]
    pub status: Option<WorkspaceStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assigned_to: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

pub struct WorkspaceService {
    store: Arc<dyn DocumentStore>,
}

impl WorkspaceService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, status: Option<WorkspaceStatus>) -> DomainResult<Vec<Value>> {
        let mut filter = Filter::new();
        if let Some(status) = status {
            filter = filter.where_eq("status", serde_json::to_value(status).map_err(crate::database::StoreError::from)?);
        }
        let filter = filter.order_by("updated_at", SortDirection::Desc);
        let docs = self.store.query(ADMIN_WORKSPACES, &filter).await?;
        Ok(docs.iter().map(Document::to_json).collect())
    }

    pub async fn create(&self, auth: &AuthUser, input: WorkspaceInput) -> DomainResult<Document> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(DomainError::required("title"));
        }
        let now = Utc::now();
        let workspace = Workspace {
            title: title.to_string(),
            description: input.description,
            workspace_type: input.workspace_type.unwrap_or_else(|| "project".to_string()),
            status: input.status,
            priority: input.priority,
            assigned_to: input.assigned_to,
            tags: input.tags,
            admin_id: auth.uid.clone(),
            tasks: Vec::new(),
            progress: 0,
            created_at: now,
            updated_at: now,
        };
        let id = Uuid::new_v4().to_string();
        let doc = self
            .store
            .create(ADMIN_WORKSPACES, &id, crate::database::store::to_map(&workspace)?)
            .await?;
        tracing::info!(workspace_id = %id, admin = %auth.uid, "workspace created");
        Ok(doc)
    }

    pub async fn get(&self, id: &str) -> DomainResult<Document> {
        self.store
            .get(ADMIN_WORKSPACES, id)
            .await?
            .ok_or(DomainError::NotFound(Msg::WorkspaceNotFound))
    }

    pub async fn update(&self, id: &str, patch: WorkspacePatch) -> DomainResult<Document> {
        if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
            return Err(DomainError::required("title"));
        }
        self.mutate(id, |workspace| {
            if let Some(title) = &patch.title {
                workspace.title = title.trim().to_string();
            }
            if let Some(description) = &patch.description {
                workspace.description = description.clone();
            }
            if let Some(kind) = &patch.workspace_type {
                workspace.workspace_type = kind.clone();
            }
            if let Some(status) = patch.status {
                workspace.status = status;
            }
            if let Some(priority) = patch.priority {
                workspace.priority = priority;
            }
            if let Some(assigned) = &patch.assigned_to {
                workspace.assigned_to = assigned.clone();
            }
            if let Some(tags) = &patch.tags {
                workspace.tags = tags.clone();
            }
            Ok(())
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> DomainResult<()> {
        let doc = self.get(id).await?;
        self.store
            .commit(vec![WriteOp::delete(ADMIN_WORKSPACES, id, Some(doc.version))])
            .await?;
        tracing::info!(workspace_id = id, "workspace deleted");
        Ok(())
    }

    pub async fn add_task(&self, id: &str, input: TaskInput) -> DomainResult<Document> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::required("title"));
        }
        let now = Utc::now();
        let task = WorkspaceTask {
            id: Uuid::new_v4().to_string(),
            title,
            description: input.description,
            status: input.status,
            assigned_to: input.assigned_to,
            due_date: input.due_date,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.mutate(id, |workspace| {
            workspace.tasks.push(task.clone());
            Ok(())
        })
        .await
    }

    pub async fn update_task(&self, id: &str, task_id: &str, patch: TaskPatch) -> DomainResult<Document> {
        self.mutate(id, |workspace| {
            let task = workspace
                .task_mut(task_id)
                .ok_or(DomainError::NotFound(Msg::TaskNotFound))?;
            if let Some(title) = &patch.title {
                task.title = title.clone();
            }
            if let Some(description) = &patch.description {
                task.description = description.clone();
            }
            if let Some(status) = patch.status {
                task.status = status;
            }
            if let Some(assigned) = &patch.assigned_to {
                task.assigned_to = Some(assigned.clone()).filter(|a| !a.is_empty());
            }
            if patch.due_date.is_some() {
                task.due_date = patch.due_date;
            }
            task.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    pub async fn delete_task(&self, id: &str, task_id: &str) -> DomainResult<Document> {
        self.mutate(id, |workspace| {
            let before = workspace.tasks.len();
            workspace.tasks.retain(|t| t.id != task_id);
            if workspace.tasks.len() == before {
                return Err(DomainError::NotFound(Msg::TaskNotFound));
            }
            Ok(())
        })
        .await
    }

    pub async fn comment_task(&self, auth: &AuthUser, id: &str, task_id: &str, body: &str) -> DomainResult<Document> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DomainError::field("body", Msg::CommentEmpty.text()));
        }
        let mut comment = Comment::new(&auth.uid, body);
        comment.author_name = auth.email.clone();
        self.mutate(id, |workspace| {
            let task = workspace
                .task_mut(task_id)
                .ok_or(DomainError::NotFound(Msg::TaskNotFound))?;
            task.comments.push(comment.clone());
            task.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    /// Version-guarded change; progress follows the tasks.
    async fn mutate<F>(&self, id: &str, mut change: F) -> DomainResult<Document>
    where
        F: FnMut(&mut Workspace) -> DomainResult<()> + Send,
    {
        self.get(id).await?;
        let (_, doc) = update_typed::<Workspace, _, DomainError>(self.store.as_ref(), ADMIN_WORKSPACES, id, |workspace| {
            change(workspace)?;
            workspace.recompute_progress();
            workspace.updated_at = Utc::now();
            Ok(())
        })
        .await?;
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::database::MemoryStore;
    use serde_json::json;

    fn admin() -> AuthUser {
        AuthUser { uid: "root".into(), role: Role::Admin, email: None, companies: vec![] }
    }

    fn task(title: &str) -> TaskInput {
        serde_json::from_value(json!({ "title": title })).unwrap()
    }

    #[tokio::test]
    async fn progress_tracks_task_changes() {
        let service = WorkspaceService::new(Arc::new(MemoryStore::new()));
        let input: WorkspaceInput = serde_json::from_value(json!({ "title": "Launch", "type": "marketing" })).unwrap();
        let ws = service.create(&admin(), input).await.unwrap();

        service.add_task(&ws.id, task("Landingpage")).await.unwrap();
        let doc = service.add_task(&ws.id, task("Newsletter")).await.unwrap();
        let workspace: Workspace = doc.parse().unwrap();
        assert_eq!(workspace.workspace_type, "marketing");
        let first = workspace.tasks[0].id.clone();

        let doc = service
            .update_task(&ws.id, &first, TaskPatch { status: Some(TaskStatus::Done), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(doc.parse::<Workspace>().unwrap().progress, 50);

        let doc = service.comment_task(&admin(), &ws.id, &first, "erledigt").await.unwrap();
        assert_eq!(doc.parse::<Workspace>().unwrap().tasks[0].comments.len(), 1);

        let second = workspace.tasks[1].id.clone();
        let doc = service.delete_task(&ws.id, &second).await.unwrap();
        assert_eq!(doc.parse::<Workspace>().unwrap().progress, 100);

        assert!(matches!(
            service.delete_task(&ws.id, &second).await,
            Err(DomainError::NotFound(Msg::TaskNotFound))
        ));
    }

    #[tokio::test]
    async fn deleted_workspaces_are_gone() {
        let service = WorkspaceService::new(Arc::new(MemoryStore::new()));
        let input: WorkspaceInput = serde_json::from_value(json!({ "title": "Intern" })).unwrap();
        let ws = service.create(&admin(), input).await.unwrap();
        service.delete(&ws.id).await.unwrap();
        assert!(matches!(service.get(&ws.id).await, Err(DomainError::NotFound(Msg::WorkspaceNotFound))));
    }
}
