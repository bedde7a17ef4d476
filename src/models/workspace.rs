use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ticket::{Comment, Priority};

pub const ADMIN_WORKSPACES: &str = "admin_workspaces";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    #[default]
    Active,
    Inactive,
    Archived,
    Planned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    #[serde(alias = "in-progress")]
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(with = "crate::models::timestamp")]
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_type")]
    pub workspace_type: String,
    #[serde(default)]
    pub status: WorkspaceStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub admin_id: String,
    #[serde(default)]
    pub tasks: Vec<WorkspaceTask>,
    /// Percent of tasks done
    #[serde(default)]
    pub progress: u8,
    #[serde(with = "crate::models::timestamp")]
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_type() -> String {
    "project".to_string()
}

impl Workspace {
    pub fn recompute_progress(&mut self) {
        self.progress = progress_of(&self.tasks);
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut WorkspaceTask> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }
}

pub fn progress_of(tasks: &[WorkspaceTask]) -> u8 {
    if tasks.is_empty() {
        return 0;
    }
    let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    ((done as f64 / tasks.len() as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus) -> WorkspaceTask {
        let now = Utc::now();
        WorkspaceTask {
            id: uuid::Uuid::new_v4().to_string(),
            title: "Steuerexport".into(),
            description: String::new(),
            status,
            assigned_to: None,
            due_date: None,
            comments: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn progress_follows_done_tasks() {
        assert_eq!(progress_of(&[]), 0);
        assert_eq!(progress_of(&[task(TaskStatus::Done), task(TaskStatus::Todo), task(TaskStatus::InProgress)]), 33);
        assert_eq!(progress_of(&[task(TaskStatus::Done), task(TaskStatus::Done)]), 100);
    }
}
