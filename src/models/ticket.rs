use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const ADMIN_TICKETS: &str = "admin_tickets";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    #[serde(alias = "in-progress")]
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, TicketStatus::Open | TicketStatus::InProgress)
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub body: String,
    /// Visible to admins only
    #[serde(default)]
    pub internal: bool,
    #[serde(with = "crate::models::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.into(),
            author_name: None,
            body: body.into(),
            internal: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    pub reporter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::models::timestamp")]
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Moves the ticket to `status`, stamping `resolved_at` on the first close.
    pub fn set_status(&mut self, status: TicketStatus, now: DateTime<Utc>) {
        if status.is_closed() {
            if self.resolved_at.is_none() {
                self.resolved_at = Some(now);
            }
        } else {
            self.resolved_at = None;
        }
        self.status = status;
    }
}

/// Time window for ticket analytics; unknown values fall back to 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyticsRange {
    Day,
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl AnalyticsRange {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("1d") => AnalyticsRange::Day,
            Some("7d") => AnalyticsRange::Week,
            Some("90d") => AnalyticsRange::Quarter,
            Some("1y") => AnalyticsRange::Year,
            _ => AnalyticsRange::Month,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsRange::Day => "1d",
            AnalyticsRange::Week => "7d",
            AnalyticsRange::Month => "30d",
            AnalyticsRange::Quarter => "90d",
            AnalyticsRange::Year => "1y",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            AnalyticsRange::Day => Duration::days(1),
            AnalyticsRange::Week => Duration::days(7),
            AnalyticsRange::Month => Duration::days(30),
            AnalyticsRange::Quarter => Duration::days(90),
            AnalyticsRange::Year => Duration::days(365),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketAnalytics {
    pub range: String,
    pub total: u64,
    pub open: u64,
    pub closed: u64,
    pub average_resolution_hours: f64,
    /// Percent of tickets closed, one decimal
    pub resolution_rate: f64,
    pub by_category: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
}

impl TicketAnalytics {
    /// Aggregate tickets created within `range` before `now`.
    pub fn compute(tickets: &[Ticket], range: AnalyticsRange, now: DateTime<Utc>) -> Self {
        let since = now - range.duration();
        let in_range: Vec<&Ticket> = tickets.iter().filter(|t| t.created_at >= since).collect();

        let total = in_range.len() as u64;
        let open = in_range.iter().filter(|t| t.status.is_open()).count() as u64;
        let closed = total - open;

        let resolution_hours: Vec<f64> = in_range
            .iter()
            .filter(|t| t.status.is_closed())
            .filter_map(|t| t.resolved_at.map(|r| (r - t.created_at).num_seconds() as f64 / 3600.0))
            .collect();
        let average_resolution_hours = if resolution_hours.is_empty() {
            0.0
        } else {
            round1(resolution_hours.iter().sum::<f64>() / resolution_hours.len() as f64)
        };

        let resolution_rate = if total == 0 {
            0.0
        } else {
            round1(closed as f64 / total as f64 * 100.0)
        };

        let mut by_category = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        for ticket in &in_range {
            let category = ticket
                .category
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "other".to_string());
            *by_category.entry(category).or_insert(0) += 1;
            let priority = ticket.priority.unwrap_or_default().as_str().to_string();
            *by_priority.entry(priority).or_insert(0) += 1;
        }

        Self {
            range: range.as_str().to_string(),
            total,
            open,
            closed,
            average_resolution_hours,
            resolution_rate,
            by_category,
            by_priority,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
