use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const JOB_RUNS: &str = "job_runs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub target: String,
    pub error: String,
}

/// Summary of one job execution, stored under `job_runs/{job}_{YYYY-MM-DD}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    pub job: String,
    pub processed: u64,
    pub failed: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub failures: Vec<JobFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobRun {
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.job, self.started_at.format("%Y-%m-%d"))
    }
}
