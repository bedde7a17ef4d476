use axum::extract::State;
use chrono::Duration;

use crate::error::ApiError;
use crate::jobs;
use crate::messages::Msg;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::JobRun;
use crate::state::AppState;

fn job_failed(job: &str, e: impl std::fmt::Display) -> ApiError {
    tracing::error!(job, "Manual job run failed: {}", e);
    ApiError::internal_server_error(Msg::InternalError.text())
}

/// POST /api/admin/jobs/usage
pub async fn run_usage(State(state): State<AppState>) -> ApiResult<JobRun> {
    let run = jobs::run_usage(state.store.as_ref())
        .await
        .map_err(|e| job_failed(jobs::usage::JOB_NAME, e))?;
    Ok(ApiResponse::success(run))
}

/// POST /api/admin/jobs/gmail-watch
pub async fn run_gmail_watch(State(state): State<AppState>) -> ApiResult<JobRun> {
    let gmail = &state.config.gmail;
    let run = jobs::renew_watches(
        state.store.clone(),
        state.gmail.clone(),
        &gmail.pubsub_topic,
        Duration::hours(gmail.renew_before_hours),
    )
    .await
    .map_err(|e| job_failed(jobs::gmail_watch::JOB_NAME, e))?;
    Ok(ApiResponse::success(run))
}
