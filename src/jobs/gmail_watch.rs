use chrono::{Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;

use crate::database::{update_typed, Document, DocumentStore, StoreError};
use crate::filter::Filter;
use crate::integrations::GmailWatchClient;
use crate::models::email::EMAIL_CONFIGS;
use crate::models::{EmailConfig, JobFailure, JobRun};

pub const JOB_NAME: &str = "gmail_watch";

/// Renew Gmail push watches that are missing or expire within `threshold`.
///
/// Renewals run concurrently and fail independently; every failure is
/// recorded on the run summary.
pub async fn renew_watches(
    store: Arc<dyn DocumentStore>,
    client: Arc<dyn GmailWatchClient>,
    topic: &str,
    threshold: Duration,
) -> Result<JobRun, StoreError> {
    let started_at = Utc::now();
    let filter = Filter::new().where_eq("provider", "gmail");
    let docs = store.query(EMAIL_CONFIGS, &filter).await?;

    let mut run = JobRun {
        job: JOB_NAME.to_string(),
        processed: 0,
        failed: 0,
        skipped: 0,
        failures: Vec::new(),
        started_at,
        finished_at: started_at,
    };

    let mut due = Vec::new();
    for doc in docs {
        match doc.parse::<EmailConfig>() {
            Ok(config) if config.needs_watch_renewal(started_at, threshold) => due.push((doc, config)),
            Ok(_) => run.skipped += 1,
            Err(e) => {
                tracing::warn!(config_id = %doc.id, "unreadable email config: {}", e);
                run.failed += 1;
                run.failures.push(JobFailure { target: doc.id.clone(), error: e.to_string() });
            }
        }
    }
    tracing::info!(due = due.len(), skipped = run.skipped, "gmail watch renewal started");

    let results = join_all(
        due.iter()
            .map(|(doc, config)| renew_one(store.as_ref(), client.as_ref(), topic, doc, config)),
    )
    .await;

    for ((doc, config), result) in due.iter().zip(results) {
        match result {
            Ok(()) => run.processed += 1,
            Err(error) => {
                tracing::error!(config_id = %doc.id, email = %config.email, "gmail watch renewal failed: {}", error);
                run.failed += 1;
                run.failures.push(JobFailure { target: doc.id.clone(), error });
            }
        }
    }

    run.finished_at = Utc::now();
    super::record_run(store.as_ref(), &run).await?;
    tracing::info!(renewed = run.processed, failed = run.failed, "gmail watch renewal finished");
    Ok(run)
}

async fn renew_one(
    store: &dyn DocumentStore,
    client: &dyn GmailWatchClient,
    topic: &str,
    doc: &Document,
    config: &EmailConfig,
) -> Result<(), String> {
    let watch = client.watch(config, topic).await.map_err(|e| e.to_string())?;
    update_typed::<EmailConfig, _, StoreError>(store, EMAIL_CONFIGS, &doc.id, |stored| {
        stored.history_id = Some(watch.history_id.clone());
        stored.watch_expiration = Some(watch.expiration);
        stored.updated_at = Utc::now();
        Ok(())
    })
    .await
    .map_err(|e| e.to_string())?;
    Ok(())
}
