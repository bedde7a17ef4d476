use anyhow::Context;
use chrono::Duration;
use clap::Subcommand;

use crate::cli::utils::{load_config, output_job_run};
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::integrations::{http_client, HttpGmailWatchClient};
use crate::jobs;

#[derive(Subcommand)]
pub enum JobsCommands {
    #[command(about = "Recalculate document usage for every company")]
    Usage,

    #[command(about = "Renew Gmail push watches that are missing or about to expire")]
    GmailWatch {
        #[arg(long, help = "Renew watches expiring within this many hours (defaults to GMAIL_RENEW_BEFORE_HOURS)")]
        within_hours: Option<i64>,
    },
}

pub async fn handle(cmd: JobsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config()?;
    let store = DatabaseManager::open(&config.database)
        .await
        .context("failed to open document store")?;

    let run = match cmd {
        JobsCommands::Usage => jobs::run_usage(store.as_ref()).await.context("usage calculation failed")?,
        JobsCommands::GmailWatch { within_hours } => {
            let client = std::sync::Arc::new(HttpGmailWatchClient::new(http_client()?));
            let hours = within_hours.unwrap_or(config.gmail.renew_before_hours);
            jobs::renew_watches(store, client, &config.gmail.pubsub_topic, Duration::hours(hours))
                .await
                .context("gmail watch renewal failed")?
        }
    };
    output_job_run(output_format, &run)
}
