use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{load_config, output_success};
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Create the documents table and indexes in Postgres")]
    Migrate,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Migrate => {
            let config = load_config()?;
            let url = config
                .database
                .url
                .as_deref()
                .context("DATABASE_URL is required for migrations")?;
            // Opening a Postgres store applies the schema.
            DatabaseManager::open_postgres(&config.database, url)
                .await
                .context("migration failed")?;
            output_success(output_format, "Document store schema is up to date", Some(json!({ "backend": "postgres" })))
        }
    }
}
