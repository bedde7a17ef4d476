use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;

use super::memory::MemoryStore;
use super::postgres::PostgresStore;
use super::store::{DocumentStore, StoreError};
use crate::config::DatabaseConfig;

/// Errors from opening the configured store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Builds the document store selected by configuration.
pub struct DatabaseManager;

impl DatabaseManager {
    /// Postgres when a URL is configured, otherwise the in-memory store.
    pub async fn open(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, DatabaseError> {
        match &config.url {
            Some(url) => Ok(Arc::new(Self::open_postgres(config, url).await?)),
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory document store");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }

    pub async fn open_postgres(config: &DatabaseConfig, url: &str) -> Result<PostgresStore, DatabaseError> {
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            host = parsed.host_str().unwrap_or("localhost"),
            database = parsed.path().trim_start_matches('/'),
            max_connections = config.max_connections,
            "connected to postgres"
        );

        let store = PostgresStore::new(pool);
        store
            .migrate()
            .await
            .map_err(|e: StoreError| DatabaseError::MigrationError(e.to_string()))?;
        Ok(store)
    }
}
