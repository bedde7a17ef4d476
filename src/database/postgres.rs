use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::QueryAs;
use sqlx::types::Json;
use sqlx::{Executor, Postgres, Transaction};

use super::store::{validate_collection, validate_id, Document, DocumentStore, StoreError, WriteOp};
use crate::filter::{Filter, SqlParam};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data JSONB NOT NULL,
    version BIGINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (collection, id)
);
CREATE INDEX IF NOT EXISTS documents_collection_prefix_idx ON documents (collection text_pattern_ops);
CREATE INDEX IF NOT EXISTS documents_data_gin_idx ON documents USING GIN (data jsonb_path_ops);
"#;

const COLUMNS: &str = "collection, id, data, version, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct DocumentRow {
    collection: String,
    id: String,
    data: Json<Value>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let data = match row.data.0 {
            Value::Object(map) => map,
            _ => return Err(StoreError::NotAnObject),
        };
        Ok(Document {
            collection: row.collection,
            id: row.id,
            data,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// JSONB document table in Postgres.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the documents table and its indexes if missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        self.pool.execute(SCHEMA).await?;
        tracing::info!("documents schema is up to date");
        Ok(())
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, op: WriteOp) -> Result<Option<Document>, StoreError> {
        match op {
            WriteOp::Create { collection, id, data } => {
                let row: Option<DocumentRow> = sqlx::query_as(&format!(
                    "INSERT INTO documents (collection, id, data, version) VALUES ($1, $2, $3, 1) \
                     ON CONFLICT (collection, id) DO NOTHING RETURNING {}",
                    COLUMNS
                ))
                .bind(&collection)
                .bind(&id)
                .bind(Json(Value::Object(data)))
                .fetch_optional(&mut **tx)
                .await?;
                match row {
                    Some(row) => Ok(Some(row.try_into()?)),
                    None => Err(StoreError::AlreadyExists { collection, id }),
                }
            }
            WriteOp::Set { collection, id, data } => {
                let row: DocumentRow = sqlx::query_as(&format!(
                    "INSERT INTO documents (collection, id, data, version) VALUES ($1, $2, $3, 1) \
                     ON CONFLICT (collection, id) DO UPDATE \
                       SET data = excluded.data, version = documents.version + 1, updated_at = now() \
                     RETURNING {}",
                    COLUMNS
                ))
                .bind(&collection)
                .bind(&id)
                .bind(Json(Value::Object(data)))
                .fetch_one(&mut **tx)
                .await?;
                Ok(Some(row.try_into()?))
            }
            WriteOp::Update { collection, id, data, expected_version } => {
                let row: Option<DocumentRow> = sqlx::query_as(&format!(
                    "UPDATE documents SET data = $3, version = version + 1, updated_at = now() \
                     WHERE collection = $1 AND id = $2 AND ($4::BIGINT IS NULL OR version = $4) \
                     RETURNING {}",
                    COLUMNS
                ))
                .bind(&collection)
                .bind(&id)
                .bind(Json(Value::Object(data)))
                .bind(expected_version)
                .fetch_optional(&mut **tx)
                .await?;
                match row {
                    Some(row) => Ok(Some(row.try_into()?)),
                    None => Err(Self::missing_or_conflict(tx, collection, id, expected_version).await),
                }
            }
            WriteOp::Delete { collection, id, expected_version } => {
                let result = sqlx::query(
                    "DELETE FROM documents WHERE collection = $1 AND id = $2 \
                     AND ($3::BIGINT IS NULL OR version = $3)",
                )
                .bind(&collection)
                .bind(&id)
                .bind(expected_version)
                .execute(&mut **tx)
                .await?;
                if result.rows_affected() == 0 && expected_version.is_some() {
                    return Err(Self::missing_or_conflict(tx, collection, id, expected_version).await);
                }
                Ok(None)
            }
        }
    }

    async fn missing_or_conflict(
        tx: &mut Transaction<'_, Postgres>,
        collection: String,
        id: String,
        expected_version: Option<i64>,
    ) -> StoreError {
        let exists: Result<Option<(i64,)>, sqlx::Error> =
            sqlx::query_as("SELECT version FROM documents WHERE collection = $1 AND id = $2")
                .bind(&collection)
                .bind(&id)
                .fetch_optional(&mut **tx)
                .await;
        match (exists, expected_version) {
            (Ok(Some(_)), Some(expected)) => StoreError::VersionConflict { collection, id, expected },
            (Ok(_), _) => StoreError::NotFound { collection, id },
            (Err(e), _) => StoreError::Sqlx(e),
        }
    }
}

fn bind_params<'q>(mut query: QueryAs<'q, Postgres, DocumentRow, PgArguments>, params: Vec<SqlParam>) -> QueryAs<'q, Postgres, DocumentRow, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Json(v) => query.bind(Json(v)),
            SqlParam::Text(s) => query.bind(s),
        };
    }
    query
}

fn bind_count_params<'q>(mut query: QueryAs<'q, Postgres, (i64,), PgArguments>, params: Vec<SqlParam>) -> QueryAs<'q, Postgres, (i64,), PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Json(v) => query.bind(Json(v)),
            SqlParam::Text(s) => query.bind(s),
        };
    }
    query
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        validate_id(id)?;
        let row: Option<DocumentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM documents WHERE collection = $1 AND id = $2",
            COLUMNS
        ))
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Document::try_from).transpose()
    }

    async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let tail = filter.to_sql(1);
        let sql = format!("SELECT {} FROM documents WHERE collection = $1 AND {}", COLUMNS, tail.clause);
        tracing::trace!(%sql, "document query");

        let query = sqlx::query_as::<_, DocumentRow>(&sql).bind(collection);
        let rows = bind_params(query, tail.params).fetch_all(&self.pool).await?;
        rows.into_iter().map(Document::try_from).collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        validate_collection(collection)?;
        let (where_sql, params) = filter.where_sql(1);
        let sql = format!("SELECT COUNT(*) FROM documents WHERE collection = $1 AND ({})", where_sql);
        let query = sqlx::query_as::<_, (i64,)>(&sql).bind(collection);
        let (count,) = bind_count_params(query, params).fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn commit(&self, writes: Vec<WriteOp>) -> Result<Vec<Document>, StoreError> {
        for op in &writes {
            let (collection, id) = op.target();
            validate_collection(collection)?;
            validate_id(id)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut results = Vec::new();
        for op in writes {
            // Dropping `tx` on error rolls the batch back.
            if let Some(doc) = Self::apply(&mut tx, op).await? {
                results.push(doc);
            }
        }
        tx.commit().await?;
        Ok(results)
    }

    async fn delete_tree(&self, prefix: &str) -> Result<u64, StoreError> {
        if prefix.split('/').any(|segment| validate_id(segment).is_err()) {
            return Err(StoreError::InvalidPath(prefix.to_string()));
        }
        let like = format!("{}/%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 OR collection LIKE $2")
            .bind(prefix)
            .bind(like)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
