//! SQL implementation of the registration store
//!
//! Documents are stored as JSON text in a single `registry_documents` table
//! keyed by entity name. The registration fields (`token`, `userId`,
//! `appPlatform`) are copied into indexed columns so lookups and deletes
//! filter in SQL; any other filter field is matched on the returned rows.
//! `(entity_name, token)` is unique, so a token is stored at most once.

use crate::client::DbBackend;
use crate::error::DbError;
use crate::repository::{matches_filter, project, unique_key, Document, RegistrationStore};
use crate::DbClient;
use alertcast_common::models::DeviceRegistration;
use alertcast_common::BoxFuture;
use serde_json::Value;
use sqlx::Row;
use tracing::{debug, error, info};

/// Document fields mirrored into columns, with their column names.
const INDEXED_COLUMNS: [(&str, &str); 3] = [
    (DeviceRegistration::TOKEN_FIELD, "token"),
    (DeviceRegistration::USER_ID_FIELD, "user_id"),
    (DeviceRegistration::APP_PLATFORM_FIELD, "app_platform"),
];

/// Schema statements for each backend, run in order.
fn schema(backend: DbBackend) -> &'static [&'static str] {
    match backend {
        DbBackend::Sqlite => &[
            r#"
            CREATE TABLE IF NOT EXISTS registry_documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_name VARCHAR(128) NOT NULL,
                token VARCHAR(512),
                user_id VARCHAR(255),
                app_platform VARCHAR(32),
                body TEXT NOT NULL,
                UNIQUE (entity_name, token)
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_registry_documents_user
            ON registry_documents (entity_name, user_id)
            "#,
        ],
        DbBackend::Postgres => &[
            r#"
            CREATE TABLE IF NOT EXISTS registry_documents (
                id BIGSERIAL PRIMARY KEY,
                entity_name VARCHAR(128) NOT NULL,
                token VARCHAR(512),
                user_id VARCHAR(255),
                app_platform VARCHAR(32),
                body TEXT NOT NULL,
                UNIQUE (entity_name, token)
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_registry_documents_user
            ON registry_documents (entity_name, user_id)
            "#,
        ],
        // MySQL has no CREATE INDEX IF NOT EXISTS; indexes live in the table.
        DbBackend::MySql => &[r#"
            CREATE TABLE IF NOT EXISTS registry_documents (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                entity_name VARCHAR(128) NOT NULL,
                token VARCHAR(512),
                user_id VARCHAR(255),
                app_platform VARCHAR(32),
                body TEXT NOT NULL,
                UNIQUE KEY uq_registry_documents_token (entity_name, token),
                KEY idx_registry_documents_user (entity_name, user_id)
            )
            "#],
    }
}

/// A `SELECT` over one entity with the filter split into SQL and residual parts.
#[derive(Debug, PartialEq)]
struct EntityQuery {
    sql: String,
    binds: Vec<String>,
    residual: Document,
}

impl EntityQuery {
    fn new(backend: DbBackend, entity: &str, filter: &Document) -> Self {
        let mut binds = vec![entity.to_string()];
        let mut clauses = vec![format!("entity_name = {}", backend.placeholder(1))];
        let mut residual = filter.clone();

        for (field, column) in INDEXED_COLUMNS {
            // non-string values never land in a column
            let Some(value) = filter.get(field).and_then(Value::as_str) else {
                continue;
            };
            residual.remove(field);
            binds.push(value.to_string());
            clauses.push(format!("{column} = {}", backend.placeholder(binds.len())));
        }

        Self {
            sql: format!(
                "SELECT id, body FROM registry_documents WHERE {} ORDER BY id",
                clauses.join(" AND ")
            ),
            binds,
            residual,
        }
    }
}

fn indexed_value(document: &Document, field: &str) -> Option<String> {
    document.get(field).and_then(Value::as_str).map(str::to_string)
}

/// SQL implementation of the registration store
#[derive(Debug, Clone)]
pub struct SqlRegistrationStore {
    db_client: DbClient,
}

impl SqlRegistrationStore {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    /// Create the `registry_documents` table and its indexes if missing.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let backend = self.db_client.backend();
        debug!(?backend, "Initializing registration store schema");

        for statement in schema(backend) {
            self.db_client.execute(statement).await?;
        }

        info!("Registration store schema initialized successfully");
        Ok(())
    }

    /// Loads the documents of `entity` matching `filter` with their row ids, oldest first.
    async fn find(&self, entity: &str, filter: &Document) -> Result<Vec<(i64, Document)>, DbError> {
        let query = EntityQuery::new(self.db_client.backend(), entity, filter);

        let mut statement = sqlx::query(&query.sql);
        for bind in &query.binds {
            statement = statement.bind(bind.as_str());
        }
        let rows = statement
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to load {} documents: {}", entity, e);
                DbError::QueryError(e.to_string())
            })?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let body: String = row.try_get("body")?;
            match serde_json::from_str::<Value>(&body)? {
                Value::Object(document) if matches_filter(&document, &query.residual) => {
                    documents.push((id, document))
                }
                Value::Object(_) => {}
                other => {
                    // only objects are ever written; skip anything else
                    error!(id, entity, "Ignoring non-object registry document: {}", other);
                }
            }
        }
        Ok(documents)
    }
}

impl RegistrationStore for SqlRegistrationStore {
    fn get_fields_by_fields<'a>(
        &'a self,
        filter: &'a Document,
        entity: &'a str,
        fields: &'a [&'a str],
    ) -> BoxFuture<'a, Vec<Document>, DbError> {
        Box::pin(async move {
            debug!(entity, ?filter, "Finding registry documents");
            let documents = self.find(entity, filter).await?;
            Ok(documents
                .iter()
                .map(|(_, document)| project(document, fields))
                .collect())
        })
    }

    fn insert_single_document<'a>(
        &'a self,
        document: Document,
        entity: &'a str,
    ) -> BoxFuture<'a, (), DbError> {
        Box::pin(async move {
            debug!(entity, "Inserting registry document");
            let body = serde_json::to_string(&document)?;
            let backend = self.db_client.backend();

            let query = format!(
                "INSERT INTO registry_documents (entity_name, token, user_id, app_platform, body) \
                 VALUES ({}, {}, {}, {}, {})",
                backend.placeholder(1),
                backend.placeholder(2),
                backend.placeholder(3),
                backend.placeholder(4),
                backend.placeholder(5),
            );
            let mut statement = sqlx::query(&query).bind(entity);
            for (field, _) in INDEXED_COLUMNS {
                statement = statement.bind(indexed_value(&document, field));
            }
            statement
                .bind(body)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| match &e {
                    sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                        DbError::DuplicateKey(unique_key(&document).unwrap_or_default().to_string())
                    }
                    _ => {
                        error!("Failed to insert {} document: {}", entity, e);
                        DbError::QueryError(e.to_string())
                    }
                })?;
            Ok(())
        })
    }

    fn delete_single_document<'a>(
        &'a self,
        key: &'a Document,
        entity: &'a str,
    ) -> BoxFuture<'a, bool, DbError> {
        Box::pin(async move {
            debug!(entity, ?key, "Deleting registry document");
            let Some((id, _)) = self.find(entity, key).await?.into_iter().next() else {
                return Ok(false);
            };

            let query = format!(
                "DELETE FROM registry_documents WHERE id = {}",
                self.db_client.backend().placeholder(1)
            );
            let result = sqlx::query(&query)
                .bind(id)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| {
                    error!("Failed to delete {} document: {}", entity, e);
                    DbError::QueryError(e.to_string())
                })?;

            Ok(result.rows_affected() > 0)
        })
    }
}
