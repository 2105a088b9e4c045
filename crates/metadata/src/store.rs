//! Metadata store trait and implementations.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{DocumentRow, new_rev, rev_generation};
use crate::repos::DocumentRepo;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Combined document store trait.
#[async_trait]
pub trait DocumentStore: DocumentRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based document store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) a SQLite store at `path`.
    pub async fn new(path: impl AsRef<Path>, busy_timeout_secs: u64) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(busy_timeout_secs));

        Self::connect(opts).await
    }

    /// Open a private in-memory store.
    pub async fn in_memory() -> MetadataResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(opts).await
    }

    async fn connect(opts: SqliteConnectOptions) -> MetadataResult<Self> {
        let pool = SqlitePoolOptions::new()
            // One connection: keeps in-memory databases alive and avoids
            // "database is locked" churn between writers.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn exists(&self, doc_type: &str, doc_id: &str) -> MetadataResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE doc_type = ? AND doc_id = ?)",
        )
        .bind(doc_type)
        .bind(doc_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Explain why a guarded write touched no rows.
    async fn missed_write(&self, doc_type: &str, doc_id: &str, rev: &str) -> MetadataError {
        match self.exists(doc_type, doc_id).await {
            Ok(true) => MetadataError::Conflict(format!("{doc_id} is not at revision {rev}")),
            Ok(false) => MetadataError::NotFound(doc_id.to_string()),
            Err(e) => e,
        }
    }
}

/// Serialize a body for storage, dropping the revision it may carry.
fn encode_body(body: &serde_json::Value) -> MetadataResult<String> {
    let mut body = body.clone();
    if let Some(obj) = body.as_object_mut() {
        obj.remove("_rev");
    }
    Ok(serde_json::to_string(&body)?)
}

#[async_trait]
impl DocumentRepo for SqliteStore {
    async fn create(
        &self,
        doc_type: &str,
        doc_id: &str,
        body: &serde_json::Value,
    ) -> MetadataResult<String> {
        let rev = new_rev(1);
        let now = OffsetDateTime::now_utc();

        let result = sqlx::query(
            r#"
            INSERT INTO documents (doc_type, doc_id, rev, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(doc_type)
        .bind(doc_id)
        .bind(&rev)
        .bind(encode_body(body)?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(rev),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(MetadataError::AlreadyExists(doc_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        doc_type: &str,
        doc_id: &str,
        rev: &str,
        body: &serde_json::Value,
    ) -> MetadataResult<String> {
        let generation = rev_generation(rev)
            .ok_or_else(|| MetadataError::Conflict(format!("malformed revision {rev:?}")))?;
        let next = new_rev(generation + 1);

        let result = sqlx::query(
            r#"
            UPDATE documents SET rev = ?, body = ?, updated_at = ?
            WHERE doc_type = ? AND doc_id = ? AND rev = ?
            "#,
        )
        .bind(&next)
        .bind(encode_body(body)?)
        .bind(OffsetDateTime::now_utc())
        .bind(doc_type)
        .bind(doc_id)
        .bind(rev)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missed_write(doc_type, doc_id, rev).await);
        }
        Ok(next)
    }

    async fn delete(
        &self,
        doc_type: &str,
        doc_id: &str,
        rev: Option<&str>,
    ) -> MetadataResult<()> {
        let result = match rev {
            Some(rev) => {
                sqlx::query("DELETE FROM documents WHERE doc_type = ? AND doc_id = ? AND rev = ?")
                    .bind(doc_type)
                    .bind(doc_id)
                    .bind(rev)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM documents WHERE doc_type = ? AND doc_id = ?")
                    .bind(doc_type)
                    .bind(doc_id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(match rev {
                Some(rev) => self.missed_write(doc_type, doc_id, rev).await,
                None => MetadataError::NotFound(doc_id.to_string()),
            });
        }
        Ok(())
    }

    async fn get(&self, doc_type: &str, doc_id: &str) -> MetadataResult<Option<DocumentRow>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT doc_type, doc_id, rev, body, created_at, updated_at
            FROM documents WHERE doc_type = ? AND doc_id = ?
            "#,
        )
        .bind(doc_type)
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn count(&self, doc_type: &str) -> MetadataResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE doc_type = ?")
            .bind(doc_type)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                doc_type TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                rev TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (doc_type, doc_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOC_TYPE: &str = "test.docs";

    #[tokio::test]
    async fn test_create_get() {
        let store = SqliteStore::in_memory().await.unwrap();

        let rev = store
            .create(DOC_TYPE, "test.docs/1", &json!({"name": "a", "_rev": "stale"}))
            .await
            .unwrap();
        assert!(rev.starts_with("1-"));

        let row = store.get(DOC_TYPE, "test.docs/1").await.unwrap().unwrap();
        assert_eq!(row.rev, rev);
        let body: serde_json::Value = serde_json::from_str(&row.body).unwrap();
        assert_eq!(body, json!({"name": "a"}));
        assert_eq!(store.count(DOC_TYPE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_id() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create(DOC_TYPE, "dup", &json!({})).await.unwrap();

        match store.create(DOC_TYPE, "dup", &json!({})).await {
            Err(MetadataError::AlreadyExists(id)) => assert_eq!(id, "dup"),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_checks_revision() {
        let store = SqliteStore::in_memory().await.unwrap();
        let rev1 = store.create(DOC_TYPE, "doc", &json!({"v": 1})).await.unwrap();

        let rev2 = store
            .update(DOC_TYPE, "doc", &rev1, &json!({"v": 2}))
            .await
            .unwrap();
        assert!(rev2.starts_with("2-"));

        match store.update(DOC_TYPE, "doc", &rev1, &json!({"v": 3})).await {
            Err(MetadataError::Conflict(_)) => {}
            other => panic!("expected Conflict, got {other:?}"),
        }
        match store.update(DOC_TYPE, "missing", &rev1, &json!({})).await {
            Err(MetadataError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_with_and_without_revision() {
        let store = SqliteStore::in_memory().await.unwrap();
        let rev = store.create(DOC_TYPE, "a", &json!({})).await.unwrap();
        store.create(DOC_TYPE, "b", &json!({})).await.unwrap();

        assert!(matches!(
            store.delete(DOC_TYPE, "a", Some("1-stale")).await,
            Err(MetadataError::Conflict(_))
        ));
        store.delete(DOC_TYPE, "a", Some(&rev)).await.unwrap();
        store.delete(DOC_TYPE, "b", None).await.unwrap();

        assert!(store.delete(DOC_TYPE, "b", None).await.unwrap_err().is_not_found());
        assert_eq!(store.count(DOC_TYPE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/metadata.db");

        {
            let store = SqliteStore::new(&path, 5).await.unwrap();
            store.create(DOC_TYPE, "kept", &json!({})).await.unwrap();
            store.pool().close().await;
        }

        let store = SqliteStore::new(&path, 5).await.unwrap();
        store.health_check().await.unwrap();
        assert!(store.get(DOC_TYPE, "kept").await.unwrap().is_some());
    }
}
