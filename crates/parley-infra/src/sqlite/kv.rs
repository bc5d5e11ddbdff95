//! SQLite key-value store implementation.
//!
//! Implements `KvStore` from `parley-core` using sqlx with split read/write pools.
//! Values are stored as JSON text and deserialized on read.

use chrono::Utc;
use parley_core::storage::KvStore;
use parley_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `KvStore`.
pub struct SqliteKvStore {
    pool: DatabasePool,
}

impl SqliteKvStore {
    /// Create a new KV store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let value_str: String = row
                    .try_get("value")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                let value: serde_json::Value = serde_json::from_str(&value_str)
                    .map_err(|e| RepositoryError::Serialization(format!("invalid JSON value: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let value_str = serde_json::to_string(value)
            .map_err(|e| RepositoryError::Serialization(format!("failed to serialize value: {e}")))?;

        sqlx::query(
            r#"INSERT INTO kv_store (key, value, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(&value_str)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parley_core::chat::persistence::{STORAGE_KEY, load_snapshot};
    use parley_core::chat::{ConversationStore, StoreConfig};
    use parley_core::generation::BoxGenerationClient;
    use parley_types::conversation::ConversationId;

    use super::*;
    use crate::gemini::GeminiClient;

    async fn test_store() -> (tempfile::TempDir, SqliteKvStore) {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open(&dir.path().join("test.db")).await.unwrap();
        (dir, SqliteKvStore::new(pool))
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let (_dir, store) = test_store().await;

        let value = serde_json::json!({"theme": "dark", "font_size": 14});
        store.set("settings", &value).await.unwrap();

        let got = store.get("settings").await.unwrap();
        assert_eq!(got, Some(value));
    }

    #[tokio::test]
    async fn test_get_nonexistent_returns_none() {
        let (_dir, store) = test_store().await;
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_upserts() {
        let (_dir, store) = test_store().await;

        store.set("counter", &serde_json::json!(1)).await.unwrap();
        store.set("counter", &serde_json::json!(2)).await.unwrap();

        let got = store.get("counter").await.unwrap();
        assert_eq!(got, Some(serde_json::json!(2)));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, store) = test_store().await;

        store.set("temp", &serde_json::json!("value")).await.unwrap();
        store.delete("temp").await.unwrap();

        assert!(store.get("temp").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_nonexistent_is_noop() {
        let (_dir, store) = test_store().await;
        store.delete("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_value_is_serialization_error() {
        let (_dir, store) = test_store().await;
        sqlx::query("INSERT INTO kv_store (key, value, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind("broken")
            .bind("{not json")
            .bind("2026-01-01T00:00:00Z")
            .bind("2026-01-01T00:00:00Z")
            .execute(&store.pool.writer)
            .await
            .unwrap();

        let err = store.get("broken").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_empty_database_loads_seed_snapshot() {
        let (_dir, store) = test_store().await;

        let list = load_snapshot(&store).await;
        assert_eq!(list.len(), 4);
        assert!(store.get(STORAGE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");
        let client = Arc::new(BoxGenerationClient::new(GeminiClient::unconfigured()));

        let kv = Arc::new(SqliteKvStore::new(DatabasePool::open(&path).await.unwrap()));
        let store = ConversationStore::open(kv, Arc::clone(&client), StoreConfig::default()).await;
        let bob = ConversationId(2);
        assert!(!store.conversation(bob).unwrap().is_pinned);
        assert!(store.toggle_pin_conversation(bob));
        store.shutdown().await;

        let kv = Arc::new(SqliteKvStore::new(DatabasePool::open(&path).await.unwrap()));
        let reopened = ConversationStore::open(kv, client, StoreConfig::default()).await;
        assert!(reopened.conversation(bob).unwrap().is_pinned);
        reopened.shutdown().await;
    }
}
