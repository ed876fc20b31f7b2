//! Repository for conversation checkpoints

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::models::CheckpointRecord;
use crate::Result;

/// Repository for per-thread conversation state
#[derive(Clone)]
pub struct CheckpointsRepo {
    pool: SqlitePool,
}

impl CheckpointsRepo {
    /// Create a new repository instance
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the raw checkpoint row for a thread
    pub async fn get(&self, thread_id: &str) -> Result<Option<CheckpointRecord>> {
        sqlx::query_as::<_, CheckpointRecord>(
            "SELECT thread_id, state_json, created_at, updated_at
             FROM checkpoints WHERE thread_id = ?",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Load and deserialize the state stored for a thread
    pub async fn load<T: DeserializeOwned>(&self, thread_id: &str) -> Result<Option<T>> {
        match self.get(thread_id).await? {
            Some(record) => Ok(Some(serde_json::from_str(&record.state_json)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace the state for a thread
    pub async fn save<T: Serialize>(&self, thread_id: &str, state: &T) -> Result<()> {
        let state_json = serde_json::to_string(state)?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO checkpoints (thread_id, state_json, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(thread_id) DO UPDATE SET
                state_json = excluded.state_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(thread_id)
        .bind(&state_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List known thread ids, most recently updated first
    pub async fn list_threads(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT thread_id FROM checkpoints ORDER BY updated_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        messages: Vec<String>,
    }

    async fn setup_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, db)
    }

    #[tokio::test]
    async fn test_load_missing_thread() {
        let (_dir, db) = setup_db().await;
        let loaded: Option<Snapshot> = db.checkpoints().load("nope").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let (_dir, db) = setup_db().await;
        let repo = db.checkpoints();

        let snapshot = Snapshot {
            messages: vec!["hello".to_string()],
        };
        repo.save("t1", &snapshot).await.unwrap();

        let loaded: Option<Snapshot> = repo.load("t1").await.unwrap();
        assert_eq!(loaded, Some(snapshot));
    }

    #[tokio::test]
    async fn test_save_overwrites_and_keeps_created_at() {
        let (_dir, db) = setup_db().await;
        let repo = db.checkpoints();

        repo.save("t1", &Snapshot { messages: vec!["a".into()] })
            .await
            .unwrap();
        let first = repo.get("t1").await.unwrap().unwrap();

        repo.save("t1", &Snapshot { messages: vec!["a".into(), "b".into()] })
            .await
            .unwrap();
        let second = repo.get("t1").await.unwrap().unwrap();

        assert_eq!(first.created_at, second.created_at);
        let loaded: Snapshot = serde_json::from_str(&second.state_json).unwrap();
        assert_eq!(loaded.messages, vec!["a", "b"]);
        assert_eq!(repo.list_threads().await.unwrap(), vec!["t1"]);
    }
}
