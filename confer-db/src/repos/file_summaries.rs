//! Repository for content-addressed file summaries

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::FileSummaryRecord;
use crate::Result;

const COLUMNS: &str = "id, content_hash, filepath, summary, created_at, updated_at";

/// Repository for the `file_summaries` table
#[derive(Clone)]
pub struct FileSummariesRepo {
    pool: SqlitePool,
}

impl FileSummariesRepo {
    /// Create a new repository instance
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find the entry for a content hash
    pub async fn find_by_hash(&self, content_hash: &str) -> Result<Option<FileSummaryRecord>> {
        sqlx::query_as::<_, FileSummaryRecord>(&format!(
            "SELECT {COLUMNS} FROM file_summaries WHERE content_hash = ?"
        ))
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Find the most recently updated entry last seen at `filepath`
    pub async fn find_latest_by_path(&self, filepath: &str) -> Result<Option<FileSummaryRecord>> {
        sqlx::query_as::<_, FileSummaryRecord>(&format!(
            "SELECT {COLUMNS} FROM file_summaries WHERE filepath = ? \
             ORDER BY updated_at DESC, id DESC LIMIT 1"
        ))
        .bind(filepath)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Insert a summary, or replace the summary for an existing hash
    ///
    /// The stored path is only replaced when a new one is given.
    pub async fn upsert(
        &self,
        content_hash: &str,
        summary: &str,
        filepath: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO file_summaries (content_hash, filepath, summary, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(content_hash) DO UPDATE SET
                summary = excluded.summary,
                filepath = COALESCE(excluded.filepath, file_summaries.filepath),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(content_hash)
        .bind(filepath)
        .bind(summary)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List entries, newest first
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<FileSummaryRecord>> {
        // SQLite treats a negative LIMIT as "no limit"
        sqlx::query_as::<_, FileSummaryRecord>(&format!(
            "SELECT {COLUMNS} FROM file_summaries ORDER BY updated_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    /// Count stored entries
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM file_summaries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use tempfile::TempDir;

    async fn setup_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, db)
    }

    #[tokio::test]
    async fn test_upsert_replaces_summary() {
        let (_dir, db) = setup_db().await;
        let repo = db.file_summaries();

        repo.upsert("abc", "S1", Some("a.py")).await.unwrap();
        repo.upsert("abc", "S2", None).await.unwrap();

        let record = repo.find_by_hash("abc").await.unwrap().unwrap();
        assert_eq!(record.summary, "S2");
        // path kept when the update carries none
        assert_eq!(record.filepath.as_deref(), Some("a.py"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_hash_different_paths_share_entry() {
        let (_dir, db) = setup_db().await;
        let repo = db.file_summaries();

        repo.upsert("abc", "S1", Some("a.py")).await.unwrap();
        repo.upsert("abc", "S1", Some("b.py")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let record = repo.find_by_hash("abc").await.unwrap().unwrap();
        assert_eq!(record.filepath.as_deref(), Some("b.py"));
        assert!(repo.find_latest_by_path("a.py").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_latest_by_path() {
        let (_dir, db) = setup_db().await;
        let repo = db.file_summaries();

        repo.upsert("h1", "old", Some("main.rs")).await.unwrap();
        repo.upsert("h2", "new", Some("main.rs")).await.unwrap();

        let record = repo.find_latest_by_path("main.rs").await.unwrap().unwrap();
        assert_eq!(record.summary, "new");
        assert!(repo.find_latest_by_path("other.rs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_with_limit() {
        let (_dir, db) = setup_db().await;
        let repo = db.file_summaries();

        for i in 0..5 {
            repo.upsert(&format!("h{}", i), &format!("S{}", i), None)
                .await
                .unwrap();
        }

        assert_eq!(repo.list(None).await.unwrap().len(), 5);
        let limited = repo.list(Some(3)).await.unwrap();
        assert_eq!(limited.len(), 3);
        assert_eq!(limited[0].summary, "S4");
    }
}
