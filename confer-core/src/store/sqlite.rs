//! Stores backed by the confer-db SQLite database

use async_trait::async_trait;
use confer_db::{CheckpointsRepo, Database, FileSummariesRepo, FileSummaryRecord};

use super::checkpoint::CheckpointStore;
use super::summary::{content_hash, SummaryEntry, SummaryStore};
use crate::state::ConversationState;
use crate::Result;

/// Checkpoints in the `checkpoints` table
pub struct SqliteCheckpointStore {
    repo: CheckpointsRepo,
}

impl SqliteCheckpointStore {
    pub fn new(db: &Database) -> Self {
        Self {
            repo: db.checkpoints(),
        }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        Ok(self.repo.load(thread_id).await?)
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        Ok(self.repo.save(thread_id, state).await?)
    }
}

/// Summaries in the `file_summaries` table
pub struct SqliteSummaryStore {
    repo: FileSummariesRepo,
}

impl SqliteSummaryStore {
    pub fn new(db: &Database) -> Self {
        Self {
            repo: db.file_summaries(),
        }
    }
}

impl From<FileSummaryRecord> for SummaryEntry {
    fn from(record: FileSummaryRecord) -> Self {
        Self {
            content_hash: record.content_hash,
            filepath: record.filepath,
            summary: record.summary,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[async_trait]
impl SummaryStore for SqliteSummaryStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, content: &str) -> Result<Option<String>> {
        let record = self.repo.find_by_hash(&content_hash(content)).await?;
        Ok(record.map(|r| r.summary))
    }

    async fn get_by_path(&self, path: &str) -> Result<Option<String>> {
        let record = self.repo.find_latest_by_path(path).await?;
        Ok(record.map(|r| r.summary))
    }

    async fn put(&self, content: &str, summary: &str, path: Option<&str>) -> Result<()> {
        Ok(self
            .repo
            .upsert(&content_hash(content), summary, path)
            .await?)
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<SummaryEntry>> {
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
        let records = self.repo.list(limit).await?;
        Ok(records.into_iter().map(SummaryEntry::from).collect())
    }
}
