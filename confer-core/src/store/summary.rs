//! Content-addressed file summaries
//!
//! Summaries are keyed by the SHA-256 of the summarized content, so the same
//! content under different paths or revisions shares one entry. An entry is
//! never invalidated; it is a pure function of the content.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// SHA-256 of `content`, lowercase hex
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One cached summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub content_hash: String,
    /// Most recently seen path for this content
    pub filepath: Option<String>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage for file summaries
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Summary of exactly this content
    async fn get(&self, content: &str) -> Result<Option<String>>;

    /// Most recently updated summary recorded for `path`
    async fn get_by_path(&self, path: &str) -> Result<Option<String>>;

    /// Store or replace the summary of `content`
    ///
    /// The recorded path is only replaced when `path` is given.
    async fn put(&self, content: &str, summary: &str, path: Option<&str>) -> Result<()>;

    /// Entries, most recently updated first
    async fn list(&self, limit: Option<usize>) -> Result<Vec<SummaryEntry>>;
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Summaries stored as one JSON file per content hash
#[derive(Debug, Clone)]
pub struct FileSummaryCache {
    dir: PathBuf,
}

impl FileSummaryCache {
    /// Cache in `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash))
    }

    async fn read_entry(&self, path: &Path) -> Result<Option<SummaryEntry>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn all_entries(&self) -> Result<Vec<SummaryEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_entry(&path).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Skipping unreadable summary entry"
                    );
                }
            }
        }

        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }
}

#[async_trait]
impl SummaryStore for FileSummaryCache {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get(&self, content: &str) -> Result<Option<String>> {
        let entry = self.read_entry(&self.entry_path(&content_hash(content))).await?;
        Ok(entry.map(|e| e.summary))
    }

    async fn get_by_path(&self, path: &str) -> Result<Option<String>> {
        Ok(self
            .all_entries()
            .await?
            .into_iter()
            .find(|e| e.filepath.as_deref() == Some(path))
            .map(|e| e.summary))
    }

    async fn put(&self, content: &str, summary: &str, path: Option<&str>) -> Result<()> {
        let hash = content_hash(content);
        let target = self.entry_path(&hash);
        let existing = self.read_entry(&target).await?;
        let now = Utc::now();

        let entry = SummaryEntry {
            content_hash: hash.clone(),
            filepath: path
                .map(str::to_string)
                .or_else(|| existing.as_ref().and_then(|e| e.filepath.clone())),
            summary: summary.to_string(),
            created_at: existing.as_ref().map(|e| e.created_at).unwrap_or(now),
            updated_at: now,
        };

        tokio::fs::create_dir_all(&self.dir).await?;

        // Write then rename so readers never see a partial entry.
        let tmp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            hash,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let json = serde_json::to_string_pretty(&entry)?;
        replace_file(&tmp, &target, json.as_bytes()).await?;

        tracing::debug!(hash = %hash, path = ?entry.filepath, "Stored file summary");
        Ok(())
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<SummaryEntry>> {
        let mut entries = self.all_entries().await?;
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }
}

/// Write `bytes` to `tmp` and rename it over `target`
///
/// `tmp` is removed again if either step fails.
async fn replace_file(tmp: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let written = match tokio::fs::write(tmp, bytes).await {
        Ok(()) => tokio::fs::rename(tmp, target).await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(tmp).await {
            if cleanup.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    path = %tmp.display(),
                    error = %cleanup,
                    "Failed to remove temp file"
                );
            }
        }
        return Err(Error::Persistence(format!(
            "Failed to store summary {}: {}",
            target.display(),
            e
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_second_put_replaces_summary() {
        let dir = TempDir::new().unwrap();
        let cache = FileSummaryCache::new(dir.path());

        cache.put("X", "S1", None).await.unwrap();
        cache.put("X", "S2", None).await.unwrap();

        assert_eq!(cache.get("X").await.unwrap().as_deref(), Some("S2"));
        assert_eq!(cache.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_content_different_paths_share_entry() {
        let dir = TempDir::new().unwrap();
        let cache = FileSummaryCache::new(dir.path());

        cache.put("fn main() {}", "entry point", Some("a/main.rs")).await.unwrap();
        cache.put("fn main() {}", "entry point", Some("b/main.rs")).await.unwrap();

        let entries = cache.list(None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filepath.as_deref(), Some("b/main.rs"));
        assert_eq!(entries[0].content_hash, content_hash("fn main() {}"));
    }

    #[tokio::test]
    async fn test_put_without_path_keeps_path_and_created_at() {
        let dir = TempDir::new().unwrap();
        let cache = FileSummaryCache::new(dir.path());

        cache.put("X", "S1", Some("x.py")).await.unwrap();
        let first = cache.list(None).await.unwrap().remove(0);
        cache.put("X", "S2", None).await.unwrap();
        let second = cache.list(None).await.unwrap().remove(0);

        assert_eq!(second.filepath.as_deref(), Some("x.py"));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_get_by_path_returns_latest() {
        let dir = TempDir::new().unwrap();
        let cache = FileSummaryCache::new(dir.path());

        cache.put("v1", "old", Some("foo.py")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.put("v2", "new", Some("foo.py")).await.unwrap();

        assert_eq!(cache.get_by_path("foo.py").await.unwrap().as_deref(), Some("new"));
        assert_eq!(cache.get_by_path("bar.py").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let dir = TempDir::new().unwrap();
        let cache = FileSummaryCache::new(dir.path());

        for (i, content) in ["a", "b", "c"].iter().enumerate() {
            cache.put(content, &format!("s{}", i), None).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let entries = cache.list(Some(2)).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].summary, "s2");
        assert_eq!(entries[1].summary, "s1");
    }

    #[tokio::test]
    async fn test_failed_replace_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("entry.json");
        // A non-empty directory cannot be replaced by a file
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();
        let tmp = dir.path().join(".entry.tmp");

        let err = replace_file(&tmp, &target, b"{}").await.unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(!tmp.exists());
        assert!(target.join("keep").exists());
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = FileSummaryCache::new(dir.path().join("not-yet"));
        assert_eq!(cache.get("X").await.unwrap(), None);
        assert!(cache.list(None).await.unwrap().is_empty());
    }
}
