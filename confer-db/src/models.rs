//! Row types for the Confer tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serialized conversation state for one thread
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckpointRecord {
    pub thread_id: String,
    pub state_json: String, // JSON object
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cached summary of a piece of file content
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileSummaryRecord {
    pub id: i64,
    /// SHA-256 of the summarized content, lowercase hex
    pub content_hash: String,
    /// Most recently seen path for this content
    pub filepath: Option<String>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
