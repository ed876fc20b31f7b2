//! Persistence for checkpoints and file summaries
//!
//! Both stores are traits so a durable SQLite backend (feature `database`)
//! and the local backends can be swapped at startup.

mod checkpoint;
#[cfg(feature = "database")]
mod sqlite;
mod summary;

pub use checkpoint::{CheckpointStore, MemoryCheckpointStore};
#[cfg(feature = "database")]
pub use sqlite::{SqliteCheckpointStore, SqliteSummaryStore};
pub use summary::{content_hash, FileSummaryCache, SummaryEntry, SummaryStore};
