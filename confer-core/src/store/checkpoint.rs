//! Per-thread conversation checkpoints

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::state::ConversationState;
use crate::Result;

/// Storage for conversation state, keyed by thread id
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// State saved for `thread_id`, if the thread exists
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>>;

    /// Replace the state saved for `thread_id`
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()>;
}

/// Checkpoints kept in process memory
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<String, ConversationState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads stored
    pub async fn len(&self) -> usize {
        self.threads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.threads.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        // Same shape as a serialized checkpoint: the counter is per turn.
        let mut saved = state.clone();
        saved.iteration_count = 0;
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), saved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_thread_is_none() {
        let store = MemoryCheckpointStore::new();
        assert!(store.load("nope").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryCheckpointStore::new();
        let mut state = ConversationState::default();
        state.begin_turn("hello");
        state.iteration_count = 2;
        state.code_context = Some("ctx".to_string());

        store.save("t1", &state).await.unwrap();
        let loaded = store.load("t1").await.unwrap().unwrap();

        assert_eq!(loaded.message_log, state.message_log);
        assert_eq!(loaded.code_context.as_deref(), Some("ctx"));
        assert_eq!(loaded.iteration_count, 0);
        assert_eq!(store.len().await, 1);
        assert!(store.load("t2").await.unwrap().is_none());
    }
}
