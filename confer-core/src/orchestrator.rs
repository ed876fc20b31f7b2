//! Turn handling per conversation thread
//!
//! A turn is load → run → save under a per-thread lock, so concurrent turns
//! on one thread are applied one after another and different threads never
//! wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::controller::{Controller, Strategy};
use crate::store::CheckpointStore;
use crate::Result;

pub struct Orchestrator {
    controller: Box<dyn Controller>,
    checkpoints: Arc<dyn CheckpointStore>,
    threads: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(controller: Box<dyn Controller>, checkpoints: Arc<dyn CheckpointStore>) -> Self {
        Self {
            controller,
            checkpoints,
            threads: Mutex::new(HashMap::new()),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.controller.strategy()
    }

    pub fn checkpoints(&self) -> &Arc<dyn CheckpointStore> {
        &self.checkpoints
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        self.threads
            .lock()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .clone()
    }

    /// Forget the lock for `thread_id` once no turn holds or awaits it
    async fn release_thread(&self, thread_id: &str, lock: Arc<Mutex<()>>) {
        let mut threads = self.threads.lock().await;
        // One reference in the map plus ours
        if Arc::strong_count(&lock) == 2 {
            threads.remove(thread_id);
        }
    }

    /// Handle one user message on `thread_id` and return the answer
    ///
    /// The checkpoint is only written when the turn produced an answer.
    pub async fn chat(&self, thread_id: &str, message: &str) -> Result<String> {
        let lock = self.thread_lock(thread_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run_turn(thread_id, message).await
        };
        self.release_thread(thread_id, lock).await;
        result
    }

    async fn run_turn(&self, thread_id: &str, message: &str) -> Result<String> {
        let mut state = self.checkpoints.load(thread_id).await?.unwrap_or_default();
        state.begin_turn(message);

        tracing::info!(
            thread_id,
            strategy = %self.controller.strategy(),
            history = state.message_log.len(),
            "Starting turn"
        );
        self.controller.run(&mut state).await?;
        let answer = state.final_answer()?;

        self.checkpoints.save(thread_id, &state).await?;
        tracing::info!(
            thread_id,
            iterations = state.iteration_count,
            history = state.message_log.len(),
            "Turn complete"
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, Role};
    use crate::state::ConversationState;
    use crate::store::MemoryCheckpointStore;
    use crate::Error;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers with the number of user messages seen so far
    struct Counting;

    #[async_trait]
    impl Controller for Counting {
        fn strategy(&self) -> Strategy {
            Strategy::Supervisor
        }

        async fn run(&self, state: &mut ConversationState) -> Result<()> {
            state.iteration_count += 1;
            let users = state
                .message_log
                .iter()
                .filter(|m| m.role == Role::User)
                .count();
            tokio::time::sleep(Duration::from_millis(5)).await;
            state.push(Message::assistant(format!("turn {}", users)));
            Ok(())
        }
    }

    /// Leaves the transcript ending on the user message
    struct Silent;

    #[async_trait]
    impl Controller for Silent {
        fn strategy(&self) -> Strategy {
            Strategy::Router
        }

        async fn run(&self, _state: &mut ConversationState) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_second_turn_sees_first() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let orchestrator = Orchestrator::new(Box::new(Counting), store.clone());

        assert_eq!(orchestrator.chat("t1", "hello").await.unwrap(), "turn 1");
        assert_eq!(orchestrator.chat("t1", "again").await.unwrap(), "turn 2");
        assert_eq!(orchestrator.chat("t2", "other").await.unwrap(), "turn 1");

        let saved = store.load("t1").await.unwrap().unwrap();
        assert_eq!(saved.message_log.len(), 4);
        assert_eq!(saved.current_user_query, "again");
        assert_eq!(saved.iteration_count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_thread_both_land() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let orchestrator = Arc::new(Orchestrator::new(Box::new(Counting), store.clone()));

        let handles: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|text| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.chat("shared", text).await })
            })
            .collect();

        let mut answers = Vec::new();
        for handle in handles {
            answers.push(handle.await.unwrap().unwrap());
        }
        answers.sort();
        assert_eq!(answers, vec!["turn 1", "turn 2", "turn 3"]);

        let saved = store.load("shared").await.unwrap().unwrap();
        assert_eq!(saved.message_log.len(), 6);
        assert!(orchestrator.threads.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_thread_locks_are_released_after_turns() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let orchestrator = Orchestrator::new(Box::new(Counting), store.clone());

        orchestrator.chat("t1", "hello").await.unwrap();
        orchestrator.chat("t2", "hello").await.unwrap();
        assert!(orchestrator.threads.lock().await.is_empty());

        // Failed turns release their lock too
        let silent = Orchestrator::new(Box::new(Silent), store);
        assert!(silent.chat("t3", "hi").await.is_err());
        assert!(silent.threads.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_answer_is_contract_violation() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let orchestrator = Orchestrator::new(Box::new(Silent), store.clone());

        let err = orchestrator.chat("t1", "hi").await.unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
        // The failed turn is not acknowledged
        assert!(store.is_empty().await);
    }
}
