// SPDX-License-Identifier: MIT

//! Checkpoint storage
//!
//! A checkpoint is the latest state snapshot of one thread plus the node
//! that runs next. Stores keep exactly one checkpoint per thread id and
//! serialize all work on the same thread through [`CheckpointStore::lock`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::error::{HitlError, Result};
use crate::workflow::graph::NodeTarget;
use crate::workflow::state::{StateUpdate, WorkflowState};

/// What a thread executes next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextNode {
    Node(String),
    Terminal,
}

impl NextNode {
    pub fn node_name(&self) -> Option<&str> {
        match self {
            NextNode::Node(name) => Some(name),
            NextNode::Terminal => None,
        }
    }
}

impl From<NodeTarget> for NextNode {
    fn from(target: NodeTarget) -> Self {
        match target {
            NodeTarget::Node(name) => NextNode::Node(name),
            NodeTarget::End => NextNode::Terminal,
        }
    }
}

/// Persisted snapshot for one thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Regenerated on every write
    pub checkpoint_id: Uuid,
    pub state: WorkflowState,
    pub next: NextNode,
    /// Node executions on this thread so far
    pub step: u64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(state: WorkflowState, next: NextNode, step: u64) -> Self {
        Self {
            checkpoint_id: Uuid::new_v4(),
            state,
            next,
            step,
            updated_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.next == NextNode::Terminal
    }
}

type LockTable = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Exclusive hold on one thread id, released on drop
#[derive(Debug)]
pub struct ThreadLease {
    thread_id: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    table: LockTable,
}

impl ThreadLease {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

impl Drop for ThreadLease {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Two references left (table and this lease) means nobody waits.
        let mut locks = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks.get(&self.thread_id).is_some_and(|entry| {
            Arc::ptr_eq(entry, &self.lock) && Arc::strong_count(&self.lock) == 2
        });
        if idle {
            locks.remove(&self.thread_id);
        }
    }
}

/// Per-key mutex table, usable by any store backend.
///
/// Entries live only while a lease holds or awaits them.
#[derive(Debug, Default)]
pub struct ThreadLocks {
    table: LockTable,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no one else holds `thread_id`, then hold it
    pub async fn acquire(&self, thread_id: &str) -> ThreadLease {
        let lock = {
            let mut locks = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(thread_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let guard = lock.clone().lock_owned().await;
        ThreadLease {
            thread_id: thread_id.to_string(),
            lock,
            guard: Some(guard),
            table: self.table.clone(),
        }
    }

    /// Thread ids currently held or awaited
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Storage contract used by the engine and the state mutator.
///
/// `save`, `load` and `update` are each atomic on their own. Callers that
/// need a read-modify-write sequence hold the thread's [`ThreadLease`] for
/// the whole sequence.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Take the per-thread lock
    async fn lock(&self, thread_id: &str) -> ThreadLease;

    /// Create or overwrite the checkpoint for `thread_id`
    async fn save(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<()>;

    /// Latest checkpoint for `thread_id`, if any
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Merge `update` into the stored state, keeping `next` and `step`
    async fn update(&self, thread_id: &str, update: StateUpdate) -> Result<Checkpoint>;

    /// All thread ids that have a checkpoint
    async fn threads(&self) -> Result<Vec<String>>;
}

/// Process-memory checkpoint store.
///
/// Records are never evicted: the map grows with every distinct thread id
/// for the lifetime of the store.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    records: RwLock<HashMap<String, Checkpoint>>,
    locks: ThreadLocks,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored threads
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn lock(&self, thread_id: &str) -> ThreadLease {
        self.locks.acquire(thread_id).await
    }

    async fn save(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<()> {
        log::debug!(
            "Saving checkpoint {} for thread '{}' (step {}, next {:?})",
            checkpoint.checkpoint_id,
            thread_id,
            checkpoint.step,
            checkpoint.next
        );
        let mut records = self.records.write().await;
        records.insert(thread_id.to_string(), checkpoint);
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let records = self.records.read().await;
        Ok(records.get(thread_id).cloned())
    }

    async fn update(&self, thread_id: &str, update: StateUpdate) -> Result<Checkpoint> {
        let mut records = self.records.write().await;
        let current = records
            .get(thread_id)
            .ok_or_else(|| HitlError::UnknownThread(thread_id.to_string()))?;

        let mut state = current.state.clone();
        state.apply(update);
        let checkpoint = Checkpoint::new(state, current.next.clone(), current.step);

        records.insert(thread_id.to_string(), checkpoint.clone());
        Ok(checkpoint)
    }

    async fn threads(&self) -> Result<Vec<String>> {
        let records = self.records.read().await;
        let mut ids: Vec<String> = records.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn state(value: serde_json::Value) -> WorkflowState {
        let mut state = WorkflowState::empty();
        state.apply(value.as_object().cloned().unwrap());
        state
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemoryCheckpointStore::new();
        let checkpoint = Checkpoint::new(
            state(json!({"number": 4})),
            NextNode::Node("predict".to_string()),
            0,
        );

        store.save("t1", checkpoint.clone()).await.unwrap();

        assert_eq!(store.load("t1").await.unwrap(), Some(checkpoint));
        assert_eq!(store.load("t2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemoryCheckpointStore::new();
        store
            .save("t1", Checkpoint::new(state(json!({"n": 1})), NextNode::Terminal, 1))
            .await
            .unwrap();
        store
            .save("t1", Checkpoint::new(state(json!({"n": 2})), NextNode::Terminal, 2))
            .await
            .unwrap();

        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.state.get("n"), Some(&json!(2)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_keeps_next_and_step() {
        let store = InMemoryCheckpointStore::new();
        let original = Checkpoint::new(
            state(json!({"number": 4, "prediction": "even"})),
            NextNode::Node("review".to_string()),
            1,
        );
        store.save("t1", original.clone()).await.unwrap();

        let updated = store
            .update("t1", json!({"human_feedback": "confirm"}).as_object().cloned().unwrap())
            .await
            .unwrap();

        assert_eq!(updated.next, original.next);
        assert_eq!(updated.step, 1);
        assert_ne!(updated.checkpoint_id, original.checkpoint_id);
        assert_eq!(
            updated.state.to_json(),
            json!({"number": 4, "prediction": "even", "human_feedback": "confirm"})
        );
        assert_eq!(store.load("t1").await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_unknown_thread() {
        let store = InMemoryCheckpointStore::new();
        let err = store.update("missing", StateUpdate::new()).await.unwrap_err();
        assert!(matches!(err, HitlError::UnknownThread(ref t) if t == "missing"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let store = InMemoryCheckpointStore::new();
        store
            .save("a", Checkpoint::new(state(json!({"n": 1})), NextNode::Terminal, 1))
            .await
            .unwrap();
        store
            .save("b", Checkpoint::new(state(json!({"n": 2})), NextNode::Terminal, 1))
            .await
            .unwrap();

        store
            .update("a", json!({"n": 10}).as_object().cloned().unwrap())
            .await
            .unwrap();

        let b = store.load("b").await.unwrap().unwrap();
        assert_eq!(b.state.get("n"), Some(&json!(2)));
        assert_eq!(store.threads().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_lock_is_per_thread() {
        let store = Arc::new(InMemoryCheckpointStore::new());
        let lease = store.lock("t1").await;
        assert_eq!(lease.thread_id(), "t1");

        // A different thread id is not blocked.
        let other = tokio::time::timeout(Duration::from_millis(100), store.lock("t2")).await;
        assert!(other.is_ok());

        // The same thread id waits until the lease is dropped.
        let blocked = tokio::time::timeout(Duration::from_millis(50), store.lock("t1")).await;
        assert!(blocked.is_err());

        drop(lease);
        let relocked = tokio::time::timeout(Duration::from_millis(100), store.lock("t1")).await;
        assert!(relocked.is_ok());
    }

    #[tokio::test]
    async fn test_lock_entries_are_released() {
        let store = InMemoryCheckpointStore::new();
        for i in 0..1000 {
            let _lease = store.lock(&format!("ghost-{}", i)).await;
        }

        assert!(store.locks.is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_lock_entry_kept_while_awaited() {
        let store = Arc::new(InMemoryCheckpointStore::new());
        let lease = store.lock("t1").await;

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let lease = store.lock("t1").await;
                lease.thread_id().to_string()
            })
        };
        // Let the waiter register on the existing mutex.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.locks.len(), 1);

        drop(lease);
        assert_eq!(waiter.await.unwrap(), "t1");
        assert!(store.locks.is_empty());
    }

    #[test]
    fn test_next_node_from_target() {
        assert_eq!(NextNode::from(NodeTarget::End), NextNode::Terminal);
        assert_eq!(
            NextNode::from(NodeTarget::from("review")),
            NextNode::Node("review".to_string())
        );
        assert_eq!(NextNode::Terminal.node_name(), None);
    }

    #[test]
    fn test_checkpoint_serde() {
        let checkpoint = Checkpoint::new(
            state(json!({"number": 7})),
            NextNode::Node("review".to_string()),
            1,
        );
        let json = serde_json::to_value(&checkpoint).unwrap();
        assert_eq!(json["next"], json!({"node": "review"}));
        assert_eq!(json["state"], json!({"number": 7}));

        let back: Checkpoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, checkpoint);
    }
}
