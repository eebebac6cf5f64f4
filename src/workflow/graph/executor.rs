//! Graph workflow executor
//!
//! [`Engine::run`] drives one thread through the graph, one node at a time,
//! persisting a checkpoint after every step. It halts before any node in the
//! interrupt-before set, or when the terminal marker is reached. A resumed
//! run always executes its first pending node, even if that node is an
//! interrupt point.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::types::GraphDefinition;
use crate::error::{HitlError, Result};
use crate::workflow::checkpoint::{Checkpoint, CheckpointStore, NextNode};
use crate::workflow::config::EngineConfig;
use crate::workflow::mutator;
use crate::workflow::state::{StateUpdate, WorkflowState};

/// How a run call starts
#[derive(Debug, Clone)]
pub enum RunInput {
    /// Start (or restart) the thread from the entry node with this state
    Initial(StateUpdate),
    /// Continue from the stored next node
    Resume,
}

/// Why a run call returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Halt {
    /// Paused before this node
    Interrupted(String),
    /// Reached the terminal marker
    Completed,
}

/// One node execution within a run call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub node: String,
    pub update: StateUpdate,
}

/// Result of a run call
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub snapshot: WorkflowState,
    pub halted_at: Halt,
    /// Node executions performed by this call, in order
    pub steps: Vec<StepRecord>,
    pub checkpoint_id: Uuid,
}

/// Control state of a thread as seen from outside a run call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    NoRun,
    PausedAt(String),
    Completed,
}

/// Stored view of a thread
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub values: WorkflowState,
    /// Pending node, `None` once completed
    pub next: Option<String>,
    pub status: ThreadStatus,
    pub checkpoint_id: Uuid,
    pub step: u64,
}

/// Checkpointed, resumable graph executor
#[derive(Clone)]
pub struct Engine {
    graph: Arc<GraphDefinition>,
    store: Arc<dyn CheckpointStore>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(graph: Arc<GraphDefinition>, store: Arc<dyn CheckpointStore>) -> Self {
        Self::with_config(graph, store, EngineConfig::default())
    }

    pub fn with_config(
        graph: Arc<GraphDefinition>,
        store: Arc<dyn CheckpointStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            graph,
            store,
            config,
        }
    }

    pub fn graph(&self) -> &GraphDefinition {
        &self.graph
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Advance `thread_id` until it pauses or completes
    pub async fn run(&self, thread_id: &str, input: RunInput) -> Result<RunOutcome> {
        let _lease = self.store.lock(thread_id).await;

        let (mut checkpoint, resuming) = match input {
            RunInput::Initial(values) => {
                let state = WorkflowState::initial(self.graph.schema(), values)?;
                let checkpoint = Checkpoint::new(
                    state,
                    NextNode::Node(self.graph.entry().to_string()),
                    0,
                );
                self.store.save(thread_id, checkpoint.clone()).await?;
                log::info!(
                    "Starting thread '{}' on graph '{}' at '{}'",
                    thread_id,
                    self.graph.name(),
                    self.graph.entry()
                );
                (checkpoint, false)
            }
            RunInput::Resume => {
                let checkpoint = self
                    .store
                    .load(thread_id)
                    .await?
                    .ok_or_else(|| HitlError::UnknownThread(thread_id.to_string()))?;
                if checkpoint.is_completed() {
                    return Err(HitlError::AlreadyCompleted(thread_id.to_string()));
                }
                log::info!(
                    "Resuming thread '{}' at {:?} (step {})",
                    thread_id,
                    checkpoint.next,
                    checkpoint.step
                );
                (checkpoint, true)
            }
        };

        let mut steps = Vec::new();
        let mut entering_resumed_node = resuming;

        let halted_at = loop {
            let node = match &checkpoint.next {
                NextNode::Terminal => break Halt::Completed,
                NextNode::Node(name) => name.clone(),
            };

            if self.graph.is_interrupt_before(&node) && !entering_resumed_node {
                break Halt::Interrupted(node);
            }
            entering_resumed_node = false;

            if let Some(limit) = self.config.recursion_limit {
                if steps.len() >= limit {
                    return Err(HitlError::RecursionLimit { limit });
                }
            }

            let (next_checkpoint, record) = self.execute_step(&checkpoint, &node)?;
            self.store.save(thread_id, next_checkpoint.clone()).await?;
            log::debug!(
                "Thread '{}' step {}: ran '{}', next {:?}",
                thread_id,
                next_checkpoint.step,
                node,
                next_checkpoint.next
            );

            checkpoint = next_checkpoint;
            steps.push(record);
        };

        match &halted_at {
            Halt::Interrupted(node) => {
                log::info!("Thread '{}' paused before '{}'", thread_id, node)
            }
            Halt::Completed => log::info!("Thread '{}' completed", thread_id),
        }

        Ok(RunOutcome {
            snapshot: checkpoint.state,
            halted_at,
            steps,
            checkpoint_id: checkpoint.checkpoint_id,
        })
    }

    /// Run one node against the checkpointed state.
    ///
    /// Nothing is persisted here; a failure leaves the caller's checkpoint as
    /// the latest one.
    fn execute_step(
        &self,
        checkpoint: &Checkpoint,
        node: &str,
    ) -> Result<(Checkpoint, StepRecord)> {
        let implementation = self
            .graph
            .node(node)
            .ok_or_else(|| HitlError::node(node, "node is not part of this graph"))?;

        let update = implementation
            .run(&checkpoint.state)
            .map_err(|e| HitlError::node(node, e))?;

        let mut state = checkpoint.state.clone();
        state
            .merge(self.graph.schema(), update.clone())
            .map_err(|e| HitlError::node(node, e))?;

        let next = self.graph.next_node(node)?;

        let record = StepRecord {
            node: node.to_string(),
            update,
        };
        Ok((
            Checkpoint::new(state, next.into(), checkpoint.step + 1),
            record,
        ))
    }

    /// Merge a partial update into a thread's stored state without running it
    pub async fn update_state(
        &self,
        thread_id: &str,
        update: StateUpdate,
    ) -> Result<StateSnapshot> {
        let checkpoint =
            mutator::apply(self.store.as_ref(), self.graph.schema(), thread_id, update).await?;
        Ok(self.snapshot_of(checkpoint))
    }

    /// Latest stored view of `thread_id`.
    ///
    /// Waits for any run call in progress on the thread, so intermediate
    /// checkpoints of a running call are never reported.
    pub async fn get_state(&self, thread_id: &str) -> Result<Option<StateSnapshot>> {
        let _lease = self.store.lock(thread_id).await;
        Ok(self
            .store
            .load(thread_id)
            .await?
            .map(|checkpoint| self.snapshot_of(checkpoint)))
    }

    pub async fn status(&self, thread_id: &str) -> Result<ThreadStatus> {
        let _lease = self.store.lock(thread_id).await;
        Ok(match self.store.load(thread_id).await? {
            None => ThreadStatus::NoRun,
            Some(checkpoint) => status_of(&checkpoint),
        })
    }

    fn snapshot_of(&self, checkpoint: Checkpoint) -> StateSnapshot {
        StateSnapshot {
            status: status_of(&checkpoint),
            next: checkpoint.next.node_name().map(str::to_string),
            checkpoint_id: checkpoint.checkpoint_id,
            step: checkpoint.step,
            values: checkpoint.state,
        }
    }
}

fn status_of(checkpoint: &Checkpoint) -> ThreadStatus {
    match &checkpoint.next {
        NextNode::Terminal => ThreadStatus::Completed,
        NextNode::Node(name) => ThreadStatus::PausedAt(name.clone()),
    }
}
