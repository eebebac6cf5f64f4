// SPDX-License-Identifier: MIT

//! Human-in-the-loop workflow engine
//!
//! Runs a graph of nodes against a typed state, pausing before designated
//! nodes. Every step is checkpointed per thread id, so a paused thread can
//! be edited from outside and then resumed where it stopped.

pub mod error;
pub mod parity;
pub mod workflow;

pub use error::{HitlError, Result, StateError};
pub use workflow::checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore, NextNode};
pub use workflow::config::EngineConfig;
pub use workflow::graph::{
    Engine, GraphBuilder, GraphDefinition, Halt, NodeTarget, RunInput, RunOutcome, StateSnapshot,
    ThreadStatus, END,
};
pub use workflow::node::{FnNode, Node};
pub use workflow::state::{FieldType, StateFieldDef, StateSchema, StateUpdate, WorkflowState};
