// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! This module provides the graph definition, its builder, and the
//! checkpointed executor that runs nodes one step at a time.

mod builder;
pub mod executor;
pub mod types;

pub use builder::GraphBuilder;
pub use executor::{Engine, Halt, RunInput, RunOutcome, StateSnapshot, StepRecord, ThreadStatus};
pub use types::{Edge, GraphDefinition, NodeTarget, END};
