// SPDX-License-Identifier: MIT

//! Node capability
//!
//! A node is a named, pure computation from the current state to a partial
//! update. Nodes are built once and never change afterwards.

use std::fmt;

use crate::error::BoxError;
use crate::workflow::state::{StateUpdate, WorkflowState};

/// Core node trait for all graph steps
pub trait Node: Send + Sync {
    /// Returns the node name, unique within a graph
    fn name(&self) -> &str;

    /// Compute the partial update for the given state
    fn run(&self, state: &WorkflowState) -> Result<StateUpdate, BoxError>;
}

type NodeFn = dyn Fn(&WorkflowState) -> Result<StateUpdate, BoxError> + Send + Sync;

/// Node backed by a closure
pub struct FnNode {
    name: String,
    func: Box<NodeFn>,
}

impl FnNode {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&WorkflowState) -> Result<StateUpdate, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl Node for FnNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, state: &WorkflowState) -> Result<StateUpdate, BoxError> {
        (self.func)(state)
    }
}

impl fmt::Debug for FnNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnNode").field("name", &self.name).finish()
    }
}
