// SPDX-License-Identifier: MIT

//! Typed error handling for hitl-graph
//!
//! Every error is returned to the immediate caller. The engine never logs
//! or swallows the errors it produces, and it never retries.

use thiserror::Error;

/// Boxed error produced by a node function
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used across the crate
pub type Result<T, E = HitlError> = std::result::Result<T, E>;

/// Top-level error type for hitl-graph
#[derive(Debug, Error)]
pub enum HitlError {
    /// Malformed graph, detected when the graph is built
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// A node has zero or several outgoing edges at traversal time
    #[error("Node '{node}' has {edges} outgoing edges, expected exactly one")]
    GraphStructure { node: String, edges: usize },

    /// Resume or mutate on a thread with no checkpoint
    #[error("Unknown thread: {0}")]
    UnknownThread(String),

    /// Resume on a thread that already reached the terminal marker
    #[error("Thread '{0}' has already completed")]
    AlreadyCompleted(String),

    /// A node function failed, or its update was rejected by the schema
    #[error("Node '{node}' failed: {source}")]
    NodeExecution {
        node: String,
        #[source]
        source: BoxError,
    },

    /// Invalid state input or update
    #[error(transparent)]
    State(#[from] StateError),

    /// Too many node executions in a single call
    #[error("Recursion limit of {limit} steps reached")]
    RecursionLimit { limit: usize },

    /// Configuration errors (bad env vars, invalid graph files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised when writing to a [`WorkflowState`](crate::workflow::state::WorkflowState)
#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    /// Field is not declared in the state schema
    #[error("Field '{0}' is not declared in the state schema")]
    UnknownField(String),

    /// Value does not match the declared field type
    #[error("Field '{field}' expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Required field missing from the initial state
    #[error("Required field '{0}' is missing")]
    MissingRequired(String),
}

impl HitlError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap a node failure
    pub fn node(node: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            source: source.into(),
        }
    }
}
