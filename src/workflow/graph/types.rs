//! Graph type definitions
//!
//! This module defines the immutable graph produced by
//! [`GraphBuilder`](super::GraphBuilder).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{HitlError, Result};
use crate::workflow::node::Node;
use crate::workflow::state::StateSchema;

/// Terminal marker as spelled in graph files
pub const END: &str = "__end__";

/// Where an edge leads: another node or the terminal marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeTarget {
    Node(String),
    End,
}

impl NodeTarget {
    pub fn node_name(&self) -> Option<&str> {
        match self {
            NodeTarget::Node(name) => Some(name),
            NodeTarget::End => None,
        }
    }
}

impl From<String> for NodeTarget {
    fn from(s: String) -> Self {
        if s == END {
            NodeTarget::End
        } else {
            NodeTarget::Node(s)
        }
    }
}

impl From<&str> for NodeTarget {
    fn from(s: &str) -> Self {
        NodeTarget::from(s.to_string())
    }
}

impl From<NodeTarget> for String {
    fn from(target: NodeTarget) -> Self {
        match target {
            NodeTarget::Node(name) => name,
            NodeTarget::End => END.to_string(),
        }
    }
}

impl fmt::Display for NodeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTarget::Node(name) => f.write_str(name),
            NodeTarget::End => f.write_str(END),
        }
    }
}

/// Directed, unconditional link between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: NodeTarget,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<NodeTarget>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Validated, immutable workflow graph
pub struct GraphDefinition {
    pub(crate) name: String,
    pub(crate) schema: StateSchema,
    pub(crate) entry: String,
    pub(crate) nodes: HashMap<String, Arc<dyn Node>>,
    pub(crate) node_order: Vec<String>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) interrupt_before: HashSet<String>,
}

impl GraphDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Entry node name
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Look up a node implementation
    pub fn node(&self, name: &str) -> Option<&Arc<dyn Node>> {
        self.nodes.get(name)
    }

    /// Node names in declaration order
    pub fn node_names(&self) -> &[String] {
        &self.node_order
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Outgoing edges of `node`, in declaration order
    pub fn outgoing<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.from == node)
    }

    /// Follow the single outgoing edge of `current`.
    ///
    /// Only linear chains are supported: zero or several outgoing edges is a
    /// structure error.
    pub fn next_node(&self, current: &str) -> Result<NodeTarget> {
        let mut outgoing = self.outgoing(current);
        match (outgoing.next(), outgoing.next()) {
            (Some(edge), None) => Ok(edge.to.clone()),
            (None, _) => Err(HitlError::GraphStructure {
                node: current.to_string(),
                edges: 0,
            }),
            (Some(_), Some(_)) => Err(HitlError::GraphStructure {
                node: current.to_string(),
                edges: self.outgoing(current).count(),
            }),
        }
    }

    pub fn is_interrupt_before(&self, node: &str) -> bool {
        self.interrupt_before.contains(node)
    }

    /// Interrupt-before node names, sorted
    pub fn interrupt_nodes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.interrupt_before.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for GraphDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphDefinition")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("nodes", &self.node_order)
            .field("edges", &self.edges)
            .field("interrupt_before", &self.interrupt_nodes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::graph::GraphBuilder;
    use crate::workflow::node::FnNode;
    use crate::workflow::state::{StateUpdate, WorkflowState};

    #[test]
    fn test_node_target_from_str() {
        assert_eq!(NodeTarget::from("__end__"), NodeTarget::End);
        assert_eq!(
            NodeTarget::from("review"),
            NodeTarget::Node("review".to_string())
        );
        assert_eq!(NodeTarget::End.node_name(), None);
        assert_eq!(NodeTarget::from("a").node_name(), Some("a"));
    }

    #[test]
    fn test_edge_deserialize() {
        let yaml = r#"
            - from: predict
              to: review
            - from: review
              to: __end__
        "#;
        let edges: Vec<Edge> = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(edges[0], Edge::new("predict", "review"));
        assert_eq!(edges[1], Edge::new("review", NodeTarget::End));
    }

    #[test]
    fn test_outgoing_and_next_node() {
        let graph = GraphBuilder::new(StateSchema::new())
            .add_node(Arc::new(FnNode::new("a", |_: &WorkflowState| Ok(StateUpdate::new()))))
            .add_node(Arc::new(FnNode::new("b", |_: &WorkflowState| Ok(StateUpdate::new()))))
            .add_edge("a", "b")
            .add_edge("a", END)
            .add_edge("b", END)
            .set_entry_point("a")
            .build()
            .unwrap();

        // The queried name is a temporary that the iterator borrows.
        let from_a = graph.outgoing(&String::from("a")).count();
        assert_eq!(from_a, 2);

        assert_eq!(graph.next_node("b").unwrap(), NodeTarget::End);
        assert!(matches!(
            graph.next_node("a"),
            Err(HitlError::GraphStructure { edges: 2, .. })
        ));
    }

    #[test]
    fn test_node_target_display() {
        assert_eq!(NodeTarget::End.to_string(), "__end__");
        assert_eq!(NodeTarget::from("predict").to_string(), "predict");
    }
}
