// SPDX-License-Identifier: MIT

//! Graph builder - validates and freezes a workflow graph

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::types::{Edge, GraphDefinition, NodeTarget, END};
use crate::error::{HitlError, Result};
use crate::workflow::node::Node;
use crate::workflow::state::StateSchema;

/// Collects nodes, edges and interrupt points, then validates them in
/// [`build`](GraphBuilder::build)
pub struct GraphBuilder {
    name: String,
    schema: StateSchema,
    entry: Option<String>,
    nodes: Vec<Arc<dyn Node>>,
    edges: Vec<Edge>,
    interrupt_before: Vec<String>,
}

impl GraphBuilder {
    pub fn new(schema: StateSchema) -> Self {
        Self {
            name: "graph".to_string(),
            schema,
            entry: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            interrupt_before: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn add_node(mut self, node: Arc<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<NodeTarget>) -> Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    pub fn set_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Pause execution immediately before each of these nodes
    pub fn interrupt_before<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interrupt_before
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Validate and freeze the graph
    pub fn build(self) -> Result<GraphDefinition> {
        let mut nodes: HashMap<String, Arc<dyn Node>> = HashMap::new();
        let mut node_order = Vec::with_capacity(self.nodes.len());

        for node in self.nodes {
            let name = node.name().to_string();
            if name.is_empty() || name == END {
                return Err(HitlError::validation(format!(
                    "'{}' is not a valid node name",
                    name
                )));
            }
            if nodes.contains_key(&name) {
                return Err(HitlError::validation(format!(
                    "Node '{}' is declared more than once",
                    name
                )));
            }
            node_order.push(name.clone());
            nodes.insert(name, node);
        }

        let entry = self
            .entry
            .ok_or_else(|| HitlError::validation("No entry point set"))?;
        if !nodes.contains_key(&entry) {
            return Err(HitlError::validation(format!(
                "Entry point '{}' is not a declared node",
                entry
            )));
        }

        for edge in &self.edges {
            if !nodes.contains_key(&edge.from) {
                return Err(HitlError::validation(format!(
                    "Edge source '{}' is not a declared node",
                    edge.from
                )));
            }
            if let NodeTarget::Node(to) = &edge.to {
                if !nodes.contains_key(to) {
                    return Err(HitlError::validation(format!(
                        "Edge target '{}' is not a declared node",
                        to
                    )));
                }
            }
        }

        let interrupt_before: HashSet<String> = self.interrupt_before.into_iter().collect();
        if let Some(unknown) = interrupt_before.iter().find(|n| !nodes.contains_key(*n)) {
            return Err(HitlError::validation(format!(
                "Interrupt node '{}' is not a declared node",
                unknown
            )));
        }

        check_terminates(&entry, &self.edges)?;

        log::debug!(
            "Built graph '{}' with {} nodes, {} edges, entry '{}'",
            self.name,
            node_order.len(),
            self.edges.len(),
            entry
        );

        Ok(GraphDefinition {
            name: self.name,
            schema: self.schema,
            entry,
            nodes,
            node_order,
            edges: self.edges,
            interrupt_before,
        })
    }
}

/// Every node reachable from `entry` must have some path to the terminal marker
fn check_terminates(entry: &str, edges: &[Edge]) -> Result<()> {
    // Walk backwards from the terminal marker to find nodes that can finish.
    let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut can_finish: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for edge in edges {
        match &edge.to {
            NodeTarget::End => {
                if can_finish.insert(edge.from.as_str()) {
                    queue.push_back(edge.from.as_str());
                }
            }
            NodeTarget::Node(to) => reverse
                .entry(to.as_str())
                .or_default()
                .push(edge.from.as_str()),
        }
    }

    while let Some(node) = queue.pop_front() {
        for &pred in reverse.get(node).into_iter().flatten() {
            if can_finish.insert(pred) {
                queue.push_back(pred);
            }
        }
    }

    // Then walk forwards from the entry and check every visited node.
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([entry]);
    visited.insert(entry);

    while let Some(node) = queue.pop_front() {
        if !can_finish.contains(node) {
            return Err(HitlError::validation(format!(
                "Node '{}' is reachable from the entry but never reaches {}",
                node, END
            )));
        }
        for edge in edges.iter().filter(|e| e.from == node) {
            if let NodeTarget::Node(to) = &edge.to {
                if visited.insert(to.as_str()) {
                    queue.push_back(to.as_str());
                }
            }
        }
    }

    Ok(())
}
