//! Graph loader - YAML file loading and parsing
//!
//! A graph file names its nodes, edges, entry point and interrupt points.
//! Node implementations are looked up in a [`NodeRegistry`] by name.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{HitlError, Result};
use crate::workflow::graph::{Edge, GraphBuilder, GraphDefinition};
use crate::workflow::registry::NodeRegistry;
use crate::workflow::state::StateSchema;

/// Graph file contents
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// State schema for the graph
    #[serde(default)]
    pub state: StateSchema,
    /// Entry node name
    pub entry: String,
    /// Node names, in declaration order
    pub nodes: Vec<String>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Nodes at which execution pauses before running
    #[serde(default)]
    pub interrupt_before: Vec<String>,
}

impl GraphConfig {
    /// Resolve node names and build a validated graph
    pub async fn into_graph(self, registry: &NodeRegistry) -> Result<GraphDefinition> {
        let mut builder = GraphBuilder::new(self.state)
            .name(self.name)
            .set_entry_point(self.entry)
            .interrupt_before(self.interrupt_before);

        for name in &self.nodes {
            let node = registry.get(name).await.ok_or_else(|| {
                HitlError::validation(format!("No implementation registered for node '{}'", name))
            })?;
            builder = builder.add_node(node);
        }

        for edge in self.edges {
            builder = builder.add_edge(edge.from, edge.to);
        }

        builder.build()
    }
}

/// Loads graph definitions from YAML files
pub struct GraphLoader;

impl GraphLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a graph definition from a YAML file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<GraphConfig> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a graph definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<GraphConfig> {
        let config: GraphConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new()
    }
}
