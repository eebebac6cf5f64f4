// SPDX-License-Identifier: MIT

use crate::error::{HitlError, Result};
use crate::workflow::node::Node;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Node implementations by name, used to resolve graph files.
///
/// Each name maps to exactly one implementation: a graph file naming a node
/// must always resolve to the same code.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: Arc<RwLock<HashMap<String, Arc<dyn Node>>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` under its own name; a name can only be registered once
    pub async fn register(&self, node: Arc<dyn Node>) -> Result<()> {
        let name = node.name().to_string();
        if name.is_empty() {
            return Err(HitlError::config("node name must not be empty"));
        }

        let mut nodes = self.nodes.write().await;
        if nodes.contains_key(&name) {
            return Err(HitlError::config(format!(
                "node '{}' is already registered",
                name
            )));
        }
        log::debug!("Registered node '{}'", name);
        nodes.insert(name, node);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Node>> {
        let nodes = self.nodes.read().await;
        nodes.get(name).cloned()
    }

    /// Registered names, sorted
    pub async fn names(&self) -> Vec<String> {
        let nodes = self.nodes.read().await;
        let mut names: Vec<String> = nodes.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::node::FnNode;
    use crate::workflow::state::{StateUpdate, WorkflowState};
    use serde_json::json;

    fn mock(name: &str, marker: i64) -> Arc<dyn Node> {
        Arc::new(FnNode::new(name, move |_: &WorkflowState| {
            let mut update = StateUpdate::new();
            update.insert("marker".to_string(), json!(marker));
            Ok(update)
        }))
    }

    #[tokio::test]
    async fn test_register_and_get_node() {
        let registry = NodeRegistry::new();
        registry.register(mock("predict", 1)).await.unwrap();

        let retrieved = registry.get("predict").await.unwrap();
        assert_eq!(retrieved.name(), "predict");
        assert!(registry.get("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_keeps_first_node() {
        let registry = NodeRegistry::new();
        registry.register(mock("predict", 1)).await.unwrap();

        let err = registry.register(mock("predict", 2)).await.unwrap_err();
        assert!(matches!(err, HitlError::Config(ref msg) if msg.contains("already registered")));

        let node = registry.get("predict").await.unwrap();
        let update = node.run(&WorkflowState::empty()).unwrap();
        assert_eq!(update["marker"], json!(1));
        assert_eq!(registry.names().await, vec!["predict"]);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let registry = NodeRegistry::new();
        assert!(registry.register(mock("", 1)).await.is_err());
        assert!(registry.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_nodes() {
        let registry = NodeRegistry::new();
        registry.register(mock("a", 1)).await.unwrap();

        let cloned = registry.clone();
        cloned.register(mock("b", 2)).await.unwrap();
        assert_eq!(registry.names().await, vec!["a", "b"]);
    }
}
