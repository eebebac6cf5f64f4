// SPDX-License-Identifier: MIT

//! Parity review demo
//!
//! Two nodes: `predict` guesses whether `number` is even or odd, then the
//! graph pauses before `human_review` so a person can confirm or reject the
//! guess through the `human_feedback` field.

use serde_json::json;
use std::sync::Arc;

use crate::error::{BoxError, Result};
use crate::workflow::graph::{GraphBuilder, GraphDefinition, END};
use crate::workflow::node::Node;
use crate::workflow::registry::NodeRegistry;
use crate::workflow::state::{FieldType, StateFieldDef, StateSchema, StateUpdate, WorkflowState};

pub const PREDICT: &str = "predict";
pub const HUMAN_REVIEW: &str = "human_review";

/// Feedback value that accepts the prediction; anything else rejects it
pub const CONFIRM: &str = "confirm";

pub fn schema() -> StateSchema {
    StateSchema::new()
        .with_field("number", StateFieldDef::required(FieldType::Integer))
        .with_field("prediction", StateFieldDef::optional(FieldType::String))
        .with_field("human_feedback", StateFieldDef::optional(FieldType::String))
        .with_field("final_result", StateFieldDef::optional(FieldType::String))
}

/// Canonical form of a typed or prompted review decision
pub fn normalize_feedback(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Predicts whether `number` is even or odd
pub struct PredictNode;

impl Node for PredictNode {
    fn name(&self) -> &str {
        PREDICT
    }

    fn run(&self, state: &WorkflowState) -> Result<StateUpdate, BoxError> {
        let number = state
            .get("number")
            .ok_or("state field 'number' must be an integer")?;
        let even = number
            .as_i64()
            .map(|n| n % 2 == 0)
            .or_else(|| number.as_u64().map(|n| n % 2 == 0))
            .ok_or("state field 'number' must be an integer")?;

        let prediction = if even { "even" } else { "odd" };

        let mut update = StateUpdate::new();
        update.insert("prediction".to_string(), json!(prediction));
        Ok(update)
    }
}

/// Turns the human feedback into a final result
pub struct HumanReviewNode;

impl Node for HumanReviewNode {
    fn name(&self) -> &str {
        HUMAN_REVIEW
    }

    fn run(&self, state: &WorkflowState) -> Result<StateUpdate, BoxError> {
        let prediction = state.get_str("prediction").unwrap_or_default();

        let final_result = if state.get_str("human_feedback") == Some(CONFIRM) {
            format!("Confirmed: {}", prediction)
        } else {
            let corrected = if prediction == "even" { "odd" } else { "even" };
            format!("User corrected to: {}", corrected)
        };

        let mut update = StateUpdate::new();
        update.insert("final_result".to_string(), json!(final_result));
        Ok(update)
    }
}

/// predict -> human_review -> END, interrupting before human_review
pub fn graph() -> Result<GraphDefinition> {
    GraphBuilder::new(schema())
        .name("parity")
        .add_node(Arc::new(PredictNode))
        .add_node(Arc::new(HumanReviewNode))
        .set_entry_point(PREDICT)
        .add_edge(PREDICT, HUMAN_REVIEW)
        .add_edge(HUMAN_REVIEW, END)
        .interrupt_before([HUMAN_REVIEW])
        .build()
}

/// Registry with both parity nodes, for graph files
pub async fn registry() -> Result<NodeRegistry> {
    let registry = NodeRegistry::new();
    registry.register(Arc::new(PredictNode)).await?;
    registry.register(Arc::new(HumanReviewNode)).await?;
    Ok(registry)
}
