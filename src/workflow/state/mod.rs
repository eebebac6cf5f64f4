// SPDX-License-Identifier: MIT

//! State management for graph workflows
//!
//! This module provides:
//! - `StateSchema` - defines the shape and types of workflow state
//! - `WorkflowState` - runtime state storage with validated merge-updates
//! - `StateUpdate` - the partial state a node or caller writes

mod schema;
mod store;

pub use schema::{FieldType, StateFieldDef, StateSchema};
pub use store::{StateUpdate, WorkflowState};
