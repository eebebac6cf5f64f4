// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::StateSchema;
use crate::error::StateError;

/// Partial state: only the supplied keys are written
pub type StateUpdate = Map<String, Value>;

/// Runtime workflow state, ordered by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowState {
    fields: Map<String, Value>,
}

impl WorkflowState {
    /// Create an empty WorkflowState
    pub fn empty() -> Self {
        Self { fields: Map::new() }
    }

    /// Build the starting state for a run: schema defaults, then `input`,
    /// then a check that every required field is present
    pub fn initial(schema: &StateSchema, input: StateUpdate) -> Result<Self, StateError> {
        let mut fields = Map::new();
        for (name, def) in &schema.fields {
            if let Some(default) = &def.default {
                fields.insert(name.clone(), default.clone());
            }
        }

        let mut state = Self { fields };
        state.merge(schema, input)?;

        for name in schema.required_fields() {
            match state.fields.get(name) {
                Some(value) if !value.is_null() => {}
                _ => return Err(StateError::MissingRequired(name.clone())),
            }
        }

        Ok(state)
    }

    /// Merge a partial update after validating every key against the schema.
    ///
    /// Either all keys are written or none are.
    pub fn merge(&mut self, schema: &StateSchema, update: StateUpdate) -> Result<(), StateError> {
        for (key, value) in &update {
            schema.validate(key, value)?;
        }
        self.apply(update);
        Ok(())
    }

    /// Merge a partial update without schema checks; keys in `update` win
    pub(crate) fn apply(&mut self, update: StateUpdate) {
        for (key, value) in update {
            self.fields.insert(key, value);
        }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a field as a string slice
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Get a nested field value using dot notation (e.g., "result.intent")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
