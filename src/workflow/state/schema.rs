// SPDX-License-Identifier: MIT

//! State schema definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::StateError;

/// Schema defining the workflow state structure
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: HashMap<String, StateFieldDef>,
}

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StateFieldDef {
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the initial state must supply this field
    #[serde(default)]
    pub required: bool,
    /// Default value
    pub default: Option<Value>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldType {
    /// Check whether a JSON value has this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Any => "any",
        }
    }
}

impl StateFieldDef {
    /// A field the initial state must supply
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            default: None,
        }
    }

    /// A field that may be absent or null
    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field, replacing any previous declaration with the same name
    pub fn with_field(mut self, name: impl Into<String>, def: StateFieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&StateFieldDef> {
        self.fields.get(name)
    }

    /// Check that `value` may be written to field `key`
    pub fn validate(&self, key: &str, value: &Value) -> Result<(), StateError> {
        let def = self
            .fields
            .get(key)
            .ok_or_else(|| StateError::UnknownField(key.to_string()))?;

        if value.is_null() && !def.required {
            return Ok(());
        }

        if def.field_type.accepts(value) {
            Ok(())
        } else {
            Err(StateError::TypeMismatch {
                field: key.to_string(),
                expected: def.field_type.as_str().to_string(),
                actual: json_type_name(value).to_string(),
            })
        }
    }

    /// Names of the fields the initial state must supply
    pub fn required_fields(&self) -> impl Iterator<Item = &String> {
        self.fields
            .iter()
            .filter(|(_, def)| def.required)
            .map(|(name, _)| name)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_schema_deserialize() {
        let yaml = r#"
            number:
              type: integer
              required: true
            prediction:
              type: string
            attempts:
              type: number
              default: 0
        "#;
        let schema: StateSchema = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields["number"].field_type, FieldType::Integer);
        assert!(schema.fields["number"].required);
        assert!(!schema.fields["prediction"].required);
        assert_eq!(schema.fields["attempts"].default, Some(json!(0)));
    }

    #[test]
    fn test_field_types() {
        let yaml = r#"
            str_field: { type: string }
            num_field: { type: number }
            int_field: { type: integer }
            bool_field: { type: boolean }
            arr_field: { type: array }
            obj_field: { type: object }
            any_field: { type: any }
        "#;
        let schema: StateSchema = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(schema.fields["str_field"].field_type, FieldType::String);
        assert_eq!(schema.fields["num_field"].field_type, FieldType::Number);
        assert_eq!(schema.fields["int_field"].field_type, FieldType::Integer);
        assert_eq!(schema.fields["bool_field"].field_type, FieldType::Boolean);
        assert_eq!(schema.fields["arr_field"].field_type, FieldType::Array);
        assert_eq!(schema.fields["obj_field"].field_type, FieldType::Object);
        assert_eq!(schema.fields["any_field"].field_type, FieldType::Any);
    }

    #[test]
    fn test_validate_unknown_field() {
        let schema = StateSchema::new().with_field("a", StateFieldDef::optional(FieldType::String));
        assert_eq!(
            schema.validate("b", &json!("x")),
            Err(StateError::UnknownField("b".to_string()))
        );
    }

    #[test]
    fn test_validate_type_mismatch() {
        let schema =
            StateSchema::new().with_field("number", StateFieldDef::required(FieldType::Integer));

        assert!(schema.validate("number", &json!(4)).is_ok());
        assert_eq!(
            schema.validate("number", &json!(4.5)),
            Err(StateError::TypeMismatch {
                field: "number".to_string(),
                expected: "integer".to_string(),
                actual: "number".to_string(),
            })
        );
        assert!(schema.validate("number", &json!("4")).is_err());
    }

    #[test]
    fn test_null_only_for_optional() {
        let schema = StateSchema::new()
            .with_field("req", StateFieldDef::required(FieldType::String))
            .with_field("opt", StateFieldDef::optional(FieldType::String));

        assert!(schema.validate("opt", &Value::Null).is_ok());
        assert!(schema.validate("req", &Value::Null).is_err());
    }

    #[test]
    fn test_required_fields() {
        let schema = StateSchema::new()
            .with_field("a", StateFieldDef::required(FieldType::Any))
            .with_field("b", StateFieldDef::optional(FieldType::Any));

        let required: Vec<&String> = schema.required_fields().collect();
        assert_eq!(required, vec!["a"]);
    }
}
