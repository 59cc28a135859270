//! Skill descriptors and input schema validation.
//!
//! Descriptors are plain data: they are what the registry exports to
//! discovery UIs and to the planning collaborator, never the executable
//! skill itself.
//!
//! ```yaml
//! name: "search"
//! description: "Hybrid keyword + vector search"
//! input_schema:
//!   query: { type: string, required: true }
//!   limit: { type: integer, default: 10 }
//! output_schema:
//!   results: { type: array }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FlowError;
use crate::skills::Payload;

/// Declared type of an input field or template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    #[default]
    Any,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Any => "any",
        }
    }

    /// Whether `value` inhabits this type. `Integer` accepts only whole
    /// numbers; `Number` accepts any JSON number.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Any => true,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema entry for one input field (also used for template parameters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldSpec {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            ..Default::default()
        }
    }

    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Default::default()
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Schema entry for one output field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OutputField {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OutputField {
    pub fn new(field_type: FieldType, description: impl Into<String>) -> Self {
        Self {
            field_type,
            description: Some(description.into()),
        }
    }
}

/// Read-only description of a skill: its name and declared schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub input_schema: BTreeMap<String, FieldSpec>,

    #[serde(default)]
    pub output_schema: BTreeMap<String, OutputField>,

    /// A closed schema rejects input fields it does not declare.
    #[serde(default)]
    pub closed: bool,
}

impl SkillDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: BTreeMap::new(),
            output_schema: BTreeMap::new(),
            closed: false,
        }
    }

    pub fn input(mut self, field: impl Into<String>, spec: FieldSpec) -> Self {
        self.input_schema.insert(field.into(), spec);
        self
    }

    pub fn output(mut self, field: impl Into<String>, spec: OutputField) -> Self {
        self.output_schema.insert(field.into(), spec);
        self
    }

    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }

    /// Names of the fields that must be present in every input.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.input_schema
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }

    /// Validate a resolved input against `input_schema`, filling defaults.
    ///
    /// Required fields must be present; absent optional fields with a
    /// default get it; present fields are type-checked (an explicit null
    /// is accepted for optional fields). Unknown fields pass through
    /// unless the schema is closed.
    pub fn validate_input(&self, mut input: Payload) -> Result<Payload, FlowError> {
        for (field, spec) in &self.input_schema {
            match input.get(field) {
                Some(Value::Null) if !spec.required => {}
                Some(value) => check_type(&self.name, field, spec.field_type, value)?,
                None if spec.required => {
                    return Err(FlowError::SchemaValidation(format!(
                        "skill '{}' requires field '{}'",
                        self.name, field
                    )));
                }
                None => {
                    if let Some(ref default) = spec.default {
                        input.insert(field.clone(), default.clone());
                    }
                }
            }
        }

        if self.closed {
            if let Some(unknown) = input.keys().find(|k| !self.input_schema.contains_key(*k)) {
                return Err(FlowError::SchemaValidation(format!(
                    "skill '{}' does not accept field '{}'",
                    self.name, unknown
                )));
            }
        }

        Ok(input)
    }
}

/// Type-check one value against its declared type.
pub fn check_type(
    owner: &str,
    field: &str,
    expected: FieldType,
    value: &Value,
) -> Result<(), FlowError> {
    if expected.accepts(value) {
        Ok(())
    } else {
        Err(FlowError::SchemaValidation(format!(
            "'{}' field '{}' expected {}, got {}",
            owner,
            field,
            expected,
            json_type_name(value)
        )))
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
