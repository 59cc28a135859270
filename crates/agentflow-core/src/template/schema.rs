//! Template definition types.
//!
//! ```yaml
//! id: research_report
//! name: "Research Report"
//! description: "Search, then summarize the hits"
//! parameters:
//!   query: { type: string, required: true }
//!   limit: { type: integer, default: 5 }
//! steps:
//!   - skill: search
//!     id: hits
//!     input:
//!       query: "{{ query }}"
//!       limit: "{{ limit }}"
//!   - skill: llm
//!     input:
//!       prompt: "Summarize for '{{ query }}': {{ hits.results }}"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::skills::FieldSpec;
use crate::workflow::WorkflowStep;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Catalog key; overwritten by the id passed to `register_template`
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub parameters: BTreeMap<String, FieldSpec>,

    pub steps: Vec<WorkflowStep>,
}

impl Template {
    /// Parse a template definition from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, FlowError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| FlowError::Parse(format!("Failed to parse template YAML: {}", e)))
    }

    /// Parse a template definition from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        serde_json::from_str(json)
            .map_err(|e| FlowError::Parse(format!("Failed to parse template JSON: {}", e)))
    }

    pub fn info(&self) -> TemplateInfo {
        TemplateInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            step_count: self.steps.len(),
        }
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Parameter schema and size of a template, without its steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, FieldSpec>,
    pub step_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}
