//! Workflow definition types.
//!
//! A workflow is an ordered list of skill invocations. Later steps read
//! earlier outputs through `{{ step_id.field }}` expressions:
//!
//! ```yaml
//! name: "Research Brief"
//! steps:
//!   - skill: search
//!     id: hits
//!     input:
//!       query: "rust async runtimes"
//!       limit: 5
//!
//!   - skill: llm
//!     id: brief
//!     on_error: continue
//!     input:
//!       prompt: "Summarize: {{ hits.results }}"
//!
//!   - skill: echo
//!     input:
//!       top: "{{ hits.results[0] }}"
//! ```
//!
//! A workflow may also carry `parameters`: named values that expressions
//! reach as `{{ name }}`, resolved in the same pass as step outputs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::skills::Payload;

/// What the engine does after a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Skip every remaining step (default)
    #[default]
    Stop,
    /// Keep running the remaining steps
    Continue,
}

/// One skill invocation within a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Registry name of the skill to invoke
    pub skill: String,

    /// Step id, unique within the workflow; `step_<n>` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Input values; strings may contain `{{ }}` expressions
    #[serde(default)]
    pub input: Payload,

    #[serde(default)]
    pub on_error: OnError,
}

impl WorkflowStep {
    pub fn new(skill: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            id: None,
            input: Payload::new(),
            on_error: OnError::Stop,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.input.insert(key.into(), value);
        self
    }

    pub fn on_error(mut self, policy: OnError) -> Self {
        self.on_error = policy;
        self
    }
}

/// A concrete, ready-to-run sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Bound parameter values, addressable by name from any step input
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub parameters: Payload,

    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: Payload::new(),
            steps,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Parse a workflow definition from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, FlowError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| FlowError::Parse(format!("Failed to parse workflow YAML: {}", e)))
    }

    /// Parse a workflow definition from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        serde_json::from_str(json)
            .map_err(|e| FlowError::Parse(format!("Failed to parse workflow JSON: {}", e)))
    }

    /// Effective ids of all steps, in order. A parameter may not share a
    /// name with a step.
    pub fn step_ids(&self) -> Result<Vec<String>, FlowError> {
        let ids = assign_step_ids(&self.steps)?;
        if let Some(clash) = ids.iter().find(|id| self.parameters.contains_key(id.as_str())) {
            return Err(FlowError::SchemaValidation(format!(
                "parameter '{}' has the same name as a step",
                clash
            )));
        }
        Ok(ids)
    }
}

/// Compute the effective id of every step.
///
/// Explicit ids must be unique. A step without an id gets `step_<n>`
/// (1-based position), suffixed with `_<k>` if an explicit id already
/// took that name.
pub fn assign_step_ids(steps: &[WorkflowStep]) -> Result<Vec<String>, FlowError> {
    let mut taken: HashSet<&str> = HashSet::new();
    for id in steps.iter().filter_map(|s| s.id.as_deref()) {
        if !taken.insert(id) {
            return Err(FlowError::SchemaValidation(format!(
                "duplicate step id '{}'",
                id
            )));
        }
    }

    let mut generated: HashSet<String> = HashSet::new();
    let mut ids = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        match step.id {
            Some(ref id) => ids.push(id.clone()),
            None => {
                let base = format!("step_{}", i + 1);
                let mut candidate = base.clone();
                let mut k = 2;
                while taken.contains(candidate.as_str()) || generated.contains(&candidate) {
                    candidate = format!("{}_{}", base, k);
                    k += 1;
                }
                generated.insert(candidate.clone());
                ids.push(candidate);
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_workflow() {
        let yaml = r#"
name: "Test Flow"
steps:
  - skill: echo
    input:
      text: "Hello, world!"
"#;
        let wf = Workflow::from_yaml(yaml).unwrap();
        assert_eq!(wf.name, "Test Flow");
        assert_eq!(wf.steps.len(), 1);
        assert_eq!(wf.steps[0].skill, "echo");
        assert_eq!(wf.steps[0].on_error, OnError::Stop);
        assert_eq!(wf.steps[0].input["text"], json!("Hello, world!"));
    }

    #[test]
    fn test_parse_full_workflow() {
        let yaml = r#"
name: "Research"
description: "Search then summarize"
steps:
  - skill: search
    id: hits
    input:
      query: "rust"
      filters: { lang: en, years: [2024, 2025] }
  - skill: llm
    on_error: continue
    input:
      prompt: "Summarize {{ hits.results }}"
"#;
        let wf = Workflow::from_yaml(yaml).unwrap();
        assert_eq!(wf.description.as_deref(), Some("Search then summarize"));
        assert_eq!(wf.steps[0].input["filters"]["years"], json!([2024, 2025]));
        assert_eq!(wf.steps[1].on_error, OnError::Continue);
        assert_eq!(wf.step_ids().unwrap(), vec!["hits", "step_2"]);
    }

    #[test]
    fn test_parameters_parse_and_must_not_shadow_steps() {
        let yaml = r#"
name: "Params"
parameters:
  topic: "rust"
steps:
  - skill: echo
    id: topic
    input: { q: "{{ topic }}" }
"#;
        let wf = Workflow::from_yaml(yaml).unwrap();
        assert_eq!(wf.parameters["topic"], json!("rust"));
        assert_eq!(wf.step_ids().unwrap_err().kind(), "schema_validation");

        let wf = Workflow::new("ok", vec![WorkflowStep::new("echo")]).with_parameter("topic", json!(1));
        assert_eq!(wf.step_ids().unwrap(), vec!["step_1"]);
    }

    #[test]
    fn test_bad_yaml_is_parse_error() {
        let err = Workflow::from_yaml("name: x\nsteps: 3").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let steps = vec![
            WorkflowStep::new("echo").with_id("a"),
            WorkflowStep::new("echo").with_id("a"),
        ];
        assert!(assign_step_ids(&steps).is_err());
    }

    #[test]
    fn test_generated_ids_avoid_explicit_ones() {
        let steps = vec![
            WorkflowStep::new("echo"),
            WorkflowStep::new("echo").with_id("step_1"),
        ];
        assert_eq!(assign_step_ids(&steps).unwrap(), vec!["step_1_2", "step_1"]);
    }
}
