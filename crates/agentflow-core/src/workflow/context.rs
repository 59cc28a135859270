//! Per-run accumulation of step outputs.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::skills::Payload;
use crate::workflow::variables::{Binding, Scope};

/// Outputs of the steps that have finished so far in one run, keyed by
/// step id, plus the workflow's bound parameters. Append-only: an id is
/// recorded once, either with its output or as failed.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    parameters: HashMap<String, Value>,
    outputs: HashMap<String, Value>,
    failed: HashSet<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose parameter roots resolve to `parameters`.
    pub fn with_parameters(parameters: &Payload) -> Self {
        Self {
            parameters: parameters
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn record_output(&mut self, step_id: &str, output: Payload) {
        self.failed.remove(step_id);
        self.outputs.insert(step_id.to_string(), Value::Object(output));
    }

    pub fn record_failure(&mut self, step_id: &str) {
        self.outputs.remove(step_id);
        self.failed.insert(step_id.to_string());
    }
}

impl Scope for ExecutionContext {
    fn bind(&self, root: &str) -> Binding<'_> {
        if let Some(output) = self.outputs.get(root) {
            Binding::Bound(output)
        } else if let Some(value) = self.parameters.get(root) {
            Binding::Bound(value)
        } else if self.failed.contains(root) {
            Binding::Unbound(format!("step '{}' failed and produced no output", root))
        } else {
            Binding::Unbound(format!("no completed step with id '{}'", root))
        }
    }
}
