//! Execution trace types returned by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FlowError;
use crate::workflow::schema::OnError;

/// Lifecycle of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Lifecycle of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub skill_name: String,
    pub status: StepStatus,
    pub output: Option<Value>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub on_error: OnError,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn completed(step_id: &str, skill: &str, on_error: OnError, output: Value, duration_ms: u64) -> Self {
        Self {
            step_id: step_id.to_string(),
            skill_name: skill.to_string(),
            status: StepStatus::Completed,
            output: Some(output),
            error: None,
            error_kind: None,
            on_error,
            duration_ms,
        }
    }

    pub fn failed(step_id: &str, skill: &str, on_error: OnError, error: &FlowError, duration_ms: u64) -> Self {
        Self {
            step_id: step_id.to_string(),
            skill_name: skill.to_string(),
            status: StepStatus::Failed,
            output: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
            on_error,
            duration_ms,
        }
    }

    pub fn skipped(step_id: &str, skill: &str, on_error: OnError) -> Self {
        Self {
            step_id: step_id.to_string(),
            skill_name: skill.to_string(),
            status: StepStatus::Skipped,
            output: None,
            error: None,
            error_kind: None,
            on_error,
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    pub workflow_name: String,
    pub status: RunStatus,
    /// Output of the last completed step
    pub result: Option<Value>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub steps_completed: usize,
    pub total_steps: usize,
    pub step_details: Vec<StepResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// A run that failed before any step executed.
    pub fn aborted(
        execution_id: String,
        workflow_name: &str,
        total_steps: usize,
        error: &FlowError,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            execution_id,
            workflow_name: workflow_name.to_string(),
            status: RunStatus::Failed,
            result: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
            steps_completed: 0,
            total_steps,
            step_details: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.step_details
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
    }
}
