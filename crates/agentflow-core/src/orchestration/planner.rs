//! Planning collaborator: turns a free-form request into candidate steps.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::FlowError;
use crate::llm::{ChatModel, ChatRequest};
use crate::skills::SkillDescriptor;
use crate::workflow::WorkflowStep;

/// Proposes an ordered step list for a request, given the capabilities
/// currently registered. An empty list means "cannot plan".
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        request: &str,
        skills: &[SkillDescriptor],
    ) -> Result<Vec<WorkflowStep>, FlowError>;
}

const PLANNER_SYSTEM_PROMPT: &str = r#"You are a workflow planner. Break the user's request into an ordered list of skill invocations using ONLY the skills listed.

Respond with a JSON array and nothing else. Each element is an object:
  {"skill": "<skill name>", "id": "<optional step id>", "input": { ... }, "on_error": "stop" | "continue"}

Rules:
- Supply every required input field of the chosen skill.
- To use an earlier step's output, write "{{ <step id>.<field> }}" inside a string value. Steps without an explicit id are named step_1, step_2, ... by position.
- A step may only reference steps that come before it.
- If the request cannot be served with the listed skills, respond with []."#;

/// [`Planner`] backed by a chat model.
pub struct LlmPlanner {
    model: Arc<dyn ChatModel>,
}

impl LlmPlanner {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    fn build_prompt(request: &str, skills: &[SkillDescriptor]) -> Result<String, FlowError> {
        let catalog = serde_json::to_string_pretty(skills)
            .map_err(|e| FlowError::InvalidPlan(format!("Failed to encode skills: {}", e)))?;
        Ok(format!(
            "## Available skills\n\n{}\n\n## Request\n\n{}",
            catalog, request
        ))
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(
        &self,
        request: &str,
        skills: &[SkillDescriptor],
    ) -> Result<Vec<WorkflowStep>, FlowError> {
        let prompt = Self::build_prompt(request, skills)?;
        let chat = ChatRequest::new(prompt).with_system(PLANNER_SYSTEM_PROMPT);

        let response = self
            .model
            .complete(&chat)
            .await
            .map_err(|e| FlowError::InvalidPlan(format!("planner call failed: {}", e)))?;

        tracing::debug!("[Planner] Raw plan: {}", response.content);
        parse_plan(&response.content)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanDocument {
    Steps(Vec<WorkflowStep>),
    Wrapped { steps: Vec<WorkflowStep> },
}

/// Parse a model reply into steps. Accepts a bare array, an object with a
/// `steps` array, and either one wrapped in a markdown code fence.
pub fn parse_plan(text: &str) -> Result<Vec<WorkflowStep>, FlowError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<PlanDocument>(body) {
        Ok(PlanDocument::Steps(steps)) | Ok(PlanDocument::Wrapped { steps }) => Ok(steps),
        Err(e) => Err(FlowError::InvalidPlan(format!(
            "planner reply is not a step list: {}",
            e
        ))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```json) up to the first newline.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}
