//! AgentOrchestrator - routes a request to a template or to an LLM plan.
//!
//! ```text
//! execute_request(type, params)
//!   ├─ TemplateEngine has `type`  → instantiate ──────────────┐
//!   └─ otherwise → Planner::plan(request, descriptors)        │
//!                    → validate_plan (skills exist,           │
//!                      required fields present)               │
//!                    → anonymous Workflow ────────────────────┤
//!                                                             ▼
//!                                                   WorkflowEngine::run
//! ```
//!
//! Failures before the first step (bad parameters, no planner, empty or
//! invalid plan) come back as a failed [`ExecutionResult`] with no
//! step details. Nothing here returns a raw error to the caller.

pub mod planner;

pub use planner::{parse_plan, LlmPlanner, Planner};

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::FlowError;
use crate::skills::{Payload, SkillRegistry};
use crate::template::TemplateEngine;
use crate::workflow::{assign_step_ids, ExecutionResult, Workflow, WorkflowEngine, WorkflowStep};

pub struct AgentOrchestrator {
    registry: Arc<SkillRegistry>,
    templates: Arc<TemplateEngine>,
    engine: WorkflowEngine,
    planner: Option<Arc<dyn Planner>>,
}

impl AgentOrchestrator {
    /// Build an orchestrator whose engine runs against `registry`.
    pub fn new(registry: Arc<SkillRegistry>, templates: Arc<TemplateEngine>) -> Self {
        Self {
            engine: WorkflowEngine::new(registry.clone()),
            registry,
            templates,
            planner: None,
        }
    }

    /// Use a preconfigured engine (for example one with observers attached).
    pub fn with_engine(mut self, engine: WorkflowEngine) -> Self {
        self.registry = engine.registry().clone();
        self.engine = engine;
        self
    }

    /// Enable the adaptive path.
    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    pub fn templates(&self) -> &Arc<TemplateEngine> {
        &self.templates
    }

    pub fn has_planner(&self) -> bool {
        self.planner.is_some()
    }

    pub async fn execute_request(&self, request_type: &str, parameters: &Payload) -> ExecutionResult {
        self.execute_request_with_cancellation(request_type, parameters, &CancellationToken::new())
            .await
    }

    pub async fn execute_request_with_cancellation(
        &self,
        request_type: &str,
        parameters: &Payload,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let started_at = Utc::now();

        let workflow = if self.templates.has_template(request_type) {
            tracing::info!("[Orchestrator] Template match: {}", request_type);
            self.templates.instantiate(request_type, parameters)
        } else {
            tracing::info!(
                "[Orchestrator] No template for '{}', planning adaptively",
                request_type
            );
            self.plan_workflow(request_type, parameters).await
        };

        match workflow {
            Ok(workflow) => self.engine.run_with_cancellation(&workflow, cancel).await,
            Err(e) => {
                tracing::warn!("[Orchestrator] Request '{}' aborted: {}", request_type, e);
                ExecutionResult::aborted(
                    Uuid::new_v4().to_string(),
                    request_type,
                    0,
                    &e,
                    started_at,
                )
            }
        }
    }

    /// Run a caller-supplied workflow, bypassing templates and planning.
    pub async fn execute_workflow(&self, workflow: &Workflow) -> ExecutionResult {
        self.engine.run(workflow).await
    }

    pub async fn execute_workflow_with_cancellation(
        &self,
        workflow: &Workflow,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        self.engine.run_with_cancellation(workflow, cancel).await
    }

    /// Static check of candidate steps against the registry: every skill
    /// must exist, every required input field must be present, and step
    /// ids must be unique. Nothing is executed.
    pub fn validate_plan(&self, steps: &[WorkflowStep]) -> Result<(), FlowError> {
        if steps.is_empty() {
            return Err(FlowError::InvalidPlan("plan has no steps".to_string()));
        }

        let ids = assign_step_ids(steps).map_err(|e| FlowError::InvalidPlan(e.to_string()))?;

        for (step, id) in steps.iter().zip(&ids) {
            let descriptor = self.registry.descriptor(&step.skill).ok_or_else(|| {
                FlowError::InvalidPlan(format!(
                    "step '{}' uses unknown skill '{}'",
                    id, step.skill
                ))
            })?;

            let missing = descriptor
                .required_fields()
                .find(|field| matches!(step.input.get(*field), None | Some(Value::Null)))
                .map(str::to_string);
            if let Some(missing) = missing {
                return Err(FlowError::InvalidPlan(format!(
                    "step '{}' omits required field '{}' of skill '{}'",
                    id, missing, step.skill
                )));
            }
        }

        Ok(())
    }

    async fn plan_workflow(
        &self,
        request_type: &str,
        parameters: &Payload,
    ) -> Result<Workflow, FlowError> {
        let planner = self.planner.as_ref().ok_or_else(|| {
            FlowError::NotFound(format!(
                "no template '{}' and no planner configured",
                request_type
            ))
        })?;

        let request = describe_request(request_type, parameters);
        let skills = self.registry.list();
        let steps = planner
            .plan(&request, &skills)
            .await
            .map_err(|e| match e {
                FlowError::InvalidPlan(_) => e,
                other => FlowError::InvalidPlan(other.to_string()),
            })?;

        if let Err(e) = self.validate_plan(&steps) {
            tracing::warn!("[Orchestrator] Rejected plan for '{}': {}", request_type, e);
            return Err(e);
        }

        tracing::info!(
            "[Orchestrator] Accepted plan for '{}' ({} steps)",
            request_type,
            steps.len()
        );
        Ok(Workflow::new(format!("adhoc:{}", request_type), steps))
    }
}

/// Free-form request text handed to the planner.
fn describe_request(request_type: &str, parameters: &Payload) -> String {
    if parameters.is_empty() {
        return request_type.to_string();
    }
    let params = serde_json::to_string_pretty(parameters).unwrap_or_default();
    format!("{}\n\nParameters:\n{}", request_type, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::{EchoSkill, FieldSpec, FieldType, SkillDescriptor};
    use async_trait::async_trait;
    use serde_json::json;

    struct Required {
        descriptor: SkillDescriptor,
    }

    #[async_trait]
    impl crate::skills::Skill for Required {
        fn descriptor(&self) -> &SkillDescriptor {
            &self.descriptor
        }

        async fn execute(&self, input: Payload) -> Result<Payload, FlowError> {
            Ok(input)
        }
    }

    fn orchestrator() -> AgentOrchestrator {
        let registry = Arc::new(SkillRegistry::new());
        registry.register_skill(EchoSkill::new());
        registry.register_skill(Required {
            descriptor: SkillDescriptor::new("search", "Search")
                .input("query", FieldSpec::required(FieldType::String)),
        });
        AgentOrchestrator::new(registry, Arc::new(TemplateEngine::new()))
    }

    #[test]
    fn test_validate_plan_accepts_known_skills() {
        let steps = vec![
            WorkflowStep::new("search").with_input("query", json!("{{ q }}")),
            WorkflowStep::new("echo"),
        ];
        assert!(orchestrator().validate_plan(&steps).is_ok());
    }

    #[test]
    fn test_validate_plan_rejects_unknown_skill() {
        let err = orchestrator()
            .validate_plan(&[WorkflowStep::new("teleport")])
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_plan");
        assert!(err.to_string().contains("teleport"));
    }

    #[test]
    fn test_validate_plan_rejects_missing_required() {
        let err = orchestrator()
            .validate_plan(&[WorkflowStep::new("search")])
            .unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn test_validate_plan_treats_null_required_as_missing() {
        let step = WorkflowStep::new("search").with_input("query", Value::Null);
        let err = orchestrator().validate_plan(&[step]).unwrap_err();
        assert_eq!(err.kind(), "invalid_plan");
        assert!(err.to_string().contains("omits required field 'query'"));
    }

    #[test]
    fn test_validate_plan_rejects_empty() {
        assert_eq!(orchestrator().validate_plan(&[]).unwrap_err().kind(), "invalid_plan");
    }

    #[tokio::test]
    async fn test_no_planner_aborts_request() {
        let result = orchestrator().execute_request("anything", &Payload::new()).await;
        assert!(!result.is_success());
        assert!(result.step_details.is_empty());
        assert_eq!(result.error_kind.as_deref(), Some("not_found"));
    }

    #[test]
    fn test_describe_request_includes_parameters() {
        let mut params = Payload::new();
        params.insert("topic".to_string(), json!("rust"));
        let text = describe_request("summarize", &params);
        assert!(text.starts_with("summarize"));
        assert!(text.contains("\"topic\": \"rust\""));
        assert_eq!(describe_request("ping", &Payload::new()), "ping");
    }
}
