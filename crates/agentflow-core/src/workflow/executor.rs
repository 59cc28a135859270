//! Sequential step execution.
//!
//! For each step, in declaration order, the engine:
//! 1. Resolves `{{ }}` expressions against the workflow's parameters and
//!    the outputs recorded so far
//! 2. Looks up the skill in the registry
//! 3. Validates the resolved input against the skill's input schema
//! 4. Awaits the skill, then records its output under the step id
//!
//! A failure in any of these phases fails the step. With
//! `on_error: stop` every remaining step is skipped; with
//! `on_error: continue` the run goes on, but still ends `failed`.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::FlowError;
use crate::skills::{Payload, SkillRegistry};
use crate::workflow::context::ExecutionContext;
use crate::workflow::events::{RunEvent, RunObserver};
use crate::workflow::result::{ExecutionResult, RunStatus, StepResult, StepStatus};
use crate::workflow::schema::{OnError, Workflow, WorkflowStep};
use crate::workflow::variables::VariableResolver;

pub struct WorkflowEngine {
    registry: Arc<SkillRegistry>,
    observers: Vec<Arc<dyn RunObserver>>,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self {
            registry,
            observers: Vec::new(),
        }
    }

    /// Attach an observer that receives progress events for every run.
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// Execute a workflow to completion.
    pub async fn run(&self, workflow: &Workflow) -> ExecutionResult {
        self.run_with_cancellation(workflow, &CancellationToken::new())
            .await
    }

    /// Execute a workflow, stopping early if `cancel` fires.
    ///
    /// Cancellation is checked before each step and raced against the
    /// running skill. A cancelled run skips all remaining steps.
    pub async fn run_with_cancellation(
        &self,
        workflow: &Workflow,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let execution_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let total_steps = workflow.steps.len();

        let ids = match workflow.step_ids() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    "[WorkflowEngine] Rejected workflow '{}': {}",
                    workflow.name,
                    e
                );
                let result = ExecutionResult::aborted(
                    execution_id,
                    &workflow.name,
                    total_steps,
                    &e,
                    started_at,
                );
                self.emit(&RunEvent::RunFinished { result: &result });
                return result;
            }
        };

        tracing::info!(
            "[WorkflowEngine] Run {} started: {} ({} steps)",
            execution_id,
            workflow.name,
            total_steps
        );
        self.emit(&RunEvent::RunStarted {
            execution_id: &execution_id,
            workflow_name: &workflow.name,
            total_steps,
        });

        let mut ctx = ExecutionContext::with_parameters(&workflow.parameters);
        let mut details: Vec<StepResult> = Vec::with_capacity(total_steps);
        let mut last_output: Option<Value> = None;
        let mut run_error: Option<(String, &'static str)> = None;
        let mut halted = false;

        for (index, (step, step_id)) in workflow.steps.iter().zip(&ids).enumerate() {
            if !halted && cancel.is_cancelled() {
                let e = FlowError::Cancelled(format!("run cancelled before step '{}'", step_id));
                tracing::warn!("[WorkflowEngine] {}", e);
                run_error.get_or_insert((e.to_string(), e.kind()));
                halted = true;
            }

            if halted {
                let skipped = StepResult::skipped(step_id, &step.skill, step.on_error);
                self.emit(&RunEvent::StepFinished {
                    execution_id: &execution_id,
                    index,
                    result: &skipped,
                });
                details.push(skipped);
                continue;
            }

            tracing::info!(
                "[WorkflowEngine] Step {}/{}: {} (skill: {})",
                index + 1,
                total_steps,
                step_id,
                step.skill
            );
            self.emit(&RunEvent::StepStarted {
                execution_id: &execution_id,
                index,
                step_id: step_id.as_str(),
                skill: &step.skill,
            });

            let started = Instant::now();
            let outcome = self.execute_step(step, &ctx, cancel).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let step_result = match outcome {
                Ok(output) => {
                    ctx.record_output(step_id, output.clone());
                    let output = Value::Object(output);
                    last_output = Some(output.clone());
                    tracing::info!(
                        "[WorkflowEngine] Step {} completed in {}ms",
                        step_id,
                        duration_ms
                    );
                    StepResult::completed(step_id, &step.skill, step.on_error, output, duration_ms)
                }
                Err(e) => {
                    tracing::warn!("[WorkflowEngine] Step {} failed: {}", step_id, e);
                    ctx.record_failure(step_id);
                    run_error.get_or_insert((
                        format!("step '{}' (skill '{}') failed: {}", step_id, step.skill, e),
                        e.kind(),
                    ));
                    if step.on_error == OnError::Stop || matches!(e, FlowError::Cancelled(_)) {
                        halted = true;
                    }
                    StepResult::failed(step_id, &step.skill, step.on_error, &e, duration_ms)
                }
            };

            self.emit(&RunEvent::StepFinished {
                execution_id: &execution_id,
                index,
                result: &step_result,
            });
            details.push(step_result);
        }

        let steps_completed = details
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let (status, error, error_kind) = match run_error {
            Some((message, kind)) => (RunStatus::Failed, Some(message), Some(kind.to_string())),
            None => (RunStatus::Completed, None, None),
        };

        let result = ExecutionResult {
            execution_id,
            workflow_name: workflow.name.clone(),
            status,
            result: last_output,
            error,
            error_kind,
            steps_completed,
            total_steps,
            step_details: details,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            "[WorkflowEngine] Run {} finished: {:?} ({}/{} steps completed)",
            result.execution_id,
            result.status,
            result.steps_completed,
            result.total_steps
        );
        self.emit(&RunEvent::RunFinished { result: &result });
        result
    }

    async fn execute_step(
        &self,
        step: &WorkflowStep,
        ctx: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Payload, FlowError> {
        let input = VariableResolver::new(ctx).resolve_map(&step.input)?;
        let skill = self.registry.get(&step.skill)?;
        let input = skill.descriptor().validate_input(input)?;

        let shown = Value::Object(input.clone());
        tracing::debug!("[WorkflowEngine] Invoking {} with {}", step.skill, shown);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FlowError::Cancelled(format!(
                "run cancelled while skill '{}' was running",
                step.skill
            ))),
            result = skill.execute(input) => result,
        }
    }

    fn emit(&self, event: &RunEvent<'_>) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::EchoSkill;
    use serde_json::json;

    fn engine() -> WorkflowEngine {
        let registry = Arc::new(SkillRegistry::new());
        registry.register_skill(EchoSkill::new());
        WorkflowEngine::new(registry)
    }

    #[tokio::test]
    async fn test_outputs_thread_between_steps() {
        let wf = Workflow::new(
            "chain",
            vec![
                WorkflowStep::new("echo").with_id("a").with_input("items", json!([1, 2, 3])),
                WorkflowStep::new("echo").with_input("second", json!("{{ a.items[1] }}")),
                WorkflowStep::new("echo").with_input("label", json!("got {{ step_2.second }}")),
            ],
        );
        let result = engine().run(&wf).await;
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.steps_completed, 3);
        assert_eq!(result.step_details[1].output, Some(json!({"second": 2})));
        assert_eq!(result.result, Some(json!({"label": "got 2"})));
    }

    #[tokio::test]
    async fn test_parameters_resolve_in_one_pass() {
        let wf = Workflow::new(
            "params",
            vec![
                WorkflowStep::new("echo").with_id("a").with_input("secret", json!("s3")),
                WorkflowStep::new("echo")
                    .with_input("query", json!("how do {{ topic }} work"))
                    .with_input("limit", json!("{{ limit }}")),
            ],
        )
        .with_parameter("topic", json!("{{ a.secret }} templates"))
        .with_parameter("limit", json!(5));

        let result = engine().run(&wf).await;
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(
            result.result,
            Some(json!({"query": "how do {{ a.secret }} templates work", "limit": 5}))
        );
    }

    #[tokio::test]
    async fn test_parameter_named_like_step_aborts() {
        let wf = Workflow::new("clash", vec![WorkflowStep::new("echo").with_id("a")])
            .with_parameter("a", json!(1));
        let result = engine().run(&wf).await;
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.error_kind.as_deref(), Some("schema_validation"));
        assert!(result.step_details.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_skill_fails_step() {
        let wf = Workflow::new("x", vec![WorkflowStep::new("missing")]);
        let result = engine().run(&wf).await;
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.step_details[0].error_kind.as_deref(), Some("not_found"));
        assert_eq!(result.result, None);
    }

    #[tokio::test]
    async fn test_duplicate_ids_abort_before_running() {
        let wf = Workflow::new(
            "dup",
            vec![
                WorkflowStep::new("echo").with_id("a"),
                WorkflowStep::new("echo").with_id("a"),
            ],
        );
        let result = engine().run(&wf).await;
        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.step_details.is_empty());
        assert_eq!(result.total_steps, 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_everything() {
        let wf = Workflow::new(
            "cancel",
            vec![WorkflowStep::new("echo"), WorkflowStep::new("echo")],
        );
        let token = CancellationToken::new();
        token.cancel();
        let result = engine().run_with_cancellation(&wf, &token).await;
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.error_kind.as_deref(), Some("cancelled"));
        assert!(result
            .step_details
            .iter()
            .all(|s| s.status == StepStatus::Skipped));
    }
}
