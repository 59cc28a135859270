//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and works
//! against one [`AgentOrchestrator`] built by [`init_runtime`].

pub mod request;
pub mod skill;
pub mod template;
pub mod workflow;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use agentflow_core::skills::{EchoSkill, HttpSkill, LlmSkill};
use agentflow_core::{
    AgentOrchestrator, ChatModel, ExecutionResult, HttpChatModel, LlmPlanner, ModelConfig,
    SkillRegistry, StepStatus, TemplateEngine,
};
use tokio_util::sync::CancellationToken;

use crate::loader;

/// Timeout for the built-in `http` skill.
const HTTP_SKILL_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the orchestrator from the environment: built-in skills, the
/// model-backed `llm` skill and planner when a model is configured, and
/// every template found in `templates_dir`.
pub fn init_runtime(templates_dir: &str) -> Result<AgentOrchestrator, String> {
    let model: Option<Arc<dyn ChatModel>> = match ModelConfig::from_env() {
        Ok(config) => {
            tracing::info!(
                "[Runtime] Using {:?} model {}",
                config.provider,
                config.model
            );
            Some(Arc::new(HttpChatModel::new(config)))
        }
        Err(e) => {
            tracing::warn!(
                "[Runtime] No language model configured ({}); `llm` skill and planning disabled",
                e
            );
            None
        }
    };
    build_runtime(Path::new(templates_dir), model)
}

/// Wire an orchestrator with an explicit (or no) chat model.
pub fn build_runtime(
    templates_dir: &Path,
    model: Option<Arc<dyn ChatModel>>,
) -> Result<AgentOrchestrator, String> {
    let registry = Arc::new(SkillRegistry::new());
    registry.register_skill(EchoSkill::new());
    registry.register_skill(HttpSkill::new(HTTP_SKILL_TIMEOUT));

    let templates = Arc::new(TemplateEngine::new());
    if templates_dir.is_dir() {
        let count = loader::load_template_dir(&templates, templates_dir)?;
        tracing::info!(
            "[Runtime] Loaded {} template(s) from '{}'",
            count,
            templates_dir.display()
        );
    } else {
        tracing::debug!(
            "[Runtime] Template directory '{}' not found, starting with none",
            templates_dir.display()
        );
    }

    let mut orchestrator = AgentOrchestrator::new(registry.clone(), templates);
    if let Some(model) = model {
        registry.register_skill(LlmSkill::new(model.clone()));
        orchestrator = orchestrator.with_planner(Arc::new(LlmPlanner::new(model)));
    }
    Ok(orchestrator)
}

/// A token that fires on Ctrl-C, so a running workflow stops between
/// (or during) steps and still reports its trace.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("[Runtime] Interrupted, cancelling run");
            trigger.cancel();
        }
    });
    token
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

/// Print a run as JSON or as a human summary, then turn a failed run
/// into an error for the exit code.
pub fn report(result: &ExecutionResult, json: bool) -> Result<(), String> {
    if json {
        print_json(&serde_json::to_value(result).map_err(|e| e.to_string())?);
    } else {
        print_summary(result);
    }

    if result.is_success() {
        Ok(())
    } else {
        Err(format!(
            "Workflow '{}' failed: {}",
            result.workflow_name,
            result.error.as_deref().unwrap_or("unknown error")
        ))
    }
}

fn print_summary(result: &ExecutionResult) {
    let icon = if result.is_success() { "✅" } else { "❌" };
    println!(
        "{} {} ({}/{} steps completed, run {})",
        icon,
        result.workflow_name,
        result.steps_completed,
        result.total_steps,
        result.execution_id
    );

    for (i, step) in result.step_details.iter().enumerate() {
        let line = match step.status {
            StepStatus::Completed => format!("completed in {}ms", step.duration_ms),
            StepStatus::Failed => format!(
                "failed: {}",
                step.error.as_deref().unwrap_or("unknown error")
            ),
            other => format!("{:?}", other).to_lowercase(),
        };
        println!(
            "   {}. {} [{}] {}",
            i + 1,
            step.step_id,
            step.skill_name,
            line
        );
    }

    if let Some(ref output) = result.result {
        println!();
        print_json(output);
    }
}
