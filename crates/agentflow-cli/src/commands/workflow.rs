//! `agentflow run` / `agentflow validate` — custom workflow files.

use std::collections::HashSet;
use std::path::Path;

use agentflow_core::workflow::variables::collect_expressions;
use agentflow_core::{AgentOrchestrator, Workflow};
use serde_json::Value;

use super::{cancel_on_ctrl_c, print_json, report};
use crate::loader;

/// Run a workflow file, bypassing templates and planning.
pub async fn run(orchestrator: &AgentOrchestrator, file: &str, json: bool) -> Result<(), String> {
    let workflow = loader::load_workflow(Path::new(file))?;
    if !json {
        println!(
            "📄 Loaded workflow: {} ({} step(s))",
            workflow.name,
            workflow.steps.len()
        );
    }

    let cancel = cancel_on_ctrl_c();
    let result = orchestrator
        .execute_workflow_with_cancellation(&workflow, &cancel)
        .await;
    report(&result, json)
}

/// Statically check a workflow file against the registry without running it.
pub async fn validate(
    orchestrator: &AgentOrchestrator,
    file: &str,
    json: bool,
) -> Result<(), String> {
    let workflow = loader::load_workflow(Path::new(file))?;
    let ids = check_workflow(orchestrator, &workflow)?;

    if json {
        print_json(&serde_json::json!({
            "valid": true,
            "name": workflow.name,
            "steps": ids,
        }));
        return Ok(());
    }

    println!("✅ Workflow '{}' is valid", workflow.name);
    println!("   Steps: {}", workflow.steps.len());
    for (i, (step, id)) in workflow.steps.iter().zip(&ids).enumerate() {
        println!(
            "   {}. {} (skill: {}, on_error: {:?})",
            i + 1,
            id,
            step.skill,
            step.on_error
        );
    }
    Ok(())
}

/// Registry check plus a reference check: every `{{ }}` root must name
/// an earlier step. Returns the effective step ids.
pub fn check_workflow(
    orchestrator: &AgentOrchestrator,
    workflow: &Workflow,
) -> Result<Vec<String>, String> {
    orchestrator
        .validate_plan(&workflow.steps)
        .map_err(|e| e.to_string())?;
    let ids = workflow.step_ids().map_err(|e| e.to_string())?;

    let mut earlier: HashSet<&str> = workflow.parameters.keys().map(String::as_str).collect();
    for (step, id) in workflow.steps.iter().zip(&ids) {
        let exprs = collect_expressions(&Value::Object(step.input.clone()))
            .map_err(|e| format!("step '{}': {}", id, e))?;
        if let Some(expr) = exprs.iter().find(|e| !earlier.contains(e.root.as_str())) {
            return Err(format!(
                "step '{}' references '{}', which is not a parameter or an earlier step",
                id, expr
            ));
        }
        earlier.insert(id.as_str());
    }

    Ok(ids)
}
