//! `agentflow request` — route a request to a template or the planner.

use agentflow_core::{AgentOrchestrator, Payload};

use super::{cancel_on_ctrl_c, report};

pub async fn run(
    orchestrator: &AgentOrchestrator,
    request_type: &str,
    params: &str,
    json: bool,
) -> Result<(), String> {
    let parameters = parse_params(params)?;

    if !json {
        let path = if orchestrator.templates().has_template(request_type) {
            "template"
        } else {
            "planner"
        };
        println!("🔀 Request '{}' → {}", request_type, path);
    }

    let cancel = cancel_on_ctrl_c();
    let result = orchestrator
        .execute_request_with_cancellation(request_type, &parameters, &cancel)
        .await;
    report(&result, json)
}

/// Parse `--params`, which must be a JSON object.
pub fn parse_params(params: &str) -> Result<Payload, String> {
    match serde_json::from_str::<serde_json::Value>(params) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("--params must be a JSON object, got: {}", other)),
        Err(e) => Err(format!("Invalid --params JSON: {}", e)),
    }
}
