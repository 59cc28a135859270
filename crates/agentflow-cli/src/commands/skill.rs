//! `agentflow skill` — skill discovery commands.

use agentflow_core::AgentOrchestrator;

use super::print_json;

/// Print every registered skill descriptor.
pub async fn list(orchestrator: &AgentOrchestrator, json: bool) -> Result<(), String> {
    let skills = orchestrator.registry().list();

    if json {
        print_json(&serde_json::to_value(&skills).map_err(|e| e.to_string())?);
        return Ok(());
    }

    for skill in &skills {
        println!("{:<12} {}", skill.name, skill.description);
        for (field, spec) in &skill.input_schema {
            let marker = if spec.required { "*" } else { " " };
            println!("   {}{}: {}", marker, field, spec.field_type);
        }
    }
    Ok(())
}
