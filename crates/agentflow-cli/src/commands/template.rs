//! `agentflow template` — template catalog commands.

use agentflow_core::AgentOrchestrator;

use super::print_json;

pub async fn list(orchestrator: &AgentOrchestrator, json: bool) -> Result<(), String> {
    let templates = orchestrator.templates().list_templates();

    if json {
        print_json(&serde_json::to_value(&templates).map_err(|e| e.to_string())?);
        return Ok(());
    }

    if templates.is_empty() {
        println!("No templates loaded.");
        return Ok(());
    }
    for t in &templates {
        println!("{:<24} {:<24} {}", t.id, t.name, t.description);
    }
    Ok(())
}

pub async fn info(orchestrator: &AgentOrchestrator, id: &str, json: bool) -> Result<(), String> {
    let info = orchestrator
        .templates()
        .get_template_info(id)
        .map_err(|e| e.to_string())?;

    if json {
        print_json(&serde_json::to_value(&info).map_err(|e| e.to_string())?);
        return Ok(());
    }

    println!("{} ({})", info.name, info.id);
    if !info.description.is_empty() {
        println!("   {}", info.description);
    }
    println!("   Steps: {}", info.step_count);
    println!("   Parameters:");
    for (name, spec) in &info.parameters {
        let mut line = format!("     - {}: {}", name, spec.field_type);
        if spec.required {
            line.push_str(" (required)");
        }
        if let Some(ref default) = spec.default {
            line.push_str(&format!(" = {}", default));
        }
        if let Some(ref description) = spec.description {
            line.push_str(&format!("  {}", description));
        }
        println!("{}", line);
    }
    Ok(())
}
