//! Load workflow and template definitions from disk.
//!
//! The core parses strings only; this module owns the file handling.
//! `.json` files are parsed as JSON, `.yaml` / `.yml` as YAML.

use std::path::Path;

use agentflow_core::{Template, TemplateEngine, Workflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

fn format_of(path: &Path) -> Option<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Some(Format::Yaml),
        Some("json") => Some(Format::Json),
        _ => None,
    }
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

/// Load a workflow definition file.
pub fn load_workflow(path: &Path) -> Result<Workflow, String> {
    let content = read(path)?;
    let parsed = match format_of(path) {
        Some(Format::Json) => Workflow::from_json(&content),
        _ => Workflow::from_yaml(&content),
    };
    parsed.map_err(|e| format!("{}: {}", path.display(), e))
}

/// Load one template file. The id is taken from the file when present,
/// otherwise from the file stem.
pub fn load_template(path: &Path) -> Result<(String, Template), String> {
    let content = read(path)?;
    let template = match format_of(path) {
        Some(Format::Json) => Template::from_json(&content),
        _ => Template::from_yaml(&content),
    }
    .map_err(|e| format!("{}: {}", path.display(), e))?;

    let id = if template.id.is_empty() {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    } else {
        template.id.clone()
    };
    Ok((id, template))
}

/// Register every template file in `dir` with `engine`.
///
/// Files are visited in name order; other extensions are ignored. The
/// first file that fails to parse or register aborts the load.
pub fn load_template_dir(engine: &TemplateEngine, dir: &Path) -> Result<usize, String> {
    if !dir.is_dir() {
        return Err(format!(
            "Template directory '{}' does not exist",
            dir.display()
        ));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory '{}': {}", dir.display(), e))?
    {
        let entry = entry.map_err(|e| format!("Directory entry error: {}", e))?;
        let path = entry.path();
        if path.is_file() && format_of(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();

    for path in &paths {
        let (id, template) = load_template(path)?;
        engine
            .register_template(&id, template)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        tracing::info!("[TemplateLoader] Loaded template: {} ({})", id, path.display());
    }

    Ok(paths.len())
}
