//! Template catalog, parameter binding and instantiation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use serde_json::Value;

use crate::error::FlowError;
use crate::skills::schema::check_type;
use crate::skills::Payload;
use crate::template::schema::{Template, TemplateInfo, TemplateSummary};
use crate::workflow::schema::assign_step_ids;
use crate::workflow::variables::collect_expressions;
use crate::workflow::Workflow;

/// In-memory template catalog. Registration takes the write lock;
/// instantiation only reads.
pub struct TemplateEngine {
    templates: RwLock<HashMap<String, Arc<Template>>>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Validate and store a template under `id`, replacing any previous one.
    pub fn register_template(&self, id: &str, mut template: Template) -> Result<(), FlowError> {
        template.id = id.to_string();
        if template.name.is_empty() {
            template.name = id.to_string();
        }
        validate_template(&template)?;

        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), Arc::new(template));
        tracing::info!("[TemplateEngine] Registered template: {}", id);
        Ok(())
    }

    fn catalog(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Template>>> {
        self.templates.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_template(&self, id: &str) -> bool {
        self.catalog().contains_key(id)
    }

    pub fn get_template(&self, id: &str) -> Result<Arc<Template>, FlowError> {
        self.catalog()
            .get(id)
            .cloned()
            .ok_or_else(|| FlowError::NotFound(format!("template '{}'", id)))
    }

    /// Parameter schema and step count, without executing anything.
    pub fn get_template_info(&self, id: &str) -> Result<TemplateInfo, FlowError> {
        self.get_template(id).map(|t| t.info())
    }

    /// Ids, names and descriptions of every template, sorted by id.
    pub fn list_templates(&self) -> Vec<TemplateSummary> {
        let mut summaries: Vec<TemplateSummary> =
            self.catalog().values().map(|t| t.summary()).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    pub fn len(&self) -> usize {
        self.catalog().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bind `parameters` and produce a runnable workflow.
    ///
    /// Required parameters must be supplied; absent optional ones take
    /// their default (or null). Supplied values are type-checked. Unknown
    /// parameters are ignored. The bound values travel on the workflow and
    /// are substituted by the engine together with step references, so a
    /// parameter value is never itself read as an expression.
    pub fn instantiate(&self, id: &str, parameters: &Payload) -> Result<Workflow, FlowError> {
        let template = self.get_template(id)?;
        let values = bind_parameters(&template, parameters)?;

        tracing::debug!(
            "[TemplateEngine] Instantiated {} with {} parameter(s)",
            id,
            values.len()
        );

        Ok(Workflow {
            name: template.name.clone(),
            description: Some(template.description.clone()).filter(|d| !d.is_empty()),
            parameters: values,
            steps: template.steps.clone(),
        })
    }
}

fn bind_parameters(template: &Template, supplied: &Payload) -> Result<Payload, FlowError> {
    let mut values = Payload::with_capacity(template.parameters.len());

    for (name, spec) in &template.parameters {
        let value = match supplied.get(name) {
            Some(Value::Null) | None if spec.required => {
                return Err(FlowError::MissingParameter(format!(
                    "template '{}' requires parameter '{}'",
                    template.id, name
                )));
            }
            Some(Value::Null) | None => spec.default.clone().unwrap_or(Value::Null),
            Some(value) => {
                check_type(&template.id, name, spec.field_type, value)?;
                value.clone()
            }
        };
        values.insert(name.clone(), value);
    }

    for extra in supplied.keys().filter(|k| !template.parameters.contains_key(*k)) {
        tracing::debug!(
            "[TemplateEngine] Ignoring undeclared parameter '{}' for {}",
            extra,
            template.id
        );
    }

    Ok(values)
}

/// Check that every placeholder root is a declared parameter or an
/// earlier step of the same template, and that defaults match their types.
fn validate_template(template: &Template) -> Result<(), FlowError> {
    let invalid = |msg: String| FlowError::InvalidTemplate(format!("'{}': {}", template.id, msg));

    let step_ids = assign_step_ids(&template.steps).map_err(|e| invalid(e.to_string()))?;
    let all_ids: HashSet<&str> = step_ids.iter().map(String::as_str).collect();

    for (name, spec) in &template.parameters {
        if all_ids.contains(name.as_str()) {
            return Err(invalid(format!(
                "parameter '{}' has the same name as a step id",
                name
            )));
        }
        if let Some(ref default) = spec.default {
            check_type(&template.id, name, spec.field_type, default)
                .map_err(|e| invalid(e.to_string()))?;
        }
    }

    let mut earlier: HashSet<&str> = HashSet::new();
    for (step, step_id) in template.steps.iter().zip(&step_ids) {
        let input = Value::Object(step.input.clone());
        for expr in collect_expressions(&input).map_err(|e| invalid(e.to_string()))? {
            let root = expr.root.as_str();
            if template.parameters.contains_key(root) || earlier.contains(root) {
                continue;
            }
            let reason = if all_ids.contains(root) {
                format!("step '{}' references '{}' before it runs", step_id, expr)
            } else {
                format!("step '{}' references undeclared parameter '{}'", step_id, root)
            };
            return Err(invalid(reason));
        }
        earlier.insert(step_id.as_str());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn research_template() -> Template {
        Template::from_yaml(
            r#"
name: "Research"
description: "Search then summarize"
parameters:
  query: { type: string, required: true }
  limit: { type: integer, default: 5 }
  tone: { type: string }
steps:
  - skill: search
    id: hits
    input:
      query: "{{ query }}"
      limit: "{{ limit }}"
  - skill: llm
    input:
      prompt: "Summarize '{{ query }}' in a {{ tone }} tone: {{ hits.results }}"
      top: "{{ hits.results[0] }}"
"#,
        )
        .unwrap()
    }

    fn params(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_instantiate_binds_parameters() {
        let engine = TemplateEngine::new();
        let template = research_template();
        engine.register_template("research", template.clone()).unwrap();

        let wf = engine
            .instantiate("research", &params(json!({"query": "rust", "tone": "dry", "extra": 1})))
            .unwrap();
        assert_eq!(wf.name, "Research");
        assert_eq!(
            Value::Object(wf.parameters),
            json!({"query": "rust", "limit": 5, "tone": "dry"})
        );
        assert_eq!(wf.steps, template.steps);
    }

    #[test]
    fn test_parameter_text_stays_literal() {
        let engine = TemplateEngine::new();
        engine.register_template("research", research_template()).unwrap();

        let query = "how do {{ jinja }} templates work";
        let wf = engine
            .instantiate("research", &params(json!({"query": query})))
            .unwrap();
        assert_eq!(wf.parameters["query"], json!(query));
        assert_eq!(wf.parameters["tone"], Value::Null);
    }

    #[test]
    fn test_register_survives_poisoned_lock() {
        let engine = Arc::new(TemplateEngine::new());
        let poisoner = Arc::clone(&engine);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.templates.write().unwrap();
            panic!("poison the catalog lock");
        })
        .join();
        assert!(engine.templates.is_poisoned());

        engine.register_template("research", research_template()).unwrap();
        assert!(engine.has_template("research"));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_instantiate_is_idempotent() {
        let engine = TemplateEngine::new();
        engine.register_template("research", research_template()).unwrap();
        let p = params(json!({"query": "rust", "limit": 2}));
        assert_eq!(
            engine.instantiate("research", &p).unwrap(),
            engine.instantiate("research", &p).unwrap()
        );
    }

    #[test]
    fn test_missing_required_parameter() {
        let engine = TemplateEngine::new();
        engine.register_template("research", research_template()).unwrap();
        let err = engine.instantiate("research", &Payload::new()).unwrap_err();
        assert_eq!(err.kind(), "missing_parameter");
    }

    #[test]
    fn test_parameter_type_mismatch() {
        let engine = TemplateEngine::new();
        engine.register_template("research", research_template()).unwrap();
        let err = engine
            .instantiate("research", &params(json!({"query": "x", "limit": "ten"})))
            .unwrap_err();
        assert_eq!(err.kind(), "schema_validation");
    }

    #[test]
    fn test_unknown_template() {
        let engine = TemplateEngine::new();
        assert_eq!(engine.instantiate("nope", &Payload::new()).unwrap_err().kind(), "not_found");
        assert!(engine.get_template_info("nope").is_err());
    }

    #[test]
    fn test_register_rejects_undeclared_parameter() {
        let mut t = research_template();
        t.steps[0].input.insert("lang".to_string(), json!("{{ language }}"));
        let err = TemplateEngine::new().register_template("bad", t).unwrap_err();
        assert_eq!(err.kind(), "invalid_template");
        assert!(err.to_string().contains("language"));
    }

    #[test]
    fn test_register_rejects_forward_reference() {
        let mut t = research_template();
        t.steps[0].input.insert("seed".to_string(), json!("{{ step_2.content }}"));
        let err = TemplateEngine::new().register_template("bad", t).unwrap_err();
        assert!(err.to_string().contains("before it runs"));
    }

    #[test]
    fn test_info_and_listing() {
        let engine = TemplateEngine::new();
        engine.register_template("research", research_template()).unwrap();
        engine
            .register_template("alpha", Template::from_yaml("steps: []").unwrap())
            .unwrap();

        let info = engine.get_template_info("research").unwrap();
        assert_eq!(info.step_count, 2);
        assert!(info.parameters["query"].required);

        let ids: Vec<String> = engine.list_templates().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["alpha", "research"]);
        assert_eq!(engine.list_templates()[0].name, "alpha");
    }
}
