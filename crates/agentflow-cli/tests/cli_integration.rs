//! Integration tests for the agentflow-cli commands.
//!
//! These tests exercise the same code paths as the binary: definitions
//! are written to a temporary directory, loaded through the loader and
//! run against a runtime built without a language model.

use std::path::Path;

use agentflow_cli::commands::{self, build_runtime};
use agentflow_cli::loader;
use agentflow_core::{AgentOrchestrator, RunStatus, TemplateEngine};
use serde_json::json;
use tempfile::TempDir;

const GREETING_TEMPLATE: &str = r#"
name: "Greeting"
description: "Echo a greeting"
parameters:
  who: { type: string, required: true }
  punctuation: { type: string, default: "!" }
steps:
  - skill: echo
    id: greet
    input:
      line: "hello {{ who }}{{ punctuation }}"
  - skill: echo
    input:
      shout: "{{ greet.line }}"
"#;

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).expect("Failed to write fixture");
}

fn runtime_with(files: &[(&str, &str)]) -> (TempDir, AgentOrchestrator) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, content) in files {
        write(dir.path(), name, content);
    }
    let orchestrator = build_runtime(dir.path(), None).expect("Failed to build runtime");
    (dir, orchestrator)
}

#[test]
fn test_template_dir_uses_file_stem_as_id() {
    let (_dir, orchestrator) = runtime_with(&[
        ("greeting.yaml", GREETING_TEMPLATE),
        ("notes.txt", "not a template"),
        (
            "named.json",
            r#"{"id": "custom", "name": "Named", "steps": [{"skill": "echo"}]}"#,
        ),
    ]);

    let ids: Vec<String> = orchestrator
        .templates()
        .list_templates()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec!["custom", "greeting"]);
}

#[test]
fn test_invalid_template_file_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "bad.yaml",
        "steps:\n  - skill: echo\n    input:\n      x: \"{{ nobody }}\"\n",
    );
    let err = loader::load_template_dir(&TemplateEngine::new(), dir.path()).unwrap_err();
    assert!(err.contains("bad.yaml"));
    assert!(err.contains("nobody"));
}

#[test]
fn test_missing_template_dir_is_not_fatal() {
    let orchestrator = build_runtime(Path::new("/nonexistent/agentflow/templates"), None).unwrap();
    assert!(orchestrator.templates().is_empty());
    assert!(!orchestrator.has_planner());
}

#[test]
fn test_runtime_registers_builtin_skills() {
    let (_dir, orchestrator) = runtime_with(&[]);
    let names: Vec<String> = orchestrator
        .registry()
        .list()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["echo", "http"]);
}

#[tokio::test]
async fn test_request_runs_loaded_template() {
    let (_dir, orchestrator) = runtime_with(&[("greeting.yaml", GREETING_TEMPLATE)]);
    let params = commands::request::parse_params(r#"{"who": "world"}"#).unwrap();

    let result = orchestrator.execute_request("greeting", &params).await;
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.result, Some(json!({"shout": "hello world!"})));
}

#[tokio::test]
async fn test_request_without_planner_fails() {
    let (_dir, orchestrator) = runtime_with(&[]);
    let result = orchestrator
        .execute_request("summarize the news", &Default::default())
        .await;
    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.step_details.is_empty());
    assert!(commands::report(&result, true).is_err());
}

#[tokio::test]
async fn test_run_workflow_file() {
    let (dir, orchestrator) = runtime_with(&[]);
    write(
        dir.path(),
        "flow.yml",
        r#"
name: flow
steps:
  - skill: echo
    id: first
    input: { n: 1 }
  - skill: echo
    input: { copy: "{{ first.n }}" }
"#,
    );

    let file = dir.path().join("flow.yml");
    let workflow = loader::load_workflow(&file).unwrap();
    let result = orchestrator.execute_workflow(&workflow).await;
    assert_eq!(result.result, Some(json!({"copy": 1})));

    assert!(commands::workflow::run(&orchestrator, file.to_str().unwrap(), true)
        .await
        .is_ok());
}

#[test]
fn test_validate_rejects_unknown_skill_and_bad_reference() {
    let (dir, orchestrator) = runtime_with(&[]);

    write(dir.path(), "unknown.yaml", "name: u\nsteps:\n  - skill: teleport\n");
    let wf = loader::load_workflow(&dir.path().join("unknown.yaml")).unwrap();
    let err = commands::workflow::check_workflow(&orchestrator, &wf).unwrap_err();
    assert!(err.contains("teleport"));

    write(
        dir.path(),
        "forward.yaml",
        "name: f\nsteps:\n  - skill: echo\n    input: { x: \"{{ step_2.x }}\" }\n  - skill: echo\n",
    );
    let wf = loader::load_workflow(&dir.path().join("forward.yaml")).unwrap();
    let err = commands::workflow::check_workflow(&orchestrator, &wf).unwrap_err();
    assert!(err.contains("earlier step"));

    write(
        dir.path(),
        "http.yaml",
        "name: h\nsteps:\n  - skill: http\n    input: { method: POST }\n",
    );
    let wf = loader::load_workflow(&dir.path().join("http.yaml")).unwrap();
    let err = commands::workflow::check_workflow(&orchestrator, &wf).unwrap_err();
    assert!(err.contains("url"));
}

#[tokio::test]
async fn test_workflow_file_parameters() {
    let (dir, orchestrator) = runtime_with(&[]);
    write(
        dir.path(),
        "params.yaml",
        r#"
name: params
parameters:
  topic: "{{ first.n }}"
steps:
  - skill: echo
    id: first
    input: { n: 1 }
  - skill: echo
    input: { about: "on {{ topic }}" }
"#,
    );

    let wf = loader::load_workflow(&dir.path().join("params.yaml")).unwrap();
    assert!(commands::workflow::check_workflow(&orchestrator, &wf).is_ok());
    let result = orchestrator.execute_workflow(&wf).await;
    assert_eq!(result.result, Some(json!({"about": "on {{ first.n }}"})));
}

#[test]
fn test_parse_params_requires_object() {
    assert!(commands::request::parse_params("{}").unwrap().is_empty());
    assert!(commands::request::parse_params("[1]").is_err());
    assert!(commands::request::parse_params("{oops").is_err());
}
