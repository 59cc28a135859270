//! Core error type for the AgentFlow engine.
//!
//! `FlowError` is used throughout the core (registry, resolver, engine,
//! templates, orchestration). The engine never lets it escape a run:
//! every variant is mapped into a `StepResult` or a top-level failed
//! `ExecutionResult`.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("Schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("Unresolved variable: {0}")]
    UnresolvedVariable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Skill execution failed: {0}")]
    SkillExecution(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FlowError {
    /// Stable tag recorded alongside error messages in execution results.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::SchemaValidation(_) => "schema_validation",
            FlowError::UnresolvedVariable(_) => "unresolved_variable",
            FlowError::NotFound(_) => "not_found",
            FlowError::MissingParameter(_) => "missing_parameter",
            FlowError::InvalidPlan(_) => "invalid_plan",
            FlowError::InvalidTemplate(_) => "invalid_template",
            FlowError::SkillExecution(_) => "skill_execution",
            FlowError::Cancelled(_) => "cancelled",
            FlowError::Parse(_) => "parse",
        }
    }
}
