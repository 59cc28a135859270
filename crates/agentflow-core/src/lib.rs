//! AgentFlow Core — skill-based workflow orchestration.
//!
//! This crate contains the execution engine and its collaborators. It does
//! no file I/O of its own, making it suitable for use in:
//!
//! - CLI tools (via `agentflow-cli`)
//! - HTTP or RPC front ends
//! - Embedding in other services
//!
//! # Components
//!
//! - [`SkillRegistry`]: named capabilities with declared input/output schemas
//! - [`WorkflowEngine`]: sequential execution with `{{ step.field }}` threading
//! - [`TemplateEngine`]: parameterized workflow definitions
//! - [`AgentOrchestrator`]: template match or LLM-planned ad-hoc workflow

pub mod error;
pub mod llm;
pub mod orchestration;
pub mod skills;
pub mod template;
pub mod workflow;

// Convenience re-exports
pub use error::FlowError;
pub use llm::{ChatModel, HttpChatModel, ModelConfig};
pub use orchestration::{AgentOrchestrator, LlmPlanner, Planner};
pub use skills::{Payload, Skill, SkillDescriptor, SkillRegistry};
pub use template::{Template, TemplateEngine};
pub use workflow::{
    ExecutionResult, OnError, RunStatus, StepResult, StepStatus, Workflow, WorkflowEngine,
    WorkflowStep,
};
