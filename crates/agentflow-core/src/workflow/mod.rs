//! Workflow engine — sequential skill execution with output threading.
//!
//! # Architecture
//!
//! ```text
//! Workflow ──► WorkflowEngine ──► per step:
//!                                   VariableResolver (ExecutionContext)
//!                                   SkillRegistry::get
//!                                   SkillDescriptor::validate_input
//!                                   Skill::execute
//!                                        │
//!                              ExecutionResult { step_details, result }
//! ```

pub mod context;
pub mod events;
pub mod executor;
pub mod result;
pub mod schema;
pub mod variables;

pub use context::ExecutionContext;
pub use events::{RunEvent, RunObserver};
pub use executor::WorkflowEngine;
pub use result::{ExecutionResult, RunStatus, StepResult, StepStatus};
pub use schema::{assign_step_ids, OnError, Workflow, WorkflowStep};
pub use variables::{Expression, Segment, VariableResolver};
