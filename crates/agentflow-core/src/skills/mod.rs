//! Skills — named, schema-described capabilities invoked by the engine.
//!
//! A skill is any type implementing [`Skill`]. Concrete capabilities
//! (search, code analysis, report generation, model calls, database
//! queries, user-defined tools) live behind this one interface and are
//! resolved by name through the [`SkillRegistry`].

pub mod builtin;
pub mod registry;
pub mod schema;

use async_trait::async_trait;

use crate::error::FlowError;

pub use builtin::{EchoSkill, HttpSkill, LlmSkill};
pub use registry::SkillRegistry;
pub use schema::{FieldSpec, FieldType, OutputField, SkillDescriptor};

/// Input and output payload of a skill: a JSON object.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// The capability contract consumed by the workflow engine.
///
/// `execute` receives input that has already been resolved and validated
/// against `input_schema`. It fails with [`FlowError::SkillExecution`]
/// when the underlying capability cannot complete.
#[async_trait]
pub trait Skill: Send + Sync {
    fn descriptor(&self) -> &SkillDescriptor;

    async fn execute(&self, input: Payload) -> Result<Payload, FlowError>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn description(&self) -> &str {
        &self.descriptor().description
    }
}
