//! Templates — named, parameterized workflow definitions.
//!
//! A template's step inputs may contain two kinds of placeholders:
//!
//! - `{{ param }}`: a declared template parameter
//! - `{{ step_id.field }}`: a reference to an earlier step of the same
//!   template
//!
//! Instantiation binds the parameters onto the workflow; both kinds are
//! resolved by the workflow engine in one pass.

pub mod engine;
pub mod schema;

pub use engine::TemplateEngine;
pub use schema::{Template, TemplateInfo, TemplateSummary};
