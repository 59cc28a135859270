//! AgentFlow CLI library: runtime wiring, definition loading and the
//! command implementations behind the `agentflow` binary.

pub mod commands;
pub mod loader;
