//! Progress notifications emitted while a workflow runs.

use crate::workflow::result::{ExecutionResult, StepResult};

#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    RunStarted {
        execution_id: &'a str,
        workflow_name: &'a str,
        total_steps: usize,
    },
    StepStarted {
        execution_id: &'a str,
        index: usize,
        step_id: &'a str,
        skill: &'a str,
    },
    StepFinished {
        execution_id: &'a str,
        index: usize,
        result: &'a StepResult,
    },
    RunFinished {
        result: &'a ExecutionResult,
    },
}

/// Receives [`RunEvent`]s synchronously, in order, from the running task.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent<'_>);
}
