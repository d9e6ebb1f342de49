//! The pipeline contract seen by a stack
//!
//! Pipelines are authored elsewhere; a stack only needs a name to label runs
//! and log lines, and hands the pipeline through to its orchestrator.

/// A workflow that can be deployed on a stack
pub trait Pipeline: Send + Sync {
    /// Name used for default run names and log messages
    fn name(&self) -> &str;

    /// Names of the pipeline steps, in execution order
    fn step_names(&self) -> Vec<String> {
        Vec::new()
    }
}
