//! Stack components - the capability contract every component implements
//!
//! A component belongs to exactly one [`ComponentCategory`] and implements
//! the matching category trait ([`Orchestrator`], [`MetadataStore`],
//! [`ArtifactStore`] or [`ContainerRegistry`]) on top of [`StackComponent`].
//! Components are built once, validated by their constructor, and are
//! immutable afterwards; the lifecycle hooks may keep internal run state but
//! the stack never mutates a component.

use crate::error::ComponentResult;
use crate::stack::Stack;
use crate::validator::StackValidator;
use async_trait::async_trait;
use keel_types::{
    ComponentCategory, ComponentId, ExecutionMode, OptionValue, Pipeline, RuntimeConfiguration,
    RuntimeOptions,
};
use serde::{Deserialize, Serialize};

/// Value returned by an orchestrator for a pipeline run, passed through untouched
pub type RunOutput = OptionValue;

/// Identity and capabilities of a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Human-readable name, unique within a stack for its category
    pub name: String,

    /// Globally unique identifier
    pub id: ComponentId,

    /// Slot this component fills
    pub category: ComponentCategory,

    /// Implementation kind, e.g. `local` or `sqlite`
    pub flavor: String,

    pub supports_local_execution: bool,

    pub supports_remote_execution: bool,
}

impl ComponentInfo {
    /// New component info supporting both execution modes
    pub fn new(
        name: impl Into<String>,
        category: ComponentCategory,
        flavor: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: ComponentId::generate(),
            category,
            flavor: flavor.into(),
            supports_local_execution: true,
            supports_remote_execution: true,
        }
    }

    pub fn with_id(mut self, id: ComponentId) -> Self {
        self.id = id;
        self
    }

    /// Restrict the component to local execution
    pub fn local_only(mut self) -> Self {
        self.supports_local_execution = true;
        self.supports_remote_execution = false;
        self
    }

    /// Restrict the component to remote execution
    pub fn remote_only(mut self) -> Self {
        self.supports_local_execution = false;
        self.supports_remote_execution = true;
        self
    }

    pub fn supports(&self, mode: ExecutionMode) -> bool {
        match mode {
            ExecutionMode::Local => self.supports_local_execution,
            ExecutionMode::Remote => self.supports_remote_execution,
        }
    }
}

/// View any category trait object as a plain [`StackComponent`]
pub trait AsStackComponent {
    fn as_stack_component(&self) -> &dyn StackComponent;
}

impl<T: StackComponent> AsStackComponent for T {
    fn as_stack_component(&self) -> &dyn StackComponent {
        self
    }
}

/// Capability set shared by every component category
#[async_trait]
pub trait StackComponent: AsStackComponent + Send + Sync {
    /// Identity and capabilities
    fn info(&self) -> &ComponentInfo;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn id(&self) -> &ComponentId {
        &self.info().id
    }

    fn category(&self) -> ComponentCategory {
        self.info().category
    }

    fn flavor(&self) -> &str {
        &self.info().flavor
    }

    /// External packages this component needs installed, in order
    fn requirements(&self) -> Vec<String> {
        Vec::new()
    }

    /// Runtime options this component understands, with their defaults
    fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions::new()
    }

    /// Compatibility check run against the assembled stack
    fn validator(&self) -> Option<&StackValidator> {
        None
    }

    /// Materialize resources a specific run needs
    ///
    /// Called once per run before anything executes. Must be safe to call
    /// again after a previous run's preparation partially failed.
    async fn prepare_pipeline_deployment(
        &self,
        _pipeline: &dyn Pipeline,
        _stack: &Stack,
        _runtime_configuration: &RuntimeConfiguration,
    ) -> ComponentResult<()> {
        Ok(())
    }

    /// Lightweight per-run setup right before execution
    async fn prepare_pipeline_run(&self) -> ComponentResult<()> {
        Ok(())
    }

    /// Release what the prepare hooks acquired
    ///
    /// Must tolerate hooks that only partially completed.
    async fn cleanup_pipeline_run(&self) -> ComponentResult<()> {
        Ok(())
    }
}

/// Component that runs pipelines
#[async_trait]
pub trait Orchestrator: StackComponent {
    /// Execution mode every other component of the stack must support
    fn execution_mode(&self) -> ExecutionMode {
        if self.info().supports_local_execution {
            ExecutionMode::Local
        } else {
            ExecutionMode::Remote
        }
    }

    /// Execute `pipeline` on `stack` under `run_name`
    async fn run_pipeline(
        &self,
        pipeline: &dyn Pipeline,
        stack: &Stack,
        run_name: &str,
    ) -> ComponentResult<RunOutput>;
}

/// Component that tracks pipeline and artifact metadata
pub trait MetadataStore: StackComponent {}

/// Component that persists artifacts
pub trait ArtifactStore: StackComponent {
    /// Root path or URI of the store
    fn path(&self) -> &str;
}

/// Component that hosts container images
pub trait ContainerRegistry: StackComponent {
    /// Registry URI
    fn uri(&self) -> &str;
}
