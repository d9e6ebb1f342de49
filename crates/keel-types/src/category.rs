//! Component categories and execution modes
//!
//! The declaration order of [`ComponentCategory`] is the fixed order in which
//! a stack visits its components during every lifecycle phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The slot a component occupies in a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    /// Runs pipelines (mandatory)
    Orchestrator,
    /// Tracks pipeline, step and artifact metadata (mandatory)
    MetadataStore,
    /// Persists artifacts produced by steps (mandatory)
    ArtifactStore,
    /// Hosts container images for remote execution (optional)
    ContainerRegistry,
}

impl ComponentCategory {
    /// All categories in stack iteration order
    pub const ALL: [ComponentCategory; 4] = [
        ComponentCategory::Orchestrator,
        ComponentCategory::MetadataStore,
        ComponentCategory::ArtifactStore,
        ComponentCategory::ContainerRegistry,
    ];

    /// Does every stack need a component of this category?
    pub fn is_mandatory(&self) -> bool {
        !matches!(self, ComponentCategory::ContainerRegistry)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentCategory::Orchestrator => "orchestrator",
            ComponentCategory::MetadataStore => "metadata_store",
            ComponentCategory::ArtifactStore => "artifact_store",
            ComponentCategory::ContainerRegistry => "container_registry",
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the orchestrator of a stack executes pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Steps run on the machine that deploys the pipeline
    Local,
    /// Steps run on remote infrastructure
    Remote,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Local => f.write_str("local"),
            ExecutionMode::Remote => f.write_str("remote"),
        }
    }
}
