//! Stack error types

use crate::config::ConfigError;
use keel_types::{ComponentCategory, DeploymentPhase, ExecutionMode};
use thiserror::Error;

/// Errors raised by stack components
///
/// Component implementations return these from their lifecycle hooks and
/// factories; the stack wraps them with the phase and component they came from.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Invalid configuration for `{component}`: {reason}")]
    InvalidConfiguration { component: String, reason: String },

    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ComponentError {
    pub fn failed(message: impl Into<String>) -> Self {
        ComponentError::Failed(message.into())
    }

    pub fn invalid_configuration(component: impl Into<String>, reason: impl Into<String>) -> Self {
        ComponentError::InvalidConfiguration {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for component hooks
pub type ComponentResult<T> = std::result::Result<T, ComponentError>;

/// Stack errors
#[derive(Debug, Error)]
pub enum StackError {
    #[error("Invalid {category} component: {source}")]
    InvalidComponent {
        category: ComponentCategory,
        #[source]
        source: ComponentError,
    },

    #[error("Component `{component}` is a {found} and cannot fill the {slot} slot")]
    MisplacedComponent {
        component: String,
        slot: ComponentCategory,
        found: ComponentCategory,
    },

    #[error(
        "{category} `{component}` does not support {mode} execution required by orchestrator `{orchestrator}`"
    )]
    UnsupportedExecutionMode {
        component: String,
        category: ComponentCategory,
        mode: ExecutionMode,
        orchestrator: String,
    },

    #[error("Stack validation failed for {category} `{component}`: {reason}")]
    Validation {
        component: String,
        category: ComponentCategory,
        reason: String,
    },

    #[error("Failed to prepare pipeline deployment on {category} `{component}`: {source}")]
    DeploymentPreparation {
        component: String,
        category: ComponentCategory,
        #[source]
        source: ComponentError,
    },

    #[error("Failed to prepare pipeline run on {category} `{component}`: {source}")]
    RunPreparation {
        component: String,
        category: ComponentCategory,
        #[source]
        source: ComponentError,
    },

    #[error("Pipeline run `{run_name}` failed in orchestrator `{orchestrator}`: {source}")]
    Execution {
        orchestrator: String,
        run_name: String,
        #[source]
        source: ComponentError,
    },

    #[error("Failed to clean up pipeline run on {category} `{component}`: {source}")]
    Cleanup {
        component: String,
        category: ComponentCategory,
        #[source]
        source: ComponentError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl StackError {
    /// Raised while assembling or validating a stack, before any run
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            StackError::InvalidComponent { .. }
                | StackError::MisplacedComponent { .. }
                | StackError::UnsupportedExecutionMode { .. }
                | StackError::Validation { .. }
        )
    }

    /// Lifecycle phase a deployment error was raised in
    pub fn phase(&self) -> Option<DeploymentPhase> {
        match self {
            StackError::DeploymentPreparation { .. } => Some(DeploymentPhase::PreparingDeployment),
            StackError::RunPreparation { .. } => Some(DeploymentPhase::PreparingRun),
            StackError::Execution { .. } => Some(DeploymentPhase::Executing),
            StackError::Cleanup { .. } => Some(DeploymentPhase::CleaningUp),
            _ => None,
        }
    }

    /// Name of the component the error is attributed to
    pub fn component(&self) -> Option<&str> {
        match self {
            StackError::MisplacedComponent { component, .. }
            | StackError::UnsupportedExecutionMode { component, .. }
            | StackError::Validation { component, .. }
            | StackError::DeploymentPreparation { component, .. }
            | StackError::RunPreparation { component, .. }
            | StackError::Cleanup { component, .. } => Some(component),
            StackError::Execution { orchestrator, .. } => Some(orchestrator),
            StackError::InvalidComponent { .. } | StackError::Config(_) => None,
        }
    }

    /// The underlying component failure, if any
    pub fn component_error(&self) -> Option<&ComponentError> {
        match self {
            StackError::InvalidComponent { source, .. }
            | StackError::DeploymentPreparation { source, .. }
            | StackError::RunPreparation { source, .. }
            | StackError::Execution { source, .. }
            | StackError::Cleanup { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for stack operations
pub type Result<T> = std::result::Result<T, StackError>;
