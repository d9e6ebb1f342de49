//! Lifecycle events for pipeline deployments
//!
//! A single `deploy_pipeline` call walks the state machine
//! `Idle → PreparingDeployment → PreparingRun → Executing → CleaningUp → Done`.
//! Failures while preparing go straight to `Failed`; a failure while
//! executing passes through `CleaningUp` first.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Phase of a single pipeline deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    Idle,
    PreparingDeployment,
    PreparingRun,
    Executing,
    CleaningUp,
    Done,
    Failed,
}

impl DeploymentPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentPhase::Done | DeploymentPhase::Failed)
    }

    /// Is `next` a legal successor of this phase?
    ///
    /// `PreparingRun → CleaningUp` is only taken when cleanup after a failed
    /// preparation is enabled; the run then ends in `Failed`.
    pub fn can_transition_to(&self, next: DeploymentPhase) -> bool {
        use DeploymentPhase::*;
        matches!(
            (self, next),
            (Idle, PreparingDeployment)
                | (PreparingDeployment, PreparingRun)
                | (PreparingDeployment, Failed)
                | (PreparingRun, Executing)
                | (PreparingRun, CleaningUp)
                | (PreparingRun, Failed)
                | (Executing, CleaningUp)
                | (CleaningUp, Done)
                | (CleaningUp, Failed)
        )
    }
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentPhase::Idle => "idle",
            DeploymentPhase::PreparingDeployment => "preparing_deployment",
            DeploymentPhase::PreparingRun => "preparing_run",
            DeploymentPhase::Executing => "executing",
            DeploymentPhase::CleaningUp => "cleaning_up",
            DeploymentPhase::Done => "done",
            DeploymentPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Envelope wrapping lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Name of the stack the pipeline is deployed on
    pub stack: String,

    /// Name of the pipeline being deployed
    pub pipeline: String,

    /// The actual event
    pub event: LifecycleEvent,
}

impl LifecycleEventEnvelope {
    pub fn new(stack: impl Into<String>, pipeline: impl Into<String>, event: LifecycleEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            stack: stack.into(),
            pipeline: pipeline.into(),
            event,
        }
    }
}

/// Lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// The deployment moved to a new phase
    ///
    /// `run_name` is unknown until the run name has been resolved, which
    /// happens after all components are prepared.
    PhaseChanged {
        run_name: Option<String>,
        from: DeploymentPhase,
        to: DeploymentPhase,
    },

    /// The orchestrator returned, successfully or not
    RunFinished {
        run_name: String,
        duration_ms: u64,
        succeeded: bool,
    },
}
