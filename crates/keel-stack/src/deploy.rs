//! Pipeline deployment lifecycle
//!
//! `deploy_pipeline` coordinates every component of a stack around a single
//! orchestrator call. Phases run strictly in sequence and each visits the
//! components in lifecycle order (orchestrator, metadata store, artifact
//! store, container registry):
//!
//! 1. `prepare_pipeline_deployment` - fail-fast, nothing is rolled back
//! 2. `prepare_pipeline_run`
//! 3. run name resolution
//! 4. `Orchestrator::run_pipeline`
//! 5. `cleanup_pipeline_run` - always runs once execution started
//!
//! An execution error is never replaced by a cleanup error.

use crate::component::{RunOutput, StackComponent};
use crate::error::{Result, StackError};
use crate::stack::Stack;
use keel_types::{
    ComponentCategory, DeploymentPhase, LifecycleEvent, LifecycleEventEnvelope, Pipeline,
    RuntimeConfiguration,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

impl Stack {
    /// Deploy `pipeline` on this stack and return the orchestrator's result
    ///
    /// Not safe to call concurrently for overlapping runs on the same stack;
    /// components keep per-run state between the hooks.
    #[instrument(skip_all, fields(stack = %self.name(), pipeline = %pipeline.name()))]
    pub async fn deploy_pipeline(
        &self,
        pipeline: &dyn Pipeline,
        runtime_configuration: &RuntimeConfiguration,
    ) -> Result<RunOutput> {
        let mut run = RunTracker::new(self, pipeline.name());
        let components = self.components();

        run.advance(DeploymentPhase::PreparingDeployment);
        for (category, component) in &components {
            debug!(%category, component = %component.name(), "Preparing pipeline deployment");
            if let Err(source) = component
                .prepare_pipeline_deployment(pipeline, self, runtime_configuration)
                .await
            {
                run.advance(DeploymentPhase::Failed);
                return Err(StackError::DeploymentPreparation {
                    component: component.name().to_string(),
                    category: *category,
                    source,
                });
            }
        }

        run.advance(DeploymentPhase::PreparingRun);
        let mut prepared: Vec<(ComponentCategory, &dyn StackComponent)> = Vec::new();
        for (category, component) in &components {
            debug!(%category, component = %component.name(), "Preparing pipeline run");
            match component.prepare_pipeline_run().await {
                Ok(()) => prepared.push((*category, *component)),
                Err(source) => {
                    let error = StackError::RunPreparation {
                        component: component.name().to_string(),
                        category: *category,
                        source,
                    };
                    if self.config.cleanup_after_failed_preparation {
                        run.advance(DeploymentPhase::CleaningUp);
                        if let Err(cleanup_error) = cleanup_components(&prepared).await {
                            warn!(error = %cleanup_error, "Cleanup after failed run preparation failed");
                        }
                    }
                    run.advance(DeploymentPhase::Failed);
                    return Err(error);
                }
            }
        }

        let run_name = self.resolve_run_name(pipeline, runtime_configuration);
        run.run_name = Some(run_name.clone());

        info!(
            "Using stack `{}` to run pipeline `{}`...",
            self.name(),
            pipeline.name()
        );
        run.advance(DeploymentPhase::Executing);
        let start = Instant::now();

        let outcome = self
            .orchestrator()
            .run_pipeline(pipeline, self, &run_name)
            .await;

        let duration = start.elapsed();
        run.finished(&run_name, duration, outcome.is_ok());
        match &outcome {
            Ok(_) => info!(
                "Pipeline run `{}` has finished in {}.",
                run_name,
                human_readable_duration(duration)
            ),
            Err(error) => warn!(
                %error,
                "Pipeline run `{}` failed after {}.",
                run_name,
                human_readable_duration(duration)
            ),
        }

        run.advance(DeploymentPhase::CleaningUp);
        let cleanup = cleanup_components(&prepared).await;

        match (outcome, cleanup) {
            (Ok(output), Ok(())) => {
                run.advance(DeploymentPhase::Done);
                Ok(output)
            }
            (Ok(_), Err(cleanup_error)) => {
                run.advance(DeploymentPhase::Failed);
                Err(cleanup_error)
            }
            (Err(source), cleanup) => {
                if let Err(cleanup_error) = cleanup {
                    warn!(error = %cleanup_error, "Cleanup failed after a failed pipeline run");
                }
                run.advance(DeploymentPhase::Failed);
                Err(StackError::Execution {
                    orchestrator: self.orchestrator().name().to_string(),
                    run_name,
                    source,
                })
            }
        }
    }

    /// Run name from the configuration, or `<pipeline>-<timestamp>`
    pub fn resolve_run_name(
        &self,
        pipeline: &dyn Pipeline,
        runtime_configuration: &RuntimeConfiguration,
    ) -> String {
        match runtime_configuration.run_name() {
            Some(run_name) if !run_name.is_empty() => run_name.to_string(),
            _ => format!(
                "{}-{}",
                pipeline.name(),
                chrono::Local::now().format(&self.config.run_name_timestamp_format)
            ),
        }
    }
}

/// Clean up every component, returning the first failure
async fn cleanup_components(components: &[(ComponentCategory, &dyn StackComponent)]) -> Result<()> {
    let mut first_error = None;

    for (category, component) in components {
        debug!(%category, component = %component.name(), "Cleaning up pipeline run");
        if let Err(source) = component.cleanup_pipeline_run().await {
            let error = StackError::Cleanup {
                component: component.name().to_string(),
                category: *category,
                source,
            };
            if first_error.is_none() {
                first_error = Some(error);
            } else {
                warn!(%error, "Additional cleanup failure");
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Tracks the phase of one deployment and publishes transitions
struct RunTracker<'a> {
    stack: &'a Stack,
    pipeline: &'a str,
    run_name: Option<String>,
    phase: DeploymentPhase,
}

impl<'a> RunTracker<'a> {
    fn new(stack: &'a Stack, pipeline: &'a str) -> Self {
        Self {
            stack,
            pipeline,
            run_name: None,
            phase: DeploymentPhase::Idle,
        }
    }

    fn advance(&mut self, next: DeploymentPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal deployment transition {} -> {}",
            self.phase,
            next
        );
        debug!(from = %self.phase, to = %next, "Deployment phase changed");

        let from = std::mem::replace(&mut self.phase, next);
        self.publish(LifecycleEvent::PhaseChanged {
            run_name: self.run_name.clone(),
            from,
            to: next,
        });
    }

    fn finished(&self, run_name: &str, duration: Duration, succeeded: bool) {
        self.publish(LifecycleEvent::RunFinished {
            run_name: run_name.to_string(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            succeeded,
        });
    }

    fn publish(&self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.stack.event_tx.send(LifecycleEventEnvelope::new(
            self.stack.name(),
            self.pipeline,
            event,
        ));
    }
}

/// Format a duration as `1d2h3m4s`, `2h3m4s`, `3m4s` or `4.512s`
pub fn human_readable_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    if days > 0 {
        format!("{days}d{hours}h{minutes}m{seconds}s")
    } else if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
