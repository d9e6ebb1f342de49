//! Recording mock components shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use keel_stack::{
    ArtifactStore, ComponentError, ComponentInfo, ComponentResult, ComponentSet,
    ContainerRegistry, MetadataStore, Orchestrator, RunOutput, Stack, StackComponent,
    StackValidator,
};
use keel_types::{ComponentCategory, Pipeline, RuntimeConfiguration, RuntimeOptions};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Ordered log of hook invocations across all mocks of a stack
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.entries().iter().any(|e| e.starts_with(prefix))
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    PrepareDeployment,
    PrepareRun,
    Run,
    Cleanup,
}

impl Hook {
    fn label(&self) -> &'static str {
        match self {
            Hook::PrepareDeployment => "prepare_deployment",
            Hook::PrepareRun => "prepare_run",
            Hook::Run => "run",
            Hook::Cleanup => "cleanup",
        }
    }
}

/// Component implementing every category trait and logging each hook call
pub struct MockComponent {
    info: ComponentInfo,
    journal: Journal,
    requirements: Vec<String>,
    options: RuntimeOptions,
    validator: Option<StackValidator>,
    fail_on: Option<Hook>,
}

impl MockComponent {
    pub fn new(name: &str, category: ComponentCategory, journal: &Journal) -> Self {
        Self {
            info: ComponentInfo::new(name, category, "mock"),
            journal: journal.clone(),
            requirements: Vec::new(),
            options: RuntimeOptions::new(),
            validator: None,
            fail_on: None,
        }
    }

    pub fn with_requirements(mut self, requirements: &[&str]) -> Self {
        self.requirements = requirements.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    pub fn with_validator(mut self, validator: StackValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn failing_on(mut self, hook: Hook) -> Self {
        self.fail_on = Some(hook);
        self
    }

    pub fn local_only(mut self) -> Self {
        self.info = self.info.local_only();
        self
    }

    pub fn remote_only(mut self) -> Self {
        self.info = self.info.remote_only();
        self
    }

    fn hook(&self, hook: Hook, suffix: Option<&str>) -> ComponentResult<()> {
        let entry = match suffix {
            Some(suffix) => format!("{}:{}:{}", self.info.name, hook.label(), suffix),
            None => format!("{}:{}", self.info.name, hook.label()),
        };
        self.journal.record(entry);

        if self.fail_on == Some(hook) {
            return Err(ComponentError::failed(format!(
                "{} failed in {}",
                self.info.name,
                hook.label()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StackComponent for MockComponent {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn requirements(&self) -> Vec<String> {
        self.requirements.clone()
    }

    fn runtime_options(&self) -> RuntimeOptions {
        self.options.clone()
    }

    fn validator(&self) -> Option<&StackValidator> {
        self.validator.as_ref()
    }

    async fn prepare_pipeline_deployment(
        &self,
        pipeline: &dyn Pipeline,
        _stack: &Stack,
        _runtime_configuration: &RuntimeConfiguration,
    ) -> ComponentResult<()> {
        self.hook(Hook::PrepareDeployment, Some(pipeline.name()))
    }

    async fn prepare_pipeline_run(&self) -> ComponentResult<()> {
        self.hook(Hook::PrepareRun, None)
    }

    async fn cleanup_pipeline_run(&self) -> ComponentResult<()> {
        self.hook(Hook::Cleanup, None)
    }
}

#[async_trait]
impl Orchestrator for MockComponent {
    async fn run_pipeline(
        &self,
        pipeline: &dyn Pipeline,
        stack: &Stack,
        run_name: &str,
    ) -> ComponentResult<RunOutput> {
        self.hook(Hook::Run, Some(run_name))?;
        Ok(json!({
            "pipeline": pipeline.name(),
            "stack": stack.name(),
            "run_name": run_name,
        }))
    }
}

impl MetadataStore for MockComponent {}

impl ArtifactStore for MockComponent {
    fn path(&self) -> &str {
        "/mock/artifacts"
    }
}

impl ContainerRegistry for MockComponent {
    fn uri(&self) -> &str {
        "mock://registry"
    }
}

pub struct TestPipeline(pub &'static str);

impl Pipeline for TestPipeline {
    fn name(&self) -> &str {
        self.0
    }
}

pub fn orchestrator(journal: &Journal) -> MockComponent {
    MockComponent::new("orchestrator", ComponentCategory::Orchestrator, journal)
}

pub fn metadata_store(journal: &Journal) -> MockComponent {
    MockComponent::new("metadata_store", ComponentCategory::MetadataStore, journal)
}

pub fn artifact_store(journal: &Journal) -> MockComponent {
    MockComponent::new("artifact_store", ComponentCategory::ArtifactStore, journal)
}

pub fn container_registry(journal: &Journal) -> MockComponent {
    MockComponent::new("container_registry", ComponentCategory::ContainerRegistry, journal)
}

/// Components of a full four-slot stack
pub fn full_components(journal: &Journal) -> ComponentSet {
    ComponentSet::new(
        Arc::new(orchestrator(journal)),
        Arc::new(metadata_store(journal)),
        Arc::new(artifact_store(journal)),
    )
    .with_container_registry(Arc::new(container_registry(journal)))
}
