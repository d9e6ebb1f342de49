//! Stack - a validated composition of execution components
//!
//! A stack holds exactly one orchestrator, metadata store and artifact store
//! plus an optional container registry. Validation runs inside the
//! constructor, so a `Stack` value that exists has passed validation.

use crate::component::{
    ArtifactStore, AsStackComponent, ContainerRegistry, MetadataStore, Orchestrator,
    StackComponent,
};
use crate::config::LifecycleConfig;
use crate::error::{Result, StackError};
use keel_types::{ComponentCategory, LifecycleEventEnvelope, RuntimeOptions};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// The components a stack is assembled from
#[derive(Clone)]
pub struct ComponentSet {
    pub orchestrator: Arc<dyn Orchestrator>,
    pub metadata_store: Arc<dyn MetadataStore>,
    pub artifact_store: Arc<dyn ArtifactStore>,
    pub container_registry: Option<Arc<dyn ContainerRegistry>>,
}

impl ComponentSet {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        metadata_store: Arc<dyn MetadataStore>,
        artifact_store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            orchestrator,
            metadata_store,
            artifact_store,
            container_registry: None,
        }
    }

    pub fn with_container_registry(mut self, container_registry: Arc<dyn ContainerRegistry>) -> Self {
        self.container_registry = Some(container_registry);
        self
    }
}

/// A named, validated set of components pipelines are deployed on
pub struct Stack {
    name: String,
    orchestrator: Arc<dyn Orchestrator>,
    metadata_store: Arc<dyn MetadataStore>,
    artifact_store: Arc<dyn ArtifactStore>,
    container_registry: Option<Arc<dyn ContainerRegistry>>,
    pub(crate) config: LifecycleConfig,
    pub(crate) event_tx: broadcast::Sender<LifecycleEventEnvelope>,
}

impl Stack {
    /// Assemble and validate a stack with the default lifecycle configuration
    pub fn new(name: impl Into<String>, components: ComponentSet) -> Result<Self> {
        Self::with_config(name, components, LifecycleConfig::default())
    }

    /// Assemble and validate a stack
    pub fn with_config(
        name: impl Into<String>,
        components: ComponentSet,
        config: LifecycleConfig,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let stack = Self {
            name: name.into(),
            orchestrator: components.orchestrator,
            metadata_store: components.metadata_store,
            artifact_store: components.artifact_store,
            container_registry: components.container_registry,
            config,
            event_tx,
        };

        stack.validate()?;

        info!(
            stack = %stack.name,
            orchestrator = %stack.orchestrator.name(),
            metadata_store = %stack.metadata_store.name(),
            artifact_store = %stack.artifact_store.name(),
            container_registry = stack.container_registry.as_ref().map(|r| r.name()),
            "Stack assembled"
        );

        Ok(stack)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn orchestrator(&self) -> &Arc<dyn Orchestrator> {
        &self.orchestrator
    }

    pub fn metadata_store(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata_store
    }

    pub fn artifact_store(&self) -> &Arc<dyn ArtifactStore> {
        &self.artifact_store
    }

    pub fn container_registry(&self) -> Option<&Arc<dyn ContainerRegistry>> {
        self.container_registry.as_ref()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Present components keyed by category, iterated in lifecycle order
    pub fn components(&self) -> BTreeMap<ComponentCategory, &dyn StackComponent> {
        let mut components = BTreeMap::new();
        components.insert(
            ComponentCategory::Orchestrator,
            self.orchestrator.as_stack_component(),
        );
        components.insert(
            ComponentCategory::MetadataStore,
            self.metadata_store.as_stack_component(),
        );
        components.insert(
            ComponentCategory::ArtifactStore,
            self.artifact_store.as_stack_component(),
        );
        if let Some(registry) = &self.container_registry {
            components.insert(
                ComponentCategory::ContainerRegistry,
                registry.as_stack_component(),
            );
        }
        components
    }

    /// Subscribe to lifecycle events of runs on this stack
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEventEnvelope> {
        self.event_tx.subscribe()
    }

    /// Check that the components form a usable stack
    ///
    /// 1. every component sits in the slot of its own category
    /// 2. every component supports the orchestrator's execution mode
    ///    (when `enforce_execution_mode` is set)
    /// 3. every attached `StackValidator` accepts the stack
    pub fn validate(&self) -> Result<()> {
        let components = self.components();

        for (slot, component) in &components {
            if component.category() != *slot {
                return Err(StackError::MisplacedComponent {
                    component: component.name().to_string(),
                    slot: *slot,
                    found: component.category(),
                });
            }
        }

        if self.config.enforce_execution_mode {
            let mode = self.orchestrator.execution_mode();
            for component in components.values() {
                if !component.info().supports(mode) {
                    return Err(StackError::UnsupportedExecutionMode {
                        component: component.name().to_string(),
                        category: component.category(),
                        mode,
                        orchestrator: self.orchestrator.name().to_string(),
                    });
                }
            }
        }

        for component in components.values() {
            if let Some(validator) = component.validator() {
                validator
                    .validate(self)
                    .map_err(|reason| StackError::Validation {
                        component: component.name().to_string(),
                        category: component.category(),
                        reason,
                    })?;
            }
        }

        Ok(())
    }

    /// Package requirements of all components outside `exclude_components`
    ///
    /// Lists are concatenated in lifecycle order without deduplication;
    /// resolving duplicates is left to the installer.
    pub fn requirements(&self, exclude_components: &BTreeSet<ComponentCategory>) -> Vec<String> {
        self.components()
            .into_iter()
            .filter(|(category, _)| !exclude_components.contains(category))
            .flat_map(|(_, component)| component.requirements())
            .collect()
    }

    /// Runtime options of all components merged into one mapping
    ///
    /// A key declared by several components keeps the value of the last one
    /// in lifecycle order; collisions are logged, never rejected.
    pub fn runtime_options(&self) -> RuntimeOptions {
        let merged = self.merge_runtime_options();

        for (component, duplicates) in &merged.collisions {
            warn!(
                stack = %self.name,
                component = %component,
                duplicates = ?duplicates,
                "Found duplicate runtime options"
            );
        }

        merged.options
    }

    /// Option keys declared by more than one component, sorted
    pub fn duplicate_runtime_options(&self) -> Vec<String> {
        let duplicates: BTreeSet<String> = self
            .merge_runtime_options()
            .collisions
            .into_iter()
            .flat_map(|(_, duplicates)| duplicates)
            .collect();
        duplicates.into_iter().collect()
    }

    fn merge_runtime_options(&self) -> MergedOptions<'_> {
        let mut merged = MergedOptions {
            options: RuntimeOptions::new(),
            collisions: Vec::new(),
        };

        for component in self.components().into_values() {
            let component_options = component.runtime_options();

            let mut duplicates: Vec<String> = component_options
                .keys()
                .filter(|key| merged.options.contains_key(*key))
                .cloned()
                .collect();
            if !duplicates.is_empty() {
                duplicates.sort();
                merged.collisions.push((component.name(), duplicates));
            }

            merged.options.extend(component_options);
        }

        merged
    }
}

/// Merged option mapping plus the keys each component overwrote
struct MergedOptions<'a> {
    options: RuntimeOptions,
    collisions: Vec<(&'a str, Vec<String>)>,
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("name", &self.name)
            .field("orchestrator", &self.orchestrator.info())
            .field("metadata_store", &self.metadata_store.info())
            .field("artifact_store", &self.artifact_store.info())
            .field(
                "container_registry",
                &self.container_registry.as_ref().map(|r| r.info()),
            )
            .finish()
    }
}
