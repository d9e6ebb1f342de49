//! Local reference components
//!
//! These components run everything on the current machine and are suitable
//! for development and testing. Production stacks plug in remote
//! orchestrators and object-store backed stores that implement the same
//! traits.

use crate::component::{
    ArtifactStore, ComponentInfo, ContainerRegistry, MetadataStore, Orchestrator, RunOutput,
    StackComponent,
};
use crate::error::{ComponentError, ComponentResult, Result, StackError};
use crate::stack::{ComponentSet, Stack};
use async_trait::async_trait;
use keel_types::{ComponentCategory, ComponentId, Pipeline, RuntimeConfiguration};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// URI prefixes of filesystems that are never local
pub const REMOTE_FS_PREFIXES: [&str; 5] = ["gs://", "hdfs://", "s3://", "az://", "abfs://"];

/// Reject paths that point at a remote filesystem
fn ensure_local_path(component: &str, path: &str) -> ComponentResult<()> {
    if REMOTE_FS_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return Err(ComponentError::invalid_configuration(
            component,
            format!("path `{path}` is not a local path"),
        ));
    }
    Ok(())
}

/// Orchestrator running pipelines in the current process
pub struct LocalOrchestrator {
    info: ComponentInfo,
}

impl LocalOrchestrator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ComponentInfo::new(name, ComponentCategory::Orchestrator, "local").local_only(),
        }
    }
}

#[async_trait]
impl StackComponent for LocalOrchestrator {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }
}

#[async_trait]
impl Orchestrator for LocalOrchestrator {
    async fn run_pipeline(
        &self,
        pipeline: &dyn Pipeline,
        stack: &Stack,
        run_name: &str,
    ) -> ComponentResult<RunOutput> {
        let steps = pipeline.step_names();
        for step in &steps {
            info!(run_name, step = %step, "Running step");
        }

        Ok(json!({
            "pipeline": pipeline.name(),
            "run_name": run_name,
            "stack": stack.name(),
            "steps": steps,
        }))
    }
}

/// Artifact store backed by a local directory
pub struct LocalArtifactStore {
    info: ComponentInfo,
    path: String,
}

impl LocalArtifactStore {
    /// Create the store; fails if `path` points at a remote filesystem
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> ComponentResult<Self> {
        let info =
            ComponentInfo::new(name, ComponentCategory::ArtifactStore, "local").local_only();
        let path = path.into();
        ensure_local_path(&info.name, &path)?;
        Ok(Self { info, path })
    }

    pub fn with_id(mut self, id: ComponentId) -> Self {
        self.info.id = id;
        self
    }
}

#[async_trait]
impl StackComponent for LocalArtifactStore {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    async fn prepare_pipeline_deployment(
        &self,
        _pipeline: &dyn Pipeline,
        _stack: &Stack,
        _runtime_configuration: &RuntimeConfiguration,
    ) -> ComponentResult<()> {
        tokio::fs::create_dir_all(&self.path).await?;
        Ok(())
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn path(&self) -> &str {
        &self.path
    }
}

/// Metadata store kept in a local SQLite database file
pub struct SqliteMetadataStore {
    info: ComponentInfo,
    uri: String,
}

impl SqliteMetadataStore {
    /// Create the store; fails if `uri` points at a remote filesystem
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> ComponentResult<Self> {
        let info =
            ComponentInfo::new(name, ComponentCategory::MetadataStore, "sqlite").local_only();
        let uri = uri.into();
        ensure_local_path(&info.name, &uri)?;
        Ok(Self { info, uri })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

#[async_trait]
impl StackComponent for SqliteMetadataStore {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    async fn prepare_pipeline_deployment(
        &self,
        _pipeline: &dyn Pipeline,
        _stack: &Stack,
        _runtime_configuration: &RuntimeConfiguration,
    ) -> ComponentResult<()> {
        if let Some(parent) = Path::new(&self.uri).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

impl MetadataStore for SqliteMetadataStore {}

/// Container registry addressed by URI only
pub struct DefaultContainerRegistry {
    info: ComponentInfo,
    uri: String,
}

impl DefaultContainerRegistry {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            info: ComponentInfo::new(name, ComponentCategory::ContainerRegistry, "default"),
            uri: uri.into(),
        }
    }
}

#[async_trait]
impl StackComponent for DefaultContainerRegistry {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }
}

impl ContainerRegistry for DefaultContainerRegistry {
    fn uri(&self) -> &str {
        &self.uri
    }
}

/// Stack running everything locally below `root`
///
/// Artifacts live in `root/local_stores/<uuid>` (the uuid doubles as the
/// artifact store id) and metadata in `metadata.db` inside that directory.
pub fn default_local_stack(root: impl AsRef<Path>) -> Result<Stack> {
    let artifact_store_id = ComponentId::generate();
    let artifact_store_path: PathBuf = root
        .as_ref()
        .join("local_stores")
        .join(artifact_store_id.as_uuid().to_string());
    let metadata_store_path = artifact_store_path.join("metadata.db");

    let artifact_store = LocalArtifactStore::new(
        "local_artifact_store",
        artifact_store_path.to_string_lossy(),
    )
    .map_err(|source| StackError::InvalidComponent {
        category: ComponentCategory::ArtifactStore,
        source,
    })?
    .with_id(artifact_store_id);

    let metadata_store = SqliteMetadataStore::new(
        "local_metadata_store",
        metadata_store_path.to_string_lossy(),
    )
    .map_err(|source| StackError::InvalidComponent {
        category: ComponentCategory::MetadataStore,
        source,
    })?;

    Stack::new(
        "local_stack",
        ComponentSet::new(
            Arc::new(LocalOrchestrator::new("local_orchestrator")),
            Arc::new(metadata_store),
            Arc::new(artifact_store),
        ),
    )
}
