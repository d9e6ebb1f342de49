//! Keel Stack - Component composition and pipeline deployment
//!
//! Assembles an orchestrator, a metadata store, an artifact store and an
//! optional container registry into a validated [`Stack`], then coordinates
//! all of them around a single pipeline execution.
//!
//! ## Architectural Boundaries
//!
//! - `keel-stack` owns: composition, compatibility validation, lifecycle sequencing
//! - The orchestrator owns: actually executing the pipeline
//! - Other components own: whatever resources their hooks materialize
//!
//! ## Key Principle
//!
//! The stack never executes steps itself. It validates once at construction,
//! then walks every component through prepare-deployment, prepare-run and
//! cleanup around a delegated `run_pipeline` call.
//!
//! ## Usage
//!
//! ```no_run
//! use keel_stack::local::default_local_stack;
//! use keel_types::{Pipeline, RuntimeConfiguration};
//!
//! struct Training;
//!
//! impl Pipeline for Training {
//!     fn name(&self) -> &str {
//!         "training"
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stack = default_local_stack("/tmp/keel")?;
//!
//! let runtime_configuration = RuntimeConfiguration::default().with_option("epochs", 3);
//! let output = stack.deploy_pipeline(&Training, &runtime_configuration).await?;
//! println!("{output}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod component;
pub mod config;
pub mod deploy;
pub mod error;
pub mod local;
pub mod stack;
pub mod telemetry;
pub mod validator;

// Re-exports
pub use crate::component::{
    ArtifactStore, AsStackComponent, ComponentInfo, ContainerRegistry, MetadataStore,
    Orchestrator, RunOutput, StackComponent,
};
pub use crate::config::{ConfigError, LifecycleConfig, LoggingConfig};
pub use crate::deploy::human_readable_duration;
pub use crate::error::{ComponentError, ComponentResult, Result, StackError};
pub use crate::stack::{ComponentSet, Stack};
pub use crate::telemetry::init_tracing;
pub use crate::validator::{StackValidator, ValidationFn};
