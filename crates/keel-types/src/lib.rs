//! Keel Types - Core types for stack composition
//!
//! A Keel stack is a validated set of interchangeable execution components
//! (an orchestrator, a metadata store, an artifact store and an optional
//! container registry) that a pipeline is deployed against.
//!
//! ## Architectural Boundaries
//!
//! - `keel-types` owns: the vocabulary shared by stacks and components
//! - `keel-stack` owns: composition, validation and the deployment lifecycle
//! - Component implementations own: everything that actually touches storage,
//!   registries or schedulers
//!
//! ## Key Concepts
//!
//! - **ComponentCategory**: Which slot of a stack a component fills
//! - **ExecutionMode**: Whether a stack runs pipelines locally or remotely
//! - **RuntimeConfiguration**: Per-run option overlay with a reserved run name
//! - **Pipeline**: The opaque workflow handed to the orchestrator
//! - **Events**: Phase transitions of a single pipeline deployment

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod category;
pub mod events;
pub mod ids;
pub mod pipeline;
pub mod runtime;

// Re-export main types
pub use category::{ComponentCategory, ExecutionMode};
pub use events::{DeploymentPhase, LifecycleEvent, LifecycleEventEnvelope};
pub use ids::ComponentId;
pub use pipeline::Pipeline;
pub use runtime::{OptionError, RuntimeConfiguration, RuntimeOptions, RUN_NAME_OPTION_KEY};

/// Open value type carried by runtime options and orchestrator results
pub use serde_json::Value as OptionValue;
