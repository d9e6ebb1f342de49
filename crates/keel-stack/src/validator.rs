//! Stack validators - compatibility predicates attached to components
//!
//! A component that only works next to certain other components (a remote
//! orchestrator that needs a container registry, an artifact store that needs
//! a metadata store of the same flavor, ...) carries a `StackValidator`. The
//! stack invokes it with itself once per validation pass.

use crate::stack::Stack;
use keel_types::ComponentCategory;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Custom validation function: `Err` carries the human-readable reason
pub type ValidationFn = dyn Fn(&Stack) -> Result<(), String> + Send + Sync;

/// Compatibility predicate evaluated against an assembled stack
#[derive(Clone, Default)]
pub struct StackValidator {
    required_components: BTreeSet<ComponentCategory>,
    custom_validation: Option<Arc<ValidationFn>>,
}

impl StackValidator {
    /// A validator that accepts every stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Require components of the given categories to be present
    pub fn requiring(categories: impl IntoIterator<Item = ComponentCategory>) -> Self {
        Self {
            required_components: categories.into_iter().collect(),
            custom_validation: None,
        }
    }

    /// A validator backed by a custom predicate
    pub fn from_fn<F>(validation: F) -> Self
    where
        F: Fn(&Stack) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::new().with_custom_validation(validation)
    }

    pub fn with_custom_validation<F>(mut self, validation: F) -> Self
    where
        F: Fn(&Stack) -> Result<(), String> + Send + Sync + 'static,
    {
        self.custom_validation = Some(Arc::new(validation));
        self
    }

    pub fn required_components(&self) -> &BTreeSet<ComponentCategory> {
        &self.required_components
    }

    /// Check `stack`; required categories are checked before the custom predicate
    pub fn validate(&self, stack: &Stack) -> Result<(), String> {
        let present = stack.components();
        let missing: Vec<&str> = self
            .required_components
            .iter()
            .filter(|category| !present.contains_key(*category))
            .map(ComponentCategory::as_str)
            .collect();

        if !missing.is_empty() {
            return Err(format!("missing required components: {}", missing.join(", ")));
        }

        match &self.custom_validation {
            Some(validation) => validation(stack),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for StackValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackValidator")
            .field("required_components", &self.required_components)
            .field("custom_validation", &self.custom_validation.is_some())
            .finish()
    }
}
