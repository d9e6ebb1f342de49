//! Runtime configuration - dynamic options for a single pipeline run
//!
//! A `RuntimeConfiguration` is an open key/value bag. Components declare the
//! options they understand through `runtime_options()`; the configuration
//! itself never validates keys and passes unknown ones through unchanged.
//! The only reserved key is [`RUN_NAME_OPTION_KEY`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::Index;
use thiserror::Error;

/// Key under which the optional run name is stored
pub const RUN_NAME_OPTION_KEY: &str = "run_name";

/// Option schema fragment: option key to default value
pub type RuntimeOptions = HashMap<String, Value>;

/// Errors raised by typed option access
#[derive(Debug, Error)]
pub enum OptionError {
    #[error("Runtime option `{key}` has an unexpected type: {source}")]
    InvalidType {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Dynamic options for a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeConfiguration {
    options: HashMap<String, Value>,
}

impl RuntimeConfiguration {
    /// Create a configuration with an optional run name and no other options
    pub fn new(run_name: Option<String>) -> Self {
        let mut options = HashMap::new();
        options.insert(
            RUN_NAME_OPTION_KEY.to_string(),
            run_name.map(Value::String).unwrap_or(Value::Null),
        );
        Self { options }
    }

    /// Create a configuration requesting a specific run name
    pub fn with_run_name(run_name: impl Into<String>) -> Self {
        Self::new(Some(run_name.into()))
    }

    /// Builder-style option setter
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// The requested run name, if any
    ///
    /// Absent, null and non-string values all mean "no run name requested".
    pub fn run_name(&self) -> Option<&str> {
        self.options.get(RUN_NAME_OPTION_KEY).and_then(Value::as_str)
    }

    pub fn set_run_name(&mut self, run_name: Option<String>) {
        self.options.insert(
            RUN_NAME_OPTION_KEY.to_string(),
            run_name.map(Value::String).unwrap_or(Value::Null),
        );
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Deserialize an option into a concrete type
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, OptionError> {
        match self.options.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| OptionError::InvalidType {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    /// Set an option, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.options.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.options.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.options.iter()
    }
}

impl Default for RuntimeConfiguration {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Index<&str> for RuntimeConfiguration {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match self.options.get(key) {
            Some(value) => value,
            None => panic!("runtime option `{key}` is not set"),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for RuntimeConfiguration {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RuntimeConfiguration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut configuration = Self::default();
        configuration.extend(iter);
        configuration
    }
}
