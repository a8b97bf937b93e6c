//! Plugin contract and registry.
//!
//! A plugin is anything that taps callbacks onto [`Hooks`] once, when the
//! compiler is created. Configuration refers to plugins by name; the
//! [`PluginRegistry`] maps each name to a factory that receives the plugin's
//! options.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::PluginSpec;
use crate::error::{BoxError, BuildError, Result};
use crate::hooks::Hooks;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Register this plugin's callbacks.
    fn apply(&self, hooks: &mut Hooks);
}

/// Builds a plugin from its options (`Null` when none were given).
pub type PluginFactory =
    Arc<dyn Fn(&Value) -> std::result::Result<Arc<dyn Plugin>, BoxError> + Send + Sync>;

/// Name → plugin factory.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Value) -> std::result::Result<Arc<dyn Plugin>, BoxError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create the plugin a config entry refers to.
    pub fn instantiate(&self, spec: &PluginSpec) -> Result<Arc<dyn Plugin>> {
        let name = spec.name();
        let factory = self.factories.get(name).ok_or_else(|| {
            BuildError::config(format!(
                "unknown plugin '{}' (available: {})",
                name,
                self.names().join(", ")
            ))
        })?;

        factory(spec.options()).map_err(|source| BuildError::Plugin {
            plugin: name.to_string(),
            phase: "setup",
            source,
        })
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("factories", &self.names())
            .finish()
    }
}
