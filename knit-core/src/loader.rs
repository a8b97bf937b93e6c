//! Loader pipeline: named content transforms applied before analysis.
//!
//! Transforms are looked up by name in a [`TransformRegistry`] populated at
//! startup. Every rule whose pattern matches a module's file path applies,
//! in declaration order; inside a rule, chained loaders run right-to-left.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::config::LoaderRule;
use crate::error::{BoxError, BuildError, Origin, Result};

/// What a transform gets to see besides the content itself.
#[derive(Debug, Clone, Copy)]
pub struct LoaderContext<'a> {
    /// Canonical key of the module being loaded.
    pub key: &'a str,
    /// Concrete file the content came from.
    pub resource: &'a Path,
    /// Options from the rule entry, `Null` when none were given.
    pub options: &'a Value,
}

/// A content-to-content transform.
pub trait Transform: Send + Sync {
    fn transform(&self, source: &str, cx: &LoaderContext<'_>) -> std::result::Result<String, BoxError>;
}

struct FnTransform<F>(F);

impl<F> Transform for FnTransform<F>
where
    F: Fn(&str) -> std::result::Result<String, BoxError> + Send + Sync,
{
    fn transform(&self, source: &str, _cx: &LoaderContext<'_>) -> std::result::Result<String, BoxError> {
        (self.0)(source)
    }
}

/// Name → transform lookup table.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn Transform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, transform: impl Transform + 'static) -> &mut Self {
        self.transforms.insert(name.into(), Arc::new(transform));
        self
    }

    /// Register a plain `content -> content` function.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&str) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
    {
        self.register(name, FnTransform(f))
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.transforms.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.names())
            .finish()
    }
}

/// Applies the configured rules to one module's content.
pub struct LoaderPipeline<'a> {
    rules: &'a [LoaderRule],
    registry: &'a TransformRegistry,
}

impl<'a> LoaderPipeline<'a> {
    pub fn new(rules: &'a [LoaderRule], registry: &'a TransformRegistry) -> Self {
        Self { rules, registry }
    }

    /// Run every matching transform over `content`.
    pub fn apply(&self, key: &str, resource: &Path, content: String) -> Result<String> {
        let mut content = content;

        for rule in self.rules.iter().filter(|rule| rule.matches(resource)) {
            for entry in rule.uses.application_order() {
                let name = entry.name();
                let transform = self
                    .registry
                    .resolve(name)
                    .ok_or_else(|| BuildError::LoaderResolution {
                        loader: name.to_string(),
                        key: key.to_string(),
                        origin: Origin::default(),
                    })?;

                let cx = LoaderContext {
                    key,
                    resource,
                    options: entry.options(),
                };
                trace!(loader = name, module = key, "applying loader");
                content = transform
                    .transform(&content, &cx)
                    .map_err(|source| BuildError::LoaderExecution {
                        loader: name.to_string(),
                        key: key.to_string(),
                        origin: Origin::default(),
                        source,
                    })?;
            }
        }

        Ok(content)
    }
}
