//! Lifecycle hooks.
//!
//! A build exposes six fixed [`Phase`]s. Plugins tap async callbacks onto
//! them; calling a phase awaits every callback in registration order, one at
//! a time. The first callback error stops the phase and fails the build.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::trace;

use crate::config::BuildConfig;
use crate::error::{BoxError, BuildError, Result};
use crate::graph::ModuleGraph;

/// Named points in a compiler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    BeforeRun,
    AfterRun,
    BeforeCompile,
    AfterCompile,
    Emit,
    Failed,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::BeforeRun,
        Phase::AfterRun,
        Phase::BeforeCompile,
        Phase::AfterCompile,
        Phase::Emit,
        Phase::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeforeRun => "beforeRun",
            Phase::AfterRun => "afterRun",
            Phase::BeforeCompile => "beforeCompile",
            Phase::AfterCompile => "afterCompile",
            Phase::Emit => "emit",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook callback can see of the run.
///
/// Fields are filled as the run progresses: `graph` from `afterCompile`,
/// `artifact` from `emit`, `artifact_path` in `afterRun`, `error` in `failed`.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub phase: Phase,
    pub config: Arc<BuildConfig>,
    pub graph: Option<Arc<ModuleGraph>>,
    pub artifact: Option<Arc<String>>,
    pub artifact_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl HookContext {
    pub fn new(phase: Phase, config: Arc<BuildConfig>) -> Self {
        Self {
            phase,
            config,
            graph: None,
            artifact: None,
            artifact_path: None,
            error: None,
        }
    }

    pub fn with_graph(mut self, graph: Arc<ModuleGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_artifact(mut self, artifact: Arc<String>) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn with_artifact_path(mut self, path: PathBuf) -> Self {
        self.artifact_path = Some(path);
        self
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// A tapped callback.
pub type HookFn =
    Arc<dyn Fn(Arc<HookContext>) -> BoxFuture<'static, std::result::Result<(), BoxError>> + Send + Sync>;

#[derive(Clone)]
struct Tap {
    plugin: String,
    callback: HookFn,
}

/// An ordered list of callbacks for one phase.
#[derive(Clone, Default)]
pub struct Hook {
    taps: Vec<Tap>,
}

impl Hook {
    /// Append a callback, attributed to `plugin` in errors.
    pub fn tap<F, Fut>(&mut self, plugin: impl Into<String>, callback: F) -> &mut Self
    where
        F: Fn(Arc<HookContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        let callback: HookFn = Arc::new(move |cx| Box::pin(callback(cx)));
        self.taps.push(Tap {
            plugin: plugin.into(),
            callback,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Names of the tapping plugins, in call order.
    pub fn plugins(&self) -> impl Iterator<Item = &str> {
        self.taps.iter().map(|t| t.plugin.as_str())
    }

    /// Await every callback in order, stopping at the first error.
    pub async fn call(&self, cx: Arc<HookContext>) -> Result<()> {
        let phase = cx.phase;
        for tap in &self.taps {
            trace!(phase = phase.as_str(), plugin = %tap.plugin, "calling hook");
            (tap.callback)(cx.clone())
                .await
                .map_err(|source| BuildError::Plugin {
                    plugin: tap.plugin.clone(),
                    phase: phase.as_str(),
                    source,
                })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.plugins()).finish()
    }
}

/// One [`Hook`] per [`Phase`].
#[derive(Debug, Clone, Default)]
pub struct Hooks {
    pub before_run: Hook,
    pub after_run: Hook,
    pub before_compile: Hook,
    pub after_compile: Hook,
    pub emit: Hook,
    pub failed: Hook,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, phase: Phase) -> &Hook {
        match phase {
            Phase::BeforeRun => &self.before_run,
            Phase::AfterRun => &self.after_run,
            Phase::BeforeCompile => &self.before_compile,
            Phase::AfterCompile => &self.after_compile,
            Phase::Emit => &self.emit,
            Phase::Failed => &self.failed,
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> &mut Hook {
        match phase {
            Phase::BeforeRun => &mut self.before_run,
            Phase::AfterRun => &mut self.after_run,
            Phase::BeforeCompile => &mut self.before_compile,
            Phase::AfterCompile => &mut self.after_compile,
            Phase::Emit => &mut self.emit,
            Phase::Failed => &mut self.failed,
        }
    }

    /// Call the hook for `cx.phase`.
    pub async fn call(&self, cx: HookContext) -> Result<()> {
        self.get(cx.phase).call(Arc::new(cx)).await
    }
}
