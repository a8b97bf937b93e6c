//! The compiler: one configured bundler that can be run any number of times.
//!
//! # Run order
//!
//! ```text
//! beforeRun → beforeCompile → make + verify → afterCompile
//!           → render → emit → write artifact → afterRun
//! ```
//!
//! Any error runs the `failed` hook and is returned; nothing is written
//! unless every step before the write succeeded.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::BuildConfig;
use crate::emitter;
use crate::error::{BuildError, Result};
use crate::graph::{GraphBuilder, ModuleGraph};
use crate::hooks::{HookContext, Hooks, Phase};
use crate::loader::TransformRegistry;
use crate::syntax::{JavaScriptFrontEnd, SourceFrontEnd};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub entry: String,
    pub graph: Arc<ModuleGraph>,
    pub artifact_path: PathBuf,
    /// Artifact size in bytes.
    pub size: usize,
    pub duration: Duration,
}

pub struct Compiler {
    config: Arc<BuildConfig>,
    transforms: TransformRegistry,
    front_end: Arc<dyn SourceFrontEnd>,
    hooks: Hooks,
}

impl Compiler {
    /// Create a compiler and let every configured plugin tap its hooks.
    pub fn new(config: BuildConfig, transforms: TransformRegistry) -> Self {
        let mut hooks = Hooks::new();
        for plugin in &config.plugins {
            debug!(plugin = plugin.name(), "applying plugin");
            plugin.apply(&mut hooks);
        }

        Self {
            config: Arc::new(config),
            transforms,
            front_end: Arc::new(JavaScriptFrontEnd::new()),
            hooks,
        }
    }

    /// Replace the default JavaScript front end.
    pub fn with_front_end(mut self, front_end: Arc<dyn SourceFrontEnd>) -> Self {
        self.front_end = front_end;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Build and verify the module graph without emitting anything or
    /// calling hooks.
    pub async fn compile(&self) -> Result<ModuleGraph> {
        let builder = GraphBuilder::new(
            &self.config.root,
            &self.config.rules,
            &self.transforms,
            self.front_end.as_ref(),
        );
        let graph = builder.make(&self.config.entry).await?;
        graph.verify()?;

        for cycle in graph.cycles() {
            warn!(modules = %cycle.join(" -> "), "circular dependency");
        }

        Ok(graph)
    }

    /// Run a full build.
    pub async fn run(&self) -> Result<BuildOutput> {
        let started = Instant::now();
        info!(entry = %self.config.entry, root = %self.config.root.display(), "build started");

        match self.run_phases(started).await {
            Ok(output) => {
                info!(
                    modules = output.graph.len(),
                    bytes = output.size,
                    path = %output.artifact_path.display(),
                    elapsed_ms = output.duration.as_millis() as u64,
                    "build finished"
                );
                Ok(output)
            }
            Err(err) => {
                error!(error = %err, "build failed");
                let cx = self.context(Phase::Failed).with_error(&err);
                if let Err(hook_err) = self.hooks.call(cx).await {
                    warn!(error = %hook_err, "failed hook returned an error");
                }
                Err(err)
            }
        }
    }

    async fn run_phases(&self, started: Instant) -> Result<BuildOutput> {
        self.hooks.call(self.context(Phase::BeforeRun)).await?;
        self.hooks.call(self.context(Phase::BeforeCompile)).await?;

        let graph = Arc::new(self.compile().await?);
        self.hooks
            .call(self.context(Phase::AfterCompile).with_graph(graph.clone()))
            .await?;

        let artifact = Arc::new(emitter::render(&graph)?);
        self.hooks
            .call(
                self.context(Phase::Emit)
                    .with_graph(graph.clone())
                    .with_artifact(artifact.clone()),
            )
            .await?;

        let artifact_path = self.config.artifact_path();
        write_artifact(&artifact_path, &artifact).await?;

        self.hooks
            .call(
                self.context(Phase::AfterRun)
                    .with_graph(graph.clone())
                    .with_artifact(artifact.clone())
                    .with_artifact_path(artifact_path.clone()),
            )
            .await?;

        Ok(BuildOutput {
            entry: graph.entry().unwrap_or_default().to_string(),
            size: artifact.len(),
            graph,
            artifact_path,
            duration: started.elapsed(),
        })
    }

    fn context(&self, phase: Phase) -> HookContext {
        HookContext::new(phase, self.config.clone())
    }
}

/// Write through a temporary file so a partial artifact never appears.
async fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| BuildError::io(dir, e))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| BuildError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| BuildError::io(path, e))?;
    Ok(())
}
