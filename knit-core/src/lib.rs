//! knit core - dependency-graph compiler for a minimal JavaScript bundler.
//!
//! Starting from an entry file, knit discovers every module the entry
//! transitively loads, runs each through the configured loaders, rewrites its
//! `require` calls to a private registry accessor and emits one
//! self-bootstrapping script.
//!
//! # Pipeline
//!
//! ```text
//! resolver → reader → loader pipeline → rewriter (front end) → module graph → emitter
//! ```
//!
//! - **Module keys**: every module is identified by a root-relative path such
//!   as `./src/a.js`; `./a` and `./a.js` name the same module.
//! - **Loaders**: named content transforms from a [`TransformRegistry`],
//!   selected per file by regex rules.
//! - **ES modules**: `import` / `export` are normalized to `require` form
//!   before rewriting.
//! - **Hooks**: plugins tap async callbacks on the six lifecycle phases.
//!
//! # Example
//!
//! ```no_run
//! use knit_core::{BuildConfig, Compiler, TransformRegistry};
//!
//! # async fn build() -> knit_core::Result<()> {
//! let config = BuildConfig::new("/path/to/project").with_entry("./src/main.js");
//! let output = Compiler::new(config, TransformRegistry::new()).run().await?;
//! println!("{} modules → {}", output.graph.len(), output.artifact_path.display());
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod config;
pub mod emitter;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod loader;
pub mod plugin;
pub mod reader;
pub mod resolver;
pub mod rewriter;
pub mod syntax;

pub use compiler::{BuildOutput, Compiler};
pub use config::{BuildConfig, BuildOptions, LoaderRule, PluginSpec};
pub use error::{BoxError, BuildError, Origin, Result};
pub use graph::{Dependency, GraphBuilder, ModuleGraph, ModuleRecord};
pub use hooks::{Hook, HookContext, Hooks, Phase};
pub use loader::{LoaderContext, LoaderPipeline, Transform, TransformRegistry};
pub use plugin::{Plugin, PluginRegistry};
pub use rewriter::{RewrittenModule, SourceRewriter};
pub use syntax::{JavaScriptFrontEnd, SourceFrontEnd};
