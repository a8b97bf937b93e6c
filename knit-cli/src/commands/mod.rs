//! Command implementations for the knit CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod build;
pub mod graph;

use std::path::Path;

use anyhow::{Context, Result};
use knit_core::BuildConfig;

use crate::builtins;
use crate::config::{Overrides, ProjectConfig};

/// Resolve the build configuration for a run started in `cwd`.
pub(crate) fn load_build_config(
    cwd: &Path,
    config: Option<&str>,
    overrides: Overrides,
) -> Result<BuildConfig> {
    let project = ProjectConfig::load(cwd, config)?.with_overrides(overrides);
    let origin = project
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());

    BuildConfig::from_options(project.options, &project.base_dir, &builtins::plugins())
        .with_context(|| format!("Invalid configuration ({})", origin))
}
