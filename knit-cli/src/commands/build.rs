//! Build command - bundle the entry module and everything it loads
//!
//! Runs the full lifecycle (hooks included) and writes the artifact to
//! `<output.path>/<output.fileName>`. Nothing is written when any module
//! fails to resolve, load or rewrite.

use crate::builtins;
use crate::config::Overrides;
use crate::output::{format_size, Output, OutputConfig, OutputFormat, Outputter, TableOutput};
use anyhow::Result;
use colored::Colorize;
use knit_core::{BuildOutput, Compiler};
use serde::Serialize;
use std::path::Path;

/// Summary of a finished build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub entry: String,
    pub artifact: String,
    pub modules: usize,
    pub dependencies: usize,
    pub size: usize,
    /// Groups of keys that load each other.
    pub cycles: Vec<Vec<String>>,
    pub duration_ms: u64,
}

impl BuildReport {
    pub fn from_output(output: &BuildOutput, root: &Path) -> Self {
        let artifact = output
            .artifact_path
            .strip_prefix(root)
            .unwrap_or(&output.artifact_path)
            .display()
            .to_string();

        Self {
            entry: output.entry.clone(),
            artifact,
            modules: output.graph.len(),
            dependencies: output.graph.dependency_count(),
            size: output.size,
            cycles: output.graph.cycles(),
            duration_ms: output.duration.as_millis() as u64,
        }
    }
}

impl Outputter for BuildReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "{} {} {} {}",
            "Built".green().bold(),
            self.entry.cyan(),
            "->".dimmed(),
            self.artifact.bold()
        ));

        let pairs = [
            ("Modules", self.modules.to_string()),
            ("Dependencies", self.dependencies.to_string()),
            ("Size", format_size(self.size)),
        ];
        lines.push(TableOutput::format_key_value(&pairs, config));

        if !self.cycles.is_empty() {
            lines.push(format!(
                "{} {} circular dependency group(s)",
                "warning:".yellow().bold(),
                self.cycles.len()
            ));
            for cycle in &self.cycles {
                lines.push(format!("  {}", cycle.join(" -> ")));
            }
        }

        lines.push(format!("{}", format!("({} ms)", self.duration_ms).dimmed()));
        lines.join("\n")
    }
}

/// Run the build command
pub async fn run(
    config: Option<&str>,
    overrides: Overrides,
    output: OutputConfig,
    quiet: bool,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let build_config = super::load_build_config(&cwd, config, overrides)?;
    let root = build_config.root.clone();

    let built = Compiler::new(build_config, builtins::transforms())
        .run()
        .await?;

    let report = BuildReport::from_output(&built, &root);
    if quiet && output.format == OutputFormat::Table {
        return Ok(());
    }
    Output::with_config(report, output).render()
}
