//! Graph command - resolve the module graph without writing anything
//!
//! Lists every module in discovery order with its dependencies and content
//! hash, followed by any circular dependency groups. Plugins are
//! instantiated but no lifecycle hooks run.

use crate::builtins;
use crate::config::Overrides;
use crate::output::{Output, OutputConfig, Outputter, TableOutput};
use anyhow::Result;
use colored::Colorize;
use knit_core::{Compiler, ModuleGraph};
use serde::Serialize;
use std::path::Path;

/// One row of the graph listing.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleEntry {
    pub key: String,
    pub path: String,
    pub hash: String,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    pub entry: Option<String>,
    pub modules: Vec<ModuleEntry>,
    pub cycles: Vec<Vec<String>>,
}

impl GraphReport {
    pub fn from_graph(graph: &ModuleGraph, root: &Path) -> Self {
        let modules = graph
            .modules()
            .map(|record| ModuleEntry {
                key: record.key.clone(),
                path: record
                    .path
                    .strip_prefix(root)
                    .unwrap_or(&record.path)
                    .display()
                    .to_string(),
                hash: record.hash.clone(),
                dependencies: record.dependencies.iter().map(|d| d.key.clone()).collect(),
            })
            .collect();

        Self {
            entry: graph.entry().map(str::to_string),
            modules,
            cycles: graph.cycles(),
        }
    }
}

impl Outputter for GraphReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "{} {} ({} modules)",
            "Module graph".green().bold(),
            self.entry.as_deref().unwrap_or("-").cyan(),
            self.modules.len()
        ));

        let rows: Vec<Vec<String>> = self
            .modules
            .iter()
            .map(|m| {
                let deps = if m.dependencies.is_empty() {
                    "-".to_string()
                } else {
                    m.dependencies.join(", ")
                };
                vec![m.key.clone(), deps, m.hash.clone()]
            })
            .collect();
        lines.push(TableOutput::from_rows(
            &["Module", "Dependencies", "Hash"],
            &rows,
            &[2],
            13,
            config,
        ));

        for cycle in &self.cycles {
            lines.push(format!("{} {}", "cycle:".yellow().bold(), cycle.join(" -> ")));
        }
        lines.join("\n")
    }
}

/// Run the graph command
pub async fn run(config: Option<&str>, overrides: Overrides, output: OutputConfig) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let build_config = super::load_build_config(&cwd, config, overrides)?;
    let root = build_config.root.clone();

    let graph = Compiler::new(build_config, builtins::transforms())
        .compile()
        .await?;

    Output::with_config(GraphReport::from_graph(&graph, &root), output).render()
}
