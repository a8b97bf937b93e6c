//! knit CLI - command-line interface for the knit JavaScript bundler
//!
//! Bundles an entry module and everything it requires into a single
//! self-bootstrapping script.

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod builtins;
mod commands;
mod config;
mod output;

use commands::{build, graph};
use config::Overrides;
use output::{OutputConfig, OutputFormat};

/// Bundle JavaScript modules into one file.
///
/// knit starts at an entry module, follows every `require` and `import`,
/// runs each module through the configured loaders and writes one script
/// that contains the whole module graph.
#[derive(Parser)]
#[command(name = "knit")]
#[command(author, version)]
#[command(about = "Bundle JavaScript modules into one file")]
#[command(propagate_version = true)]
#[command(next_help_heading = "Options")]
#[command(after_help = "Examples:
  knit build                      Build using ./knit.toml (or defaults)
  knit build --entry ./app.js     Override the entry module
  knit graph --format json        Print the module graph as JSON")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Compact output (single-line JSON, borderless tables)
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the bundle
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output directory (relative to the project root)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<String>,

        /// Output file name
        #[arg(long, value_name = "NAME")]
        out_file: Option<String>,
    },

    /// Resolve the module graph without writing anything
    #[command(visible_alias = "g")]
    Graph {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

#[derive(clap::Args)]
struct ProjectArgs {
    /// Config file (default: ./knit.toml when present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Entry module, relative to the project root
    #[arg(short, long, value_name = "PATH")]
    entry: Option<String>,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    let mut output = OutputConfig::auto_detect(cli.format);
    if cli.compact {
        output = output.compact();
    }

    match command {
        Commands::Build {
            project,
            out_dir,
            out_file,
        } => {
            let overrides = Overrides {
                entry: project.entry,
                out_dir,
                out_file,
            };
            build::run(project.config.as_deref(), overrides, output, cli.quiet).await
        }
        Commands::Graph { project } => {
            let overrides = Overrides {
                entry: project.entry,
                ..Default::default()
            };
            graph::run(project.config.as_deref(), overrides, output).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_flags() {
        let cli = Cli::try_parse_from([
            "knit",
            "build",
            "--entry",
            "./app.js",
            "--out-dir",
            "out",
            "--out-file",
            "app.bundle.js",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Some(Commands::Build {
                project,
                out_dir,
                out_file,
            }) => {
                assert_eq!(project.entry.as_deref(), Some("./app.js"));
                assert!(project.config.is_none());
                assert_eq!(out_dir.as_deref(), Some("out"));
                assert_eq!(out_file.as_deref(), Some("app.bundle.js"));
            }
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn test_compact_is_global() {
        let cli = Cli::try_parse_from(["knit", "graph", "--compact"]).unwrap();
        assert!(cli.compact);
        assert!(!Cli::try_parse_from(["knit", "graph"]).unwrap().compact);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["knit", "-v", "-q", "graph"]).is_err());
    }
}
