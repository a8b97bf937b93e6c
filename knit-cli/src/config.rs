//! Project configuration loading from `knit.toml`.
//!
//! The file maps directly onto [`BuildOptions`]. It is optional: without one,
//! every default applies. Command-line flags override file values.
//!
//! # Example Configuration
//!
//! ```toml
//! entry = "./src/main.js"
//!
//! [output]
//! path = "build"
//! fileName = "app.js"
//!
//! [[module.rules]]
//! test = "\\.json$"
//! use = "json"
//!
//! [[module.rules]]
//! test = "\\.txt$"
//! use = ["raw", "trim"]
//!
//! [[plugins]]
//! name = "manifest"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use knit_core::BuildOptions;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "knit.toml";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub entry: Option<String>,
    pub out_dir: Option<String>,
    pub out_file: Option<String>,
}

/// Options for one invocation, plus the directory relative paths in them
/// are resolved against.
#[derive(Debug)]
pub struct ProjectConfig {
    pub options: BuildOptions,
    pub base_dir: PathBuf,
    /// The file the options came from, if any.
    pub source: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load configuration for a run started in `cwd`.
    ///
    /// An explicit `config` path must exist. Otherwise `cwd/knit.toml` is
    /// used when present. Relative paths in the file are anchored at the
    /// file's directory.
    pub fn load(cwd: &Path, config: Option<&str>) -> Result<Self> {
        let path = match config {
            Some(path) => {
                let path = cwd.join(path);
                if !path.is_file() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path)
            }
            None => Some(cwd.join(CONFIG_FILE)).filter(|p| p.is_file()),
        };

        let Some(path) = path else {
            tracing::debug!("no {} found, using defaults", CONFIG_FILE);
            return Ok(Self {
                options: BuildOptions::default(),
                base_dir: cwd.to_path_buf(),
                source: None,
            });
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let options = parse_options(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            options,
            base_dir,
            source: Some(path),
        })
    }

    /// Apply command-line values over the file's.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(entry) = overrides.entry {
            self.options.entry = Some(entry);
        }
        if let Some(dir) = overrides.out_dir {
            self.options.output.path = Some(PathBuf::from(dir));
        }
        if let Some(file) = overrides.out_file {
            self.options.output.file_name = Some(file);
        }
        self
    }
}

/// Parse `knit.toml` content.
pub fn parse_options(content: &str) -> Result<BuildOptions> {
    Ok(toml::from_str(content)?)
}
