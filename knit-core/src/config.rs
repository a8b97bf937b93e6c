//! Build configuration.
//!
//! [`BuildOptions`] is the user-facing, fully optional shape (what a config
//! file deserializes into). [`BuildConfig::from_options`] fills in defaults,
//! compiles loader patterns and instantiates plugins, producing the
//! read-only configuration a compiler run works from.
//!
//! # Example
//!
//! ```toml
//! entry = "./src/main.js"
//!
//! [output]
//! path = "build"
//! fileName = "app.js"
//!
//! [[module.rules]]
//! test = "\\.txt$"
//! use = ["trim", { loader = "raw" }]
//!
//! [[plugins]]
//! name = "manifest"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BuildError, Result};
use crate::plugin::{Plugin, PluginRegistry};

/// Entry module used when none is configured.
pub const DEFAULT_ENTRY: &str = "./src/index.js";

/// Output directory (relative to the project root) used when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Artifact file name used when none is configured.
pub const DEFAULT_OUTPUT_FILE: &str = "bundle.js";

/// Raw build options, every field optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Project root; defaults to the working directory.
    pub root: Option<PathBuf>,

    /// Entry module specifier, resolved against the root.
    pub entry: Option<String>,

    /// Where the artifact is written.
    pub output: OutputOptions,

    /// Loader rules.
    pub module: ModuleOptions,

    /// Plugins, by registered name.
    pub plugins: Vec<PluginSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputOptions {
    pub path: Option<PathBuf>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ModuleOptions {
    pub rules: Vec<RuleOptions>,
}

/// A loader rule before its pattern is compiled.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleOptions {
    /// Regular expression matched against the module's file path. A
    /// JavaScript-style `/.../` wrapper is accepted and stripped.
    pub test: String,

    #[serde(rename = "use")]
    pub uses: UseSpec,
}

/// The `use` part of a loader rule.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UseSpec {
    /// Several loaders, applied last to first.
    Chain(Vec<LoaderEntry>),
    /// A single loader.
    Single(LoaderEntry),
}

/// One loader reference inside a rule.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LoaderEntry {
    Name(String),
    WithOptions {
        loader: String,
        #[serde(default)]
        options: Value,
    },
}

impl LoaderEntry {
    pub fn name(&self) -> &str {
        match self {
            LoaderEntry::Name(name) => name,
            LoaderEntry::WithOptions { loader, .. } => loader,
        }
    }

    pub fn options(&self) -> &Value {
        static NO_OPTIONS: Value = Value::Null;
        match self {
            LoaderEntry::Name(_) => &NO_OPTIONS,
            LoaderEntry::WithOptions { options, .. } => options,
        }
    }
}

impl UseSpec {
    /// Loader entries in the order they are applied to the content.
    ///
    /// Chains run right-to-left: the last entry sees the raw content first.
    pub fn application_order(&self) -> Vec<&LoaderEntry> {
        match self {
            UseSpec::Single(entry) => vec![entry],
            UseSpec::Chain(entries) => entries.iter().rev().collect(),
        }
    }
}

/// A plugin reference: a registered name, optionally with options.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PluginSpec {
    Name(String),
    Configured {
        name: String,
        #[serde(default)]
        options: Value,
    },
}

impl PluginSpec {
    pub fn name(&self) -> &str {
        match self {
            PluginSpec::Name(name) => name,
            PluginSpec::Configured { name, .. } => name,
        }
    }

    pub fn options(&self) -> &Value {
        static NO_OPTIONS: Value = Value::Null;
        match self {
            PluginSpec::Name(_) => &NO_OPTIONS,
            PluginSpec::Configured { options, .. } => options,
        }
    }
}

/// A loader rule with its pattern compiled.
#[derive(Debug, Clone)]
pub struct LoaderRule {
    pub test: Regex,
    pub uses: UseSpec,
}

impl LoaderRule {
    pub fn new(pattern: &str, uses: UseSpec) -> Result<Self> {
        let source = regex_source(pattern);
        let test = Regex::new(&source)
            .map_err(|e| BuildError::config(format!("invalid loader test '{}': {}", pattern, e)))?;
        Ok(Self { test, uses })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.test.is_match(&path.to_string_lossy())
    }
}

/// Accept both plain patterns and JavaScript literals such as `/\.css$/i`.
///
/// A pattern is a literal when it starts with `/` and everything after its
/// last `/` is a JavaScript flag. Flags `i`, `m` and `s` become inline
/// flags; the rest do not change whether a path matches and are dropped.
fn regex_source(pattern: &str) -> String {
    const JS_FLAGS: &str = "dgimsuvy";

    let Some((source, flags)) = pattern
        .strip_prefix('/')
        .and_then(|body| body.rsplit_once('/'))
    else {
        return pattern.to_string();
    };
    if !flags.chars().all(|c| JS_FLAGS.contains(c)) {
        return pattern.to_string();
    }

    let inline: String = flags.chars().filter(|c| "ims".contains(*c)).collect();
    if inline.is_empty() {
        source.to_string()
    } else {
        format!("(?{}){}", inline, source)
    }
}

/// Resolved, read-only configuration for one compiler run.
#[derive(Clone)]
pub struct BuildConfig {
    pub root: PathBuf,
    pub entry: String,
    pub output_path: PathBuf,
    pub output_file_name: String,
    pub rules: Vec<LoaderRule>,
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl BuildConfig {
    /// Configuration with every default applied, rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            output_path: root.join(DEFAULT_OUTPUT_DIR),
            root,
            entry: DEFAULT_ENTRY.to_string(),
            output_file_name: DEFAULT_OUTPUT_FILE.to_string(),
            rules: Vec::new(),
            plugins: Vec::new(),
        }
    }

    /// Build the configuration from raw options.
    ///
    /// `cwd` is the root when the options name none; relative roots and
    /// output paths are resolved against it and the root respectively.
    pub fn from_options(options: BuildOptions, cwd: &Path, plugins: &PluginRegistry) -> Result<Self> {
        let root = match options.root {
            Some(root) if root.is_absolute() => root,
            Some(root) => cwd.join(root),
            None => cwd.to_path_buf(),
        };

        let mut config = Self::new(root);

        if let Some(entry) = options.entry {
            config.entry = entry;
        }
        if let Some(path) = options.output.path {
            config.output_path = config.root.join(path);
        }
        if let Some(file_name) = options.output.file_name {
            if file_name.is_empty() {
                return Err(BuildError::config("output.fileName must not be empty"));
            }
            config.output_file_name = file_name;
        }

        for rule in options.module.rules {
            config.rules.push(LoaderRule::new(&rule.test, rule.uses)?);
        }

        for spec in &options.plugins {
            config.plugins.push(plugins.instantiate(spec)?);
        }

        Ok(config)
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        self.output_path = path.into();
        self.output_file_name = file_name.into();
        self
    }

    pub fn with_rule(mut self, rule: LoaderRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Full path of the artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.output_path.join(&self.output_file_name)
    }
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("root", &self.root)
            .field("entry", &self.entry)
            .field("output_path", &self.output_path)
            .field("output_file_name", &self.output_file_name)
            .field("rules", &self.rules)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config =
            BuildConfig::from_options(BuildOptions::default(), Path::new("/work"), &PluginRegistry::new())
                .unwrap();
        assert_eq!(config.root, PathBuf::from("/work"));
        assert_eq!(config.entry, "./src/index.js");
        assert_eq!(config.output_path, PathBuf::from("/work/dist"));
        assert_eq!(config.output_file_name, "bundle.js");
        assert_eq!(config.artifact_path(), PathBuf::from("/work/dist/bundle.js"));
        assert!(config.rules.is_empty());
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn test_parse_full_options() {
        let options: BuildOptions = serde_json::from_value(json!({
            "root": "app",
            "entry": "./main.js",
            "output": { "path": "build", "fileName": "app.js" },
            "module": {
                "rules": [
                    { "test": "/\\.txt$/", "use": "raw" },
                    { "test": "\\.json$", "use": { "loader": "json", "options": { "space": 2 } } },
                    { "test": "\\.md$", "use": ["a", { "loader": "b" }] }
                ]
            }
        }))
        .unwrap();

        let config =
            BuildConfig::from_options(options, Path::new("/work"), &PluginRegistry::new()).unwrap();
        assert_eq!(config.root, PathBuf::from("/work/app"));
        assert_eq!(config.entry, "./main.js");
        assert_eq!(config.artifact_path(), PathBuf::from("/work/app/build/app.js"));
        assert_eq!(config.rules.len(), 3);

        assert!(config.rules[0].matches(Path::new("/work/app/notes.txt")));
        assert!(!config.rules[0].matches(Path::new("/work/app/notes.js")));
        assert_eq!(
            config.rules[1].uses,
            UseSpec::Single(LoaderEntry::WithOptions {
                loader: "json".to_string(),
                options: json!({ "space": 2 }),
            })
        );

        let order: Vec<&str> = config.rules[2]
            .uses
            .application_order()
            .into_iter()
            .map(LoaderEntry::name)
            .collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_js_literal_patterns() {
        let rule = |pattern: &str| {
            LoaderRule::new(pattern, UseSpec::Single(LoaderEntry::Name("x".into()))).unwrap()
        };

        assert!(rule(r"/\.js$/").matches(Path::new("/p/a.js")));
        assert!(rule(r"/\.js$/i").matches(Path::new("/p/A.JS")));
        assert!(rule(r"/\.js$/gu").matches(Path::new("/p/a.js")));
        assert!(!rule(r"/\.js$/").matches(Path::new("/p/A.JS")));
        assert!(rule(r"\.JS$").matches(Path::new("/p/a.JS")));

        // A leading slash alone does not make a literal.
        assert!(rule(r"/src/.*\.js$").matches(Path::new("/src/a.js")));
        assert!(!rule(r"/src/lib").matches(Path::new("/p/a.js")));
        assert_eq!(regex_source("/src/lib"), "/src/lib");
        assert_eq!(regex_source(r"/\.txt$/mi"), r"(?mi)\.txt$");
    }

    #[test]
    fn test_invalid_pattern() {
        let err = LoaderRule::new("(", UseSpec::Single(LoaderEntry::Name("x".into()))).unwrap_err();
        assert!(matches!(err, BuildError::Config { .. }));
    }

    #[test]
    fn test_unknown_plugin() {
        let options = BuildOptions {
            plugins: vec![PluginSpec::Name("nope".into())],
            ..Default::default()
        };
        let err = BuildConfig::from_options(options, Path::new("/work"), &PluginRegistry::new())
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_loader_entry_options() {
        let entry = LoaderEntry::Name("raw".into());
        assert!(entry.options().is_null());
        assert_eq!(entry.name(), "raw");
    }
}
