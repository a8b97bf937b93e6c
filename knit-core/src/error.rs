//! Error types for knit-core.
//!
//! Every variant is fatal to the build that raised it: the compiler stops,
//! runs the `failed` hook and never writes an artifact.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for knit-core operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Boxed error returned by user-supplied transforms and hook callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building a bundle.
#[derive(Error, Debug)]
pub enum BuildError {
    /// No file exists for a module key.
    #[error("cannot resolve '{specifier}' from {}: no file for module '{key}'", .importer.as_deref().unwrap_or("the project root"))]
    Resolution {
        /// Canonical key the specifier resolved to.
        key: String,
        /// Specifier as written in the importing module.
        specifier: String,
        /// Key of the importing module, `None` for the entry.
        importer: Option<String>,
    },

    /// A rule names a transform that is not registered.
    #[error("loader '{loader}' is not registered (needed by module '{key}'{origin})")]
    LoaderResolution {
        loader: String,
        key: String,
        origin: Origin,
    },

    /// A transform returned an error.
    #[error("loader '{loader}' failed on module '{key}'{origin}: {source}")]
    LoaderExecution {
        loader: String,
        key: String,
        origin: Origin,
        #[source]
        source: BoxError,
    },

    /// A load call whose argument is not a string literal.
    #[error("cannot rewrite `{call}` in module '{key}'{origin}: {reason}")]
    Rewrite {
        key: String,
        origin: Origin,
        call: String,
        reason: String,
    },

    /// A rewritten call references a key missing from the final graph.
    #[error("module '{importer}' references '{specifier}' as '{key}', which is not in the module graph")]
    UnresolvedModule {
        key: String,
        specifier: String,
        importer: String,
    },

    /// The module source could not be parsed.
    #[error("syntax error in module '{key}'{origin} at {line}:{column}: {message}")]
    Syntax {
        key: String,
        origin: Origin,
        line: usize,
        column: usize,
        message: String,
    },

    /// Reading a module or writing the artifact failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A plugin callback failed.
    #[error("plugin '{plugin}' failed during {phase}: {source}")]
    Plugin {
        plugin: String,
        phase: &'static str,
        #[source]
        source: BoxError,
    },

    /// Invalid build configuration.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

/// The load call that brought a module into the graph.
///
/// Empty until the graph walk attaches it; displays as
/// ` (loaded as './a' by './src/index.js')`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub specifier: Option<String>,
    /// Key of the importing module, `None` for the entry.
    pub importer: Option<String>,
}

impl Origin {
    pub fn new(specifier: &str, importer: Option<&str>) -> Self {
        Self {
            specifier: Some(specifier.to_string()),
            importer: importer.map(str::to_string),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.specifier, &self.importer) {
            (Some(specifier), Some(importer)) => {
                write!(f, " (loaded as '{}' by '{}')", specifier, importer)
            }
            (Some(specifier), None) => write!(f, " (entry '{}')", specifier),
            (None, _) => Ok(()),
        }
    }
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        BuildError::Config {
            message: message.into(),
        }
    }

    /// Attach the requesting specifier and importer to an error about one
    /// module.
    ///
    /// Variants that are not about a single module are returned unchanged.
    pub fn with_origin(mut self, specifier: &str, importer: Option<&str>) -> Self {
        match &mut self {
            BuildError::Resolution {
                specifier: s,
                importer: i,
                ..
            } => {
                *s = specifier.to_string();
                *i = importer.map(str::to_string);
            }
            BuildError::LoaderResolution { origin, .. }
            | BuildError::LoaderExecution { origin, .. }
            | BuildError::Rewrite { origin, .. }
            | BuildError::Syntax { origin, .. } => {
                *origin = Origin::new(specifier, importer);
            }
            _ => {}
        }
        self
    }

    /// The specifier that pulled the failing module in, when known.
    pub fn specifier(&self) -> Option<&str> {
        match self {
            BuildError::Resolution { specifier, .. }
            | BuildError::UnresolvedModule { specifier, .. } => Some(specifier),
            BuildError::LoaderResolution { origin, .. }
            | BuildError::LoaderExecution { origin, .. }
            | BuildError::Rewrite { origin, .. }
            | BuildError::Syntax { origin, .. } => origin.specifier.as_deref(),
            BuildError::Io { .. } | BuildError::Plugin { .. } | BuildError::Config { .. } => None,
        }
    }

    /// Key of the module the error is about, when there is one.
    pub fn module_key(&self) -> Option<&str> {
        match self {
            BuildError::Resolution { key, .. }
            | BuildError::LoaderResolution { key, .. }
            | BuildError::LoaderExecution { key, .. }
            | BuildError::Rewrite { key, .. }
            | BuildError::UnresolvedModule { key, .. }
            | BuildError::Syntax { key, .. } => Some(key),
            BuildError::Io { .. } | BuildError::Plugin { .. } | BuildError::Config { .. } => None,
        }
    }
}
