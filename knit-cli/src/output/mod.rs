//! Output formatting for knit commands.
//!
//! Every report renders as a human-readable table (default) or as JSON.
//! Colors and truncation are turned off when stdout is not a TTY.

use clap::ValueEnum;
use serde::Serialize;
use std::io::IsTerminal;

mod json;
mod table;

pub use self::json::JsonOutput;
pub use self::table::TableOutput;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    #[default]
    Table,
    /// JSON for scripts and CI
    Json,
}

/// Rendering settings for one invocation
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Disable colored output
    pub no_color: bool,
    /// Disable truncation of long values
    pub no_truncate: bool,
    /// Override terminal width (None = auto-detect)
    pub width: Option<usize>,
    /// Compact mode (single-line JSON, borderless tables)
    pub compact: bool,
}

impl OutputConfig {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            no_color: false,
            no_truncate: false,
            width: None,
            compact: false,
        }
    }

    /// Settings for the current stdout: piped output gets no colors and no
    /// truncation.
    pub fn auto_detect(format: OutputFormat) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        Self {
            format,
            no_color: !is_tty,
            no_truncate: !is_tty,
            width: None,
            compact: false,
        }
    }

    /// Get the effective terminal width
    pub fn effective_width(&self) -> usize {
        self.width.unwrap_or_else(|| {
            terminal_size::terminal_size()
                .map(|(w, _)| w.0 as usize)
                .unwrap_or(80)
        })
    }

    pub fn use_colors(&self) -> bool {
        !self.no_color
    }

    pub fn should_truncate(&self) -> bool {
        !self.no_truncate
    }

    pub fn without_colors(mut self) -> Self {
        self.no_color = true;
        self
    }

    pub fn without_truncation(mut self) -> Self {
        self.no_truncate = true;
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn compact(mut self) -> Self {
        self.compact = true;
        self
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::auto_detect(OutputFormat::Table)
    }
}

/// Types that can be rendered in every [`OutputFormat`].
pub trait Outputter: Serialize + Sized {
    fn to_table(&self, config: &OutputConfig) -> String;

    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(self, config)
    }

    /// Render using the format specified in config
    fn render(&self, config: &OutputConfig) -> String {
        match config.format {
            OutputFormat::Table => self.to_table(config),
            OutputFormat::Json => self.to_json(config),
        }
    }
}

/// A report paired with the settings it is rendered with.
pub struct Output<T> {
    data: T,
    config: OutputConfig,
}

impl<T: Outputter> Output<T> {
    pub fn with_config(data: T, config: OutputConfig) -> Self {
        Self { data, config }
    }

    /// Print to stdout
    pub fn render(&self) -> anyhow::Result<()> {
        if !self.config.use_colors() {
            colored::control::set_override(false);
        }
        println!("{}", self.render_to_string());
        Ok(())
    }

    pub fn render_to_string(&self) -> String {
        self.data.render(&self.config)
    }
}

/// Truncate a string to a maximum width with ellipsis
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let truncated: String = s.chars().take(max_width - 3).collect();
        format!("{}...", truncated)
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{} B", bytes)
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}
