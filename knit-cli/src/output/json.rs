//! JSON output for machine consumption.

use super::OutputConfig;
use serde::Serialize;

pub struct JsonOutput;

impl JsonOutput {
    /// Pretty-printed JSON, or a single line when `config.compact` is set.
    pub fn format<T: Serialize + ?Sized>(data: &T, config: &OutputConfig) -> String {
        let result = if config.compact {
            serde_json::to_string(data)
        } else {
            serde_json::to_string_pretty(data)
        };
        result.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::super::OutputFormat;
    use super::*;

    #[derive(Serialize)]
    struct Summary {
        entry: String,
        modules: usize,
    }

    fn summary() -> Summary {
        Summary {
            entry: "./src/index.js".to_string(),
            modules: 3,
        }
    }

    #[test]
    fn test_format_pretty() {
        let output = JsonOutput::format(&summary(), &OutputConfig::new(OutputFormat::Json));
        assert!(output.contains("\"entry\": \"./src/index.js\""));
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact() {
        let config = OutputConfig::new(OutputFormat::Json).compact();
        let output = JsonOutput::format(&summary(), &config);
        assert_eq!(output, r#"{"entry":"./src/index.js","modules":3}"#);
    }
}
