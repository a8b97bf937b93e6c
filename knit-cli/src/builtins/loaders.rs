use knit_core::{BoxError, LoaderContext, Transform, TransformRegistry};
use serde_json::Value;

/// Registry with every built-in loader.
pub fn transforms() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry
        .register_fn("raw", raw)
        .register_fn("json", json)
        .register("trim", TrimLoader);
    registry
}

/// Export the content as a string.
fn raw(source: &str) -> Result<String, BoxError> {
    Ok(format!(
        "module.exports = {};",
        Value::String(source.to_string())
    ))
}

/// Export the content as parsed JSON.
fn json(source: &str) -> Result<String, BoxError> {
    let value: Value = serde_json::from_str(source)?;
    Ok(format!("module.exports = {};", value))
}

/// Strip surrounding whitespace. `options.mode` picks `start`, `end` or
/// `both` (the default).
struct TrimLoader;

impl Transform for TrimLoader {
    fn transform(&self, source: &str, cx: &LoaderContext<'_>) -> Result<String, BoxError> {
        let trimmed = match cx.options.get("mode").and_then(Value::as_str) {
            None | Some("both") => source.trim(),
            Some("start") => source.trim_start(),
            Some("end") => source.trim_end(),
            Some(other) => return Err(format!("unknown trim mode '{}'", other).into()),
        };
        Ok(trimmed.to_string())
    }
}
