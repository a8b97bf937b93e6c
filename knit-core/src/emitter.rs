//! Artifact rendering.
//!
//! The artifact is a single script: an IIFE receiving the module registry
//! (key → module function), defining the memoizing `__knit_require__`, and
//! requiring the entry key.

use std::fmt::Write;

use serde_json::Value;

use crate::error::{BuildError, Result};
use crate::graph::ModuleGraph;
use crate::rewriter::REGISTRY_ACCESSOR;

const RUNTIME_HEAD: &str = "(function (modules) {
  var cache = {};
  function __knit_require__(key) {
    var cached = cache[key];
    if (cached !== undefined) {
      return cached.exports;
    }
    if (!Object.prototype.hasOwnProperty.call(modules, key)) {
      throw new Error(\"Cannot find module '\" + key + \"'\");
    }
    var module = (cache[key] = { exports: {} });
    modules[key].call(module.exports, module, module.exports, __knit_require__);
    return module.exports;
  }
";

/// Render a verified graph into the artifact text.
pub fn render(graph: &ModuleGraph) -> Result<String> {
    graph.verify()?;
    let entry = graph
        .entry()
        .ok_or_else(|| BuildError::config("module graph has no entry module"))?;

    let body_len: usize = graph.modules().map(|m| m.source.len() + m.key.len() + 96).sum();
    let mut out = String::with_capacity(RUNTIME_HEAD.len() + body_len + 64);

    out.push_str(RUNTIME_HEAD);
    // Writing to a String cannot fail.
    let _ = writeln!(out, "  return {}({});", REGISTRY_ACCESSOR, js_string(entry));
    out.push_str("})({\n");

    for (i, module) in graph.modules().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        let _ = writeln!(
            out,
            "{}: function (module, exports, {}) {{",
            js_string(&module.key),
            REGISTRY_ACCESSOR
        );
        out.push_str(&module.source);
        if !module.source.ends_with('\n') {
            out.push('\n');
        }
        out.push('}');
    }

    out.push_str("\n});\n");
    Ok(out)
}

fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
