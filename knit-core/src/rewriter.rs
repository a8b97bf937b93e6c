//! Load-call rewriting.
//!
//! Every `require('<specifier>')` in a module becomes
//! `__knit_require__("<key>")`, where `<key>` is the canonical module key of
//! the specifier. The specifiers are collected, in source order, as the
//! module's dependencies.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{BuildError, Origin, Result};
use crate::graph::Dependency;
use crate::resolver::{key_dir, resolve_specifier};
use crate::syntax::{Argument, CallSite, Edit, ParsedSource, SourceFrontEnd, Span, SyntaxError};

/// Name of the registry accessor in emitted code.
pub const REGISTRY_ACCESSOR: &str = "__knit_require__";

/// The load primitive recognized in module sources.
pub const LOAD_PRIMITIVE: &str = "require";

pub use crate::syntax::INTEROP_HELPER;

/// Output of [`SourceRewriter::rewrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenModule {
    pub source: String,
    /// Every load call's target, in source order, duplicates kept.
    pub dependencies: Vec<Dependency>,
}

/// Rewrites the load calls of one module at a time.
pub struct SourceRewriter<'a> {
    front_end: &'a dyn SourceFrontEnd,
    root: &'a Path,
}

impl<'a> SourceRewriter<'a> {
    pub fn new(front_end: &'a dyn SourceFrontEnd, root: &'a Path) -> Self {
        Self { front_end, root }
    }

    /// Rewrite `source`, the (already transformed) content of module `key`.
    pub fn rewrite(&self, key: &str, source: &str) -> Result<RewrittenModule> {
        let normalized = self
            .front_end
            .normalize(source)
            .map_err(|e| syntax_error(key, e))?;
        let parsed = self
            .front_end
            .parse(&normalized)
            .map_err(|e| syntax_error(key, e))?;

        let importer_dir = Path::new(key_dir(key));
        let mut edits = Vec::new();
        let mut dependencies = Vec::new();
        let mut handled: HashSet<Span> = HashSet::new();

        for call in &parsed.calls {
            let Some(load) = load_call(call) else {
                continue;
            };
            if !handled.insert(load.span.clone()) {
                continue;
            }

            let dependency = self.rewrite_call(key, importer_dir, &parsed, load, &mut edits)?;
            dependencies.push(dependency);
        }

        let source = self.front_end.regenerate(&parsed, edits);
        debug!(
            module = key,
            dependencies = dependencies.len(),
            "rewrote load calls"
        );

        Ok(RewrittenModule {
            source,
            dependencies,
        })
    }

    fn rewrite_call(
        &self,
        key: &str,
        importer_dir: &Path,
        parsed: &ParsedSource,
        load: &CallSite,
        edits: &mut Vec<Edit>,
    ) -> Result<Dependency> {
        let rewrite_error = |reason: String| BuildError::Rewrite {
            key: key.to_string(),
            origin: Origin::default(),
            call: parsed.text(&load.span).to_string(),
            reason,
        };

        let specifier = match load.arguments.first() {
            Some(Argument::Literal { value, span }) => (value, span),
            Some(other) => {
                return Err(rewrite_error(format!(
                    "line {}: argument `{}` is not a string literal",
                    load.line,
                    parsed.text(other.span())
                )))
            }
            None => {
                return Err(rewrite_error(format!(
                    "line {}: missing module specifier",
                    load.line
                )))
            }
        };
        let (value, span) = specifier;

        let dep_key = resolve_specifier(importer_dir, value, self.root);

        if let Some(callee) = &load.callee {
            edits.push(Edit::replace(callee.span.clone(), REGISTRY_ACCESSOR));
        }
        edits.push(Edit::replace(
            span.clone(),
            Value::String(dep_key.clone()).to_string(),
        ));

        Ok(Dependency {
            key: dep_key,
            specifier: value.clone(),
        })
    }
}

/// The `require(...)` call targeted by `call`, if any.
///
/// `_interopRequireDefault(require(...))` yields the inner call; the outer
/// helper stays in place.
fn load_call(call: &CallSite) -> Option<&CallSite> {
    if call.callee_is(LOAD_PRIMITIVE) {
        return Some(call);
    }
    if call.callee_is(INTEROP_HELPER) {
        if let Some(Argument::Call(inner)) = call.arguments.first() {
            if inner.callee_is(LOAD_PRIMITIVE) {
                return Some(inner);
            }
        }
    }
    None
}

fn syntax_error(key: &str, error: SyntaxError) -> BuildError {
    BuildError::Syntax {
        key: key.to_string(),
        origin: Origin::default(),
        line: error.line,
        column: error.column,
        message: error.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::JavaScriptFrontEnd;
    use std::sync::Mutex;

    const ROOT: &str = "/project";

    fn rewrite(key: &str, source: &str) -> Result<RewrittenModule> {
        let front_end = JavaScriptFrontEnd::new();
        SourceRewriter::new(&front_end, Path::new(ROOT)).rewrite(key, source)
    }

    fn dep(key: &str, specifier: &str) -> Dependency {
        Dependency {
            key: key.to_string(),
            specifier: specifier.to_string(),
        }
    }

    #[test]
    fn test_relative_require() {
        let out = rewrite("./src/index.js", "const a = require('./a');\nconsole.log(a);\n").unwrap();
        assert_eq!(
            out.source,
            "const a = __knit_require__(\"./src/a.js\");\nconsole.log(a);\n"
        );
        assert_eq!(out.dependencies, vec![dep("./src/a.js", "./a")]);
    }

    #[test]
    fn test_duplicates_kept_in_order() {
        let out = rewrite(
            "./main.js",
            "require('./b'); require('./a.js'); require('./b');",
        )
        .unwrap();
        let keys: Vec<&str> = out.dependencies.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["./b.js", "./a.js", "./b.js"]);
        assert_eq!(out.source.matches(REGISTRY_ACCESSOR).count(), 3);
    }

    #[test]
    fn test_bare_specifier() {
        let out = rewrite("./src/deep/x.js", "const _ = require('lodash');").unwrap();
        assert_eq!(out.source, "const _ = __knit_require__(\"./node_modules/lodash\");");
        assert_eq!(out.dependencies, vec![dep("./node_modules/lodash", "lodash")]);
    }

    #[test]
    fn test_esm_default_import() {
        let out = rewrite("./src/index.js", "import a from './a';\na();\n").unwrap();
        assert!(out.source.contains(
            "var a = _interopRequireDefault(__knit_require__(\"./src/a.js\")).default;"
        ));
        assert!(!out.source.contains("require('"));
        assert_eq!(out.dependencies, vec![dep("./src/a.js", "./a")]);
    }

    #[test]
    fn test_esm_exports_and_reexports() {
        let out = rewrite(
            "./src/index.js",
            "export { x } from '../lib/x';\nexport const y = 1;\n",
        )
        .unwrap();
        assert!(out.source.contains("exports.x = __knit_require__(\"./lib/x.js\").x;"));
        assert!(out.source.contains("exports.y = y;"));
        assert_eq!(out.dependencies, vec![dep("./lib/x.js", "../lib/x")]);
    }

    #[test]
    fn test_dynamic_import() {
        let out = rewrite("./a.js", "import('./lazy').then(m => m.go());").unwrap();
        assert!(out
            .source
            .starts_with("Promise.resolve().then(() => __knit_require__(\"./lazy.js\"))"));
        assert_eq!(out.dependencies, vec![dep("./lazy.js", "./lazy")]);
    }

    #[test]
    fn test_other_calls_untouched() {
        let source = "foo.require('./x'); define('./y'); require.resolve('./z');";
        let out = rewrite("./a.js", source).unwrap();
        assert_eq!(out.source, source);
        assert!(out.dependencies.is_empty());
    }

    #[test]
    fn test_template_literal_specifier() {
        let out = rewrite("./a.js", "require(`./b`);").unwrap();
        assert_eq!(out.source, "__knit_require__(\"./b.js\");");
    }

    #[test]
    fn test_non_literal_argument() {
        let err = rewrite("./src/index.js", "const m = require(name);").unwrap_err();
        match err {
            BuildError::Rewrite {
                key, call, reason, ..
            } => {
                assert_eq!(key, "./src/index.js");
                assert_eq!(call, "require(name)");
                assert!(reason.contains("`name`"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = rewrite("./a.js", "require(`./${x}`);").unwrap_err();
        assert!(matches!(err, BuildError::Rewrite { .. }));
    }

    #[test]
    fn test_missing_argument() {
        let err = rewrite("./a.js", "require();").unwrap_err();
        assert!(err.to_string().contains("missing module specifier"));
    }

    #[test]
    fn test_syntax_error_carries_key() {
        let err = rewrite("./src/bad.js", "const = ;").unwrap_err();
        match err {
            BuildError::Syntax { key, line, .. } => {
                assert_eq!(key, "./src/bad.js");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_key_escaping() {
        let out = rewrite("./a.js", "require('./we\"ird');").unwrap();
        assert_eq!(out.source, "__knit_require__(\"./we\\\"ird.js\");");
        assert_eq!(out.dependencies[0].key, "./we\"ird.js");
    }

    struct RecordingFrontEnd {
        inner: JavaScriptFrontEnd,
        calls: Mutex<Vec<&'static str>>,
    }

    impl SourceFrontEnd for RecordingFrontEnd {
        fn normalize(&self, source: &str) -> std::result::Result<String, SyntaxError> {
            self.calls.lock().unwrap().push("normalize");
            self.inner.normalize(source)
        }

        fn parse(&self, source: &str) -> std::result::Result<ParsedSource, SyntaxError> {
            self.calls.lock().unwrap().push("parse");
            self.inner.parse(source)
        }

        fn regenerate(&self, parsed: &ParsedSource, edits: Vec<Edit>) -> String {
            self.calls.lock().unwrap().push("regenerate");
            self.inner.regenerate(parsed, edits)
        }
    }

    #[test]
    fn test_front_end_call_order() {
        let front_end = RecordingFrontEnd {
            inner: JavaScriptFrontEnd::new(),
            calls: Mutex::new(Vec::new()),
        };
        SourceRewriter::new(&front_end, Path::new(ROOT))
            .rewrite("./a.js", "require('./b');")
            .unwrap();
        assert_eq!(
            *front_end.calls.lock().unwrap(),
            vec!["normalize", "parse", "regenerate"]
        );
    }
}
