//! Source front end: the boundary between the rewriter and a concrete parser.
//!
//! The rewriter never touches a syntax tree directly. A [`SourceFrontEnd`]
//! normalizes module syntax to the call-based load form, reports every call
//! expression as a neutral [`CallSite`], and regenerates text from a list of
//! span [`Edit`]s. [`JavaScriptFrontEnd`] is the tree-sitter implementation.

use std::fmt;
use std::ops::Range;

mod helpers;
mod javascript;
mod normalize;

pub use javascript::JavaScriptFrontEnd;
pub use normalize::INTEROP_HELPER;

/// Byte range in the parsed source.
pub type Span = Range<usize>;

/// A parse failure, located in the text handed to the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// A plain identifier and where it sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// One argument of a call expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// A string literal (or a template literal without substitutions),
    /// with its decoded value.
    Literal { value: String, span: Span },
    /// A nested call expression.
    Call(CallSite),
    /// Anything else.
    Other { text: String, span: Span },
}

impl Argument {
    pub fn span(&self) -> &Span {
        match self {
            Argument::Literal { span, .. } | Argument::Other { span, .. } => span,
            Argument::Call(call) => &call.span,
        }
    }
}

/// A call expression as seen by the rewriter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Span of the whole call expression.
    pub span: Span,
    /// The callee when it is a bare identifier (`require(...)`), `None` for
    /// member calls, IIFEs and the like.
    pub callee: Option<Identifier>,
    pub arguments: Vec<Argument>,
    /// 1-indexed line of the call.
    pub line: usize,
}

impl CallSite {
    pub fn callee_is(&self, name: &str) -> bool {
        self.callee.as_ref().is_some_and(|c| c.name == name)
    }
}

/// Source text plus every call expression in it, in source order.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub source: String,
    pub calls: Vec<CallSite>,
}

impl ParsedSource {
    pub fn text(&self, span: &Span) -> &str {
        self.source.get(span.clone()).unwrap_or("")
    }
}

/// Replace `span` with `replacement`. An empty span is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at..at, text)
    }
}

/// Parse / visit / regenerate capability used by the rewriter.
pub trait SourceFrontEnd: Send + Sync {
    /// Rewrite module syntax (`import` / `export`) to the call-based form.
    fn normalize(&self, source: &str) -> Result<String, SyntaxError>;

    /// Parse `source` and report its call expressions.
    fn parse(&self, source: &str) -> Result<ParsedSource, SyntaxError>;

    /// Produce new source text with `edits` applied.
    fn regenerate(&self, parsed: &ParsedSource, edits: Vec<Edit>) -> String {
        apply_edits(&parsed.source, edits)
    }
}

/// Apply non-overlapping span edits to `source`.
///
/// Edits may come in any order; insertions at the same offset keep their
/// relative order.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.span.start, e.span.end));

    let mut out = String::with_capacity(source.len() + edits.len() * 16);
    let mut cursor = 0;
    for edit in edits {
        debug_assert!(edit.span.start >= cursor, "overlapping edits");
        if edit.span.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..edit.span.start]);
        out.push_str(&edit.replacement);
        cursor = edit.span.end;
    }
    out.push_str(&source[cursor..]);
    out
}
