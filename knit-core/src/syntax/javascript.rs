//! JavaScript front end using tree-sitter.

use tree_sitter::{Node, Parser, Tree};

use super::helpers::{
    decode_string_literal, find_first_error, get_node_text, get_start_line,
    named_children_without_comments,
};
use super::normalize;
use super::{Argument, CallSite, Identifier, ParsedSource, SourceFrontEnd, SyntaxError};

/// Tree-sitter backed [`SourceFrontEnd`] for JavaScript.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptFrontEnd;

impl JavaScriptFrontEnd {
    pub fn new() -> Self {
        Self
    }
}

impl SourceFrontEnd for JavaScriptFrontEnd {
    fn normalize(&self, source: &str) -> Result<String, SyntaxError> {
        let tree = parse_tree(source)?;
        Ok(normalize::to_common_form(&tree.root_node(), source))
    }

    fn parse(&self, source: &str) -> Result<ParsedSource, SyntaxError> {
        let tree = parse_tree(source)?;
        let mut calls = Vec::new();
        find_calls_recursive(&tree.root_node(), source, &mut calls);
        Ok(ParsedSource {
            source: source.to_string(),
            calls,
        })
    }
}

/// Parse JavaScript source, rejecting trees that contain errors.
pub(crate) fn parse_tree(source: &str) -> Result<Tree, SyntaxError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .map_err(|e| SyntaxError {
            line: 1,
            column: 1,
            message: format!("Failed to set language: {}", e),
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| SyntaxError {
        line: 1,
        column: 1,
        message: "Failed to parse source".to_string(),
    })?;

    if let Some(error) = find_first_error(&tree.root_node()) {
        let position = error.start_position();
        let message = if error.is_missing() {
            format!("missing `{}`", error.kind())
        } else {
            let snippet: String = get_node_text(&error, source).chars().take(40).collect();
            format!("unexpected `{}`", snippet)
        };
        return Err(SyntaxError {
            line: position.row + 1,
            column: position.column + 1,
            message,
        });
    }

    Ok(tree)
}

/// Recursively collect call expressions, outer calls before inner ones.
fn find_calls_recursive(node: &Node, source: &str, results: &mut Vec<CallSite>) {
    if node.kind() == "call_expression" {
        results.push(extract_call(node, source));
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        find_calls_recursive(&child, source, results);
    }
}

/// Convert a `call_expression` node to a [`CallSite`].
fn extract_call(node: &Node, source: &str) -> CallSite {
    let callee = node
        .child_by_field_name("function")
        .filter(|f| f.kind() == "identifier")
        .map(|f| Identifier {
            name: get_node_text(&f, source).to_string(),
            span: f.byte_range(),
        });

    let arguments = match node.child_by_field_name("arguments") {
        Some(args) if args.kind() == "arguments" => named_children_without_comments(&args)
            .iter()
            .map(|arg| extract_argument(arg, source))
            .collect(),
        // Tagged template: require`./a`
        Some(other) => vec![Argument::Other {
            text: get_node_text(&other, source).to_string(),
            span: other.byte_range(),
        }],
        None => Vec::new(),
    };

    CallSite {
        span: node.byte_range(),
        callee,
        arguments,
        line: get_start_line(node),
    }
}

fn extract_argument(node: &Node, source: &str) -> Argument {
    if node.kind() == "call_expression" {
        return Argument::Call(extract_call(node, source));
    }
    match decode_string_literal(node, source) {
        Some(value) => Argument::Literal {
            value,
            span: node.byte_range(),
        },
        None => Argument::Other {
            text: get_node_text(node, source).to_string(),
            span: node.byte_range(),
        },
    }
}
