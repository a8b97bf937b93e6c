//! Helper functions for tree-sitter AST navigation.

use tree_sitter::Node;

/// Get the text content of a node.
pub fn get_node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    let start = node.start_byte();
    let end = node.end_byte();
    if start < source.len() && end <= source.len() && start < end {
        &source[start..end]
    } else {
        ""
    }
}

/// Find the first child of a specific type.
#[allow(clippy::manual_find)]
pub fn find_child_by_type<'a>(node: &Node<'a>, type_name: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == type_name {
            return Some(child);
        }
    }
    None
}

/// Check if a node has a child of a specific type.
pub fn has_child_of_type(node: &Node, type_name: &str) -> bool {
    find_child_by_type(node, type_name).is_some()
}

/// Named children, skipping comments.
pub fn named_children_without_comments<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Get line number (1-indexed) from a node.
pub fn get_start_line(node: &Node) -> usize {
    node.start_position().row + 1
}

/// Find the first error or missing node in a subtree, depth-first.
pub fn find_first_error<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_first_error(&child) {
            return Some(found);
        }
    }
    None
}

/// Decode a JavaScript `string` or escape-free `template_string` node.
///
/// Returns `None` for template literals with substitutions.
pub fn decode_string_literal(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" => {}
        "template_string" if !has_child_of_type(node, "template_substitution") => {}
        _ => return None,
    }

    let text = get_node_text(node, source);
    let inner = text
        .get(1..text.len().saturating_sub(1))
        .unwrap_or_default();
    Some(unescape(inner))
}

/// Resolve the escape sequences that can appear in a module specifier.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let code: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                if let Some(decoded) = u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    out.push(decoded);
                }
            }
            Some('x') => {
                let code: String = chars.by_ref().take(2).collect();
                if let Some(decoded) = u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    out.push(decoded);
                }
            }
            // Line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
