//! ES module syntax → CommonJS `require` form.
//!
//! Only the module-boundary statements are touched; everything else keeps its
//! original text. Default imports go through `_interopRequireDefault`, whose
//! definition is prepended to modules that need it.

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

use super::helpers::{find_child_by_type, get_node_text, has_child_of_type, named_children_without_comments};
use super::{apply_edits, Edit};

/// Helper that unwraps the default export of a required module.
pub const INTEROP_HELPER: &str = "_interopRequireDefault";

const INTEROP_DEFINITION: &str =
    "function _interopRequireDefault(obj) { return obj && obj.__esModule ? obj : { default: obj }; }\n";

const ES_MODULE_FLAG: &str = "Object.defineProperty(exports, \"__esModule\", { value: true });\n";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern"));

/// Rewrite the module syntax of a parsed program.
pub fn to_common_form(root: &Node, source: &str) -> String {
    let mut normalizer = Normalizer {
        source,
        edits: Vec::new(),
        uses_interop: false,
        has_exports: false,
    };

    // Dynamic imports first: their closing-paren insertions must land before
    // any export assignment inserted at the same offset.
    normalizer.dynamic_imports(root);

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "import_statement" => normalizer.import(&child),
            "export_statement" => normalizer.export(&child),
            _ => {}
        }
    }

    if normalizer.edits.is_empty() && !normalizer.has_exports {
        return source.to_string();
    }

    let mut prelude = String::new();
    if normalizer.has_exports {
        prelude.push_str(ES_MODULE_FLAG);
    }
    if normalizer.uses_interop {
        prelude.push_str(INTEROP_DEFINITION);
    }
    if !prelude.is_empty() {
        let offset = prelude_offset(root, source);
        let text = if offset == 0 {
            prelude
        } else {
            format!("\n{}", prelude.trim_end())
        };
        normalizer.edits.push(Edit::insert(offset, text));
    }

    apply_edits(source, normalizer.edits)
}

struct Normalizer<'s> {
    source: &'s str,
    edits: Vec<Edit>,
    uses_interop: bool,
    has_exports: bool,
}

impl<'s> Normalizer<'s> {
    fn text(&self, node: &Node) -> &'s str {
        get_node_text(node, self.source)
    }

    fn import(&mut self, node: &Node) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let require = format!("require({})", self.text(&source_node));

        let mut statements = Vec::new();
        match find_child_by_type(node, "import_clause") {
            None => statements.push(format!("{};", require)),
            Some(clause) => {
                for part in named_children_without_comments(&clause) {
                    match part.kind() {
                        "identifier" => {
                            self.uses_interop = true;
                            statements.push(format!(
                                "var {} = {}({}).default;",
                                self.text(&part),
                                INTEROP_HELPER,
                                require
                            ));
                        }
                        "namespace_import" => {
                            if let Some(id) = find_child_by_type(&part, "identifier") {
                                statements.push(format!("var {} = {};", self.text(&id), require));
                            }
                        }
                        "named_imports" => {
                            let bindings = self.import_bindings(&part);
                            if bindings.is_empty() {
                                statements.push(format!("{};", require));
                            } else {
                                statements.push(format!(
                                    "var {{ {} }} = {};",
                                    bindings.join(", "),
                                    require
                                ));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        self.edits
            .push(Edit::replace(node.byte_range(), statements.join(" ")));
    }

    /// `{ a, b as c }` → `["a", "b: c"]`
    fn import_bindings(&self, named_imports: &Node) -> Vec<String> {
        named_children_without_comments(named_imports)
            .iter()
            .filter(|spec| spec.kind() == "import_specifier")
            .filter_map(|spec| {
                let name = self.text(&spec.child_by_field_name("name")?);
                Some(match spec.child_by_field_name("alias") {
                    Some(alias) => format!("{}: {}", name, self.text(&alias)),
                    None => name.to_string(),
                })
            })
            .collect()
    }

    fn export(&mut self, node: &Node) {
        self.has_exports = true;

        if let Some(source_node) = node.child_by_field_name("source") {
            let require = format!("require({})", self.text(&source_node));
            let statement = self.re_export(node, &require);
            self.edits.push(Edit::replace(node.byte_range(), statement));
            return;
        }

        let Some(keyword) = find_child_by_type(node, "export") else {
            return;
        };
        let is_default = has_child_of_type(node, "default");

        if let Some(declaration) = node.child_by_field_name("declaration") {
            self.edits.push(Edit::replace(
                keyword.start_byte()..declaration.start_byte(),
                "",
            ));

            let bindings: Vec<(String, String)> = if is_default {
                declaration
                    .child_by_field_name("name")
                    .map(|name| ("default".to_string(), self.text(&name).to_string()))
                    .into_iter()
                    .collect()
            } else {
                self.declared_names(&declaration)
                    .into_iter()
                    .map(|name| (name.clone(), name))
                    .collect()
            };

            if !bindings.is_empty() {
                let assignments: Vec<String> = bindings
                    .iter()
                    .map(|(exported, local)| format!("exports{} = {};", member(exported), local))
                    .collect();
                self.edits.push(Edit::insert(
                    node.end_byte(),
                    format!("\n{}", assignments.join(" ")),
                ));
            }
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            self.edits.push(Edit::replace(
                keyword.start_byte()..value.start_byte(),
                "exports.default = ",
            ));
            return;
        }

        let assignments: Vec<String> = match find_child_by_type(node, "export_clause") {
            Some(clause) => self
                .export_specifiers(&clause)
                .into_iter()
                .map(|(local, exported)| format!("exports{} = {};", member(&exported), local))
                .collect(),
            None => Vec::new(),
        };
        self.edits
            .push(Edit::replace(node.byte_range(), assignments.join(" ")));
    }

    fn re_export(&self, node: &Node, require: &str) -> String {
        if let Some(clause) = find_child_by_type(node, "export_clause") {
            return self
                .export_specifiers(&clause)
                .into_iter()
                .map(|(imported, exported)| {
                    format!("exports{} = {}{};", member(&exported), require, member(&imported))
                })
                .collect::<Vec<_>>()
                .join(" ");
        }

        if let Some(namespace) = find_child_by_type(node, "namespace_export") {
            if let Some(name) = named_children_without_comments(&namespace).last() {
                return format!("exports{} = {};", member(self.text(name)), require);
            }
        }

        format!(
            "(function (m) {{ Object.keys(m).forEach(function (k) {{ if (k !== \"default\" && !Object.prototype.hasOwnProperty.call(exports, k)) exports[k] = m[k]; }}); }})({});",
            require
        )
    }

    /// `{ a, b as c }` → `[("a", "a"), ("b", "c")]`
    fn export_specifiers(&self, clause: &Node) -> Vec<(String, String)> {
        named_children_without_comments(clause)
            .iter()
            .filter(|spec| spec.kind() == "export_specifier")
            .filter_map(|spec| {
                let name = self.text(&spec.child_by_field_name("name")?).to_string();
                let alias = spec
                    .child_by_field_name("alias")
                    .map(|alias| self.text(&alias).to_string())
                    .unwrap_or_else(|| name.clone());
                Some((name, alias))
            })
            .collect()
    }

    fn declared_names(&self, declaration: &Node) -> Vec<String> {
        match declaration.kind() {
            "lexical_declaration" | "variable_declaration" => {
                let mut names = Vec::new();
                for declarator in named_children_without_comments(declaration) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    if let Some(pattern) = declarator.child_by_field_name("name") {
                        self.collect_bindings(&pattern, &mut names);
                    }
                }
                names
            }
            _ => declaration
                .child_by_field_name("name")
                .map(|name| vec![self.text(&name).to_string()])
                .unwrap_or_default(),
        }
    }

    /// Identifiers bound by a declaration pattern.
    fn collect_bindings(&self, pattern: &Node, names: &mut Vec<String>) {
        match pattern.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                names.push(self.text(pattern).to_string());
            }
            "object_pattern" | "array_pattern" | "rest_pattern" => {
                for child in named_children_without_comments(pattern) {
                    self.collect_bindings(&child, names);
                }
            }
            "pair_pattern" => {
                if let Some(value) = pattern.child_by_field_name("value") {
                    self.collect_bindings(&value, names);
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = pattern.child_by_field_name("left") {
                    self.collect_bindings(&left, names);
                }
            }
            _ => {}
        }
    }

    /// `import('x')` → `Promise.resolve().then(() => require('x'))`
    fn dynamic_imports(&mut self, node: &Node) {
        if node.kind() == "call_expression" {
            if let Some(function) = node.child_by_field_name("function") {
                if function.kind() == "import" {
                    self.edits.push(Edit::replace(
                        function.byte_range(),
                        "Promise.resolve().then(() => require",
                    ));
                    self.edits.push(Edit::insert(node.end_byte(), ")"));
                }
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.dynamic_imports(&child);
        }
    }
}

/// Property access for an export name: `.name` or `["name"]`.
fn member(name: &str) -> String {
    if IDENTIFIER.is_match(name) {
        format!(".{}", name)
    } else if name.starts_with('"') || name.starts_with('\'') {
        format!("[{}]", name)
    } else {
        format!("[{:?}]", name)
    }
}

/// Where the prelude goes: after a hashbang line and any directive prologue.
fn prelude_offset(root: &Node, source: &str) -> usize {
    let mut offset = 0;
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        let is_directive = child.kind() == "expression_statement"
            && child
                .named_child(0)
                .is_some_and(|expr| expr.kind() == "string")
            && get_node_text(&child, source).trim_end_matches(';').len() > 1;
        match child.kind() {
            "hash_bang_line" | "comment" => {}
            _ if is_directive => {}
            _ => break,
        }
        if child.kind() != "comment" {
            offset = child.end_byte();
        }
    }
    offset
}
