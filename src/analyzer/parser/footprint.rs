//! Grammar-agnostic footprint extraction
//!
//! Rather than per-language queries, the traversal classifies every named node
//! by its kind string. This works across grammars because they share naming
//! habits (`class_declaration`, `function_item`, `import_statement`, ...).

use std::path::Path;

use tracing::debug;
use tree_sitter::Node;

use super::language::Language;
use super::traits::{StructuralExtractor, create_ts_parser, get_node_text};
use crate::types::StructuralFootprint;

/// Footprint extractor backed by the bundled tree-sitter grammars
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterExtractor;

impl TreeSitterExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parse `content` as `language` and collect its footprint.
    pub fn extract_source(
        &self,
        language: Language,
        relative: &str,
        content: &str,
    ) -> Option<StructuralFootprint> {
        let mut parser = match create_ts_parser(language.grammar(), language.display_name()) {
            Ok(parser) => parser,
            Err(e) => {
                debug!("{}: {}", relative, e);
                return None;
            }
        };

        let tree = parser.parse(content, None)?;
        let mut footprint = StructuralFootprint::new(relative);
        collect_footprint(tree.root_node(), content.as_bytes(), &mut footprint);
        Some(footprint)
    }
}

impl StructuralExtractor for TreeSitterExtractor {
    fn extract(&self, path: &Path, relative: &str) -> Option<StructuralFootprint> {
        let language = Language::from_path(path)?;
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                return None;
            }
        };
        self.extract_source(language, relative, &content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeRole {
    class: bool,
    function: bool,
    export: bool,
    import: bool,
}

impl NodeRole {
    fn of(kind: &str) -> Self {
        let kind = kind.to_ascii_lowercase();
        Self {
            class: kind.contains("class") || kind.contains("struct") || kind.contains("interface"),
            function: kind.contains("function")
                || kind.contains("method")
                || kind.contains("def_")
                || kind == "func_literal",
            export: kind.contains("export"),
            import: kind.contains("import") || kind.contains("use_") || kind.contains("include"),
        }
    }
}

/// Walk every named node under `root`, adding names to `footprint`.
pub fn collect_footprint(root: Node<'_>, source: &[u8], footprint: &mut StructuralFootprint) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visit(node, source, footprint);
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
}

fn visit(node: Node<'_>, source: &[u8], footprint: &mut StructuralFootprint) {
    let role = NodeRole::of(node.kind());

    if role.class
        && let Some(name) = declared_name(node)
    {
        insert(&mut footprint.classes, get_node_text(name, source));
    }

    if role.function
        && let Some(name) = declared_name(node)
    {
        let text = get_node_text(name, source);
        if !text.starts_with("__") {
            insert(&mut footprint.functions, text);
        }
    }

    if role.export {
        let exported = node
            .child_by_field_name("declaration")
            .and_then(|decl| decl.child_by_field_name("name"))
            .or_else(|| first_child(node, |kind| kind == "identifier"));
        if let Some(name) = exported {
            insert(&mut footprint.exports, get_node_text(name, source));
        }
    }

    if role.import {
        let imported = ["source", "module_name", "argument"]
            .into_iter()
            .find_map(|field| node.child_by_field_name(field))
            .or_else(|| first_child(node, |kind| kind.contains("string")));
        if let Some(source_node) = imported {
            insert(&mut footprint.imports, get_node_text(source_node, source));
        }
    }
}

/// `name` field, or the first `identifier` child
fn declared_name(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("name")
        .or_else(|| first_child(node, |kind| kind == "identifier"))
}

fn first_child<'t>(node: Node<'t>, pred: impl Fn(&str) -> bool) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| pred(child.kind()));
    found
}

fn insert(set: &mut std::collections::BTreeSet<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        set.insert(text.to_string());
    }
}
