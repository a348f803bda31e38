//! Declaration outline of a source file.
//!
//! An editor can answer "which declarations contain this cursor?" from its
//! own symbol provider. [`DeclarationRanges`] is that capability;
//! [`SyntaxOutline`] implements it from a tree-sitter tree by walking the
//! declarations of the file and remembering their ranges and scopes.

use serde::Serialize;
use tree_sitter::{Node, Tree};

use crate::lang::{Lang, field_text, node_text};
use crate::text::LineIndex;
use crate::types::{FragmentKind, Position, TextRange};

/// Host-provided symbol queries.
pub trait DeclarationRanges {
    /// Ranges of every declaration containing `position`, outermost first.
    fn declaration_ranges_containing(&self, position: Position) -> Vec<TextRange>;
}

/// The kind of a declaration in the outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Enum,
    TypeAlias,
    Constant,
    Variable,
    Module,
}

impl SymbolKind {
    /// The fragment kind a cursor inside this declaration selects.
    pub fn fragment_kind(self) -> FragmentKind {
        match self {
            SymbolKind::Function => FragmentKind::Function,
            SymbolKind::Method => FragmentKind::Method,
            SymbolKind::Class => FragmentKind::Class,
            _ => FragmentKind::Selection,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::Module => "module",
        };
        write!(f, "{s}")
    }
}

/// One declaration found in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: TextRange,
    /// Enclosing declaration name (e.g. the class of a method).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// All declarations of a file in source order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyntaxOutline {
    pub symbols: Vec<OutlineSymbol>,
}

impl SyntaxOutline {
    pub fn build(tree: &Tree, source: &str, lang: Lang) -> Self {
        let index = LineIndex::new(source);
        let mut symbols = Vec::new();
        walk_node(tree.root_node(), source.as_bytes(), &index, lang, None, &mut symbols);
        Self { symbols }
    }

    /// The declaration spanning exactly `range`.
    pub fn symbol_at(&self, range: TextRange) -> Option<&OutlineSymbol> {
        self.symbols.iter().rfind(|s| s.range == range)
    }
}

impl DeclarationRanges for SyntaxOutline {
    fn declaration_ranges_containing(&self, position: Position) -> Vec<TextRange> {
        let mut ranges: Vec<TextRange> = self
            .symbols
            .iter()
            .map(|s| s.range)
            .filter(|r| r.contains(position))
            .collect();
        ranges.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        ranges
    }
}

/// Recursively walk a node and its children, collecting symbols.
fn walk_node(
    node: Node,
    src: &[u8],
    index: &LineIndex,
    lang: Lang,
    scope: Option<&str>,
    symbols: &mut Vec<OutlineSymbol>,
) {
    let matched = match lang {
        Lang::Python => match_python(node, src, scope),
        _ => match_ecmascript(node, src, scope),
    };

    if let Some((name, kind)) = matched {
        symbols.push(OutlineSymbol {
            name: name.clone(),
            kind,
            range: index.range_of(node.start_byte(), node.end_byte()),
            scope: scope.map(str::to_string),
        });
        if matches!(kind, SymbolKind::Class | SymbolKind::Interface | SymbolKind::Module) {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i as u32) {
                    walk_node(child, src, index, lang, Some(&name), symbols);
                }
            }
            return;
        }
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i as u32) {
            walk_node(child, src, index, lang, scope, symbols);
        }
    }
}

fn match_ecmascript(node: Node, src: &[u8], scope: Option<&str>) -> Option<(String, SymbolKind)> {
    let named = |kind: SymbolKind| field_text(node, "name", src).map(|n| (n.to_string(), kind));
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => named(SymbolKind::Function),
        "class_declaration" | "abstract_class_declaration" => named(SymbolKind::Class),
        "interface_declaration" => named(SymbolKind::Interface),
        "type_alias_declaration" => named(SymbolKind::TypeAlias),
        "enum_declaration" => named(SymbolKind::Enum),
        "module" | "internal_module" => named(SymbolKind::Module),
        "method_definition" | "method_signature" | "abstract_method_signature" => {
            named(SymbolKind::Method)
        }
        "lexical_declaration" | "variable_declaration" if scope.is_none() => {
            let declarator = (0..node.named_child_count())
                .filter_map(|i| node.named_child(i as u32))
                .find(|c| c.kind() == "variable_declarator")?;
            let name = declarator.child_by_field_name("name")?;
            if name.kind() != "identifier" {
                return None;
            }
            let text = node_text(name, src).to_string();
            let kind = match declarator.child_by_field_name("value").map(|v| v.kind()) {
                Some("arrow_function" | "function_expression" | "function") => SymbolKind::Function,
                Some("class") => SymbolKind::Class,
                _ if is_upper_snake(&text) => SymbolKind::Constant,
                _ => SymbolKind::Variable,
            };
            Some((text, kind))
        }
        _ => None,
    }
}

fn match_python(node: Node, src: &[u8], scope: Option<&str>) -> Option<(String, SymbolKind)> {
    match node.kind() {
        "function_definition" => {
            let kind = if scope.is_some() {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            };
            field_text(node, "name", src).map(|n| (n.to_string(), kind))
        }
        "class_definition" => {
            field_text(node, "name", src).map(|n| (n.to_string(), SymbolKind::Class))
        }
        _ => None,
    }
}

fn is_upper_snake(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_uppercase() || c == '_' || c.is_ascii_digit())
}
