//! Language detection and tree-sitter parsing.
//!
//! Maps file extensions and editor language identifiers to a [`Lang`],
//! builds a parser with the matching grammar, and parses source text.

use std::path::Path;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::errors::ClipError;

/// Supported languages with bundled tree-sitter grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
}

impl Lang {
    /// Returns the human-readable name for this language.
    pub fn name(self) -> &'static str {
        match self {
            Lang::TypeScript => "TypeScript",
            Lang::Tsx => "TSX",
            Lang::JavaScript => "JavaScript",
            Lang::Python => "Python",
        }
    }

    /// Editor language identifiers that select this language.
    pub fn language_ids(self) -> &'static [&'static str] {
        match self {
            Lang::TypeScript => &["typescript", "ts"],
            Lang::Tsx => &["typescriptreact", "tsx"],
            Lang::JavaScript => &["javascript", "javascriptreact", "js", "jsx"],
            Lang::Python => &["python", "py"],
        }
    }

    /// File extensions (without the dot) handled by this language.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Lang::TypeScript => &["ts", "mts", "cts"],
            Lang::Tsx => &["tsx"],
            Lang::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Lang::Python => &["py", "pyi"],
        }
    }

    /// Line comment prefix used when rendering provenance headers.
    pub fn comment_prefix(self) -> &'static str {
        match self {
            Lang::Python => "#",
            _ => "//",
        }
    }

    pub const ALL: [Lang; 4] = [Lang::TypeScript, Lang::Tsx, Lang::JavaScript, Lang::Python];
}

/// Detect the language of a file based on its extension.
///
/// Returns `None` for unsupported or missing extensions.
pub fn detect_language(path: &Path) -> Option<Lang> {
    let ext = path.extension()?.to_str()?;
    Lang::ALL
        .into_iter()
        .find(|lang| lang.extensions().contains(&ext))
}

/// Look up a language by editor language identifier (case-insensitive).
pub fn language_for_id(id: &str) -> Option<Lang> {
    let id = id.to_ascii_lowercase();
    Lang::ALL
        .into_iter()
        .find(|lang| lang.language_ids().contains(&id.as_str()))
}

/// Return the tree-sitter [`Language`] grammar for the given language.
fn grammar_for(lang: Lang) -> Language {
    match lang {
        Lang::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Lang::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Lang::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Lang::Python => tree_sitter_python::LANGUAGE.into(),
    }
}

/// Create a new [`Parser`] configured for the given language.
pub fn get_parser(lang: Lang) -> Result<Parser, ClipError> {
    let mut parser = Parser::new();
    parser
        .set_language(&grammar_for(lang))
        .map_err(|e| ClipError::Parse(format!("loading {} grammar: {e}", lang.name())))?;
    Ok(parser)
}

/// Parse source text into a syntax tree.
///
/// Fails when the grammar cannot be loaded or the parser gives up
/// without producing a tree. Trees containing syntax errors are still
/// returned; callers decide how much to trust them.
pub fn parse_source(lang: Lang, source: &str) -> Result<Tree, ClipError> {
    let mut parser = get_parser(lang)?;
    parser
        .parse(source, None)
        .ok_or_else(|| ClipError::Parse(format!("{} parser produced no tree", lang.name())))
}

// ---------------------------------------------------------------------------
// Node helpers shared by the language plugins
// ---------------------------------------------------------------------------

/// Get the text content of a node.
pub fn node_text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

/// Find a named child by its field name and return its text.
pub fn field_text<'a>(node: Node, field: &str, src: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| node_text(n, src))
}

/// Named children of a node, in order.
pub fn named_children(node: Node) -> Vec<Node> {
    let mut out = Vec::with_capacity(node.named_child_count());
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i as u32) {
            out.push(child);
        }
    }
    out
}

/// Strip the quotes from a string literal node's text.
pub fn unquote(text: &str) -> String {
    text.trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .to_string()
}
