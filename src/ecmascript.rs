//! TypeScript / TSX / JavaScript plugin.
//!
//! Import extraction covers static `import` statements (default, named,
//! namespace, type-only and side-effect forms), `export ... from`
//! re-exports, CommonJS `require()` calls, TypeScript `import x =
//! require()` and dynamic `import()`.

use std::path::{Path, PathBuf};

use tree_sitter::Node;

use crate::config::ImportsConfig;
use crate::fragment::{self, ExtractedFragment};
use crate::lang::{Lang, field_text, named_children, node_text, parse_source, unquote};
use crate::locals;
use crate::outline::SyntaxOutline;
use crate::paths::ImportResolver;
use crate::plugin::LanguagePlugin;
use crate::types::{Dependency, FragmentKind, ImportInfo, ImportKind, Position, TextRange};

pub struct EcmaScriptPlugin {
    lang: Lang,
    resolver: ImportResolver,
}

impl EcmaScriptPlugin {
    pub fn new(lang: Lang) -> Self {
        Self {
            lang,
            resolver: ImportResolver::ecmascript(),
        }
    }

    pub fn with_config(lang: Lang, imports: &ImportsConfig) -> Self {
        Self {
            lang,
            resolver: ImportResolver::ecmascript()
                .with_extensions(&imports.extensions)
                .with_external_dirs(&imports.external_dirs),
        }
    }
}

impl LanguagePlugin for EcmaScriptPlugin {
    fn lang(&self) -> Lang {
        self.lang
    }

    fn parse_imports(&self, content: &str, file: &Path) -> Vec<ImportInfo> {
        let tree = match parse_source(self.lang, content) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::debug!(file = %file.display(), error = %e, "import parse failed");
                return Vec::new();
            }
        };
        let mut imports = Vec::new();
        walk_imports(tree.root_node(), content.as_bytes(), file, &mut imports);
        imports
    }

    fn is_external(&self, specifier: &str) -> bool {
        self.resolver.is_external(specifier)
    }

    fn resolve_import(
        &self,
        specifier: &str,
        from_file: &Path,
        workspace_root: &Path,
    ) -> Option<PathBuf> {
        self.resolver.resolve(specifier, from_file, workspace_root)
    }

    fn extract_fragment(
        &self,
        content: &str,
        range: TextRange,
        requested: FragmentKind,
    ) -> ExtractedFragment {
        let tree = parse_source(self.lang, content).ok();
        fragment::extract_fragment(content, tree.as_ref(), range, requested, classify_declaration)
    }

    fn extract_local_dependencies(
        &self,
        content: &str,
        range: TextRange,
        file: &Path,
        workspace_root: &Path,
    ) -> Vec<Dependency> {
        match parse_source(self.lang, content) {
            Ok(tree) => {
                locals::extract_local_dependencies(&tree, content, range, file, workspace_root)
            }
            Err(e) => {
                tracing::debug!(
                    file = %file.display(),
                    error = %e,
                    "local dependency parse failed"
                );
                Vec::new()
            }
        }
    }

    fn outline(&self, content: &str) -> Option<SyntaxOutline> {
        let tree = parse_source(self.lang, content).ok()?;
        Some(SyntaxOutline::build(&tree, content, self.lang))
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Declaration kinds that can stand alone as a fragment.
pub fn classify_declaration(node: Node) -> Option<FragmentKind> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            Some(FragmentKind::Function)
        }
        "class_declaration" | "abstract_class_declaration" => Some(FragmentKind::Class),
        "method_definition"
        | "method_signature"
        | "abstract_method_signature"
        | "public_field_definition"
        | "field_definition" => Some(FragmentKind::Method),
        "lexical_declaration" | "variable_declaration" => {
            if has_function_value(node) {
                Some(FragmentKind::Function)
            } else {
                Some(FragmentKind::Selection)
            }
        }
        "interface_declaration"
        | "type_alias_declaration"
        | "enum_declaration"
        | "module"
        | "internal_module"
        | "ambient_declaration" => Some(FragmentKind::Selection),
        _ => None,
    }
}

/// True when a `const`/`let`/`var` declaration binds a function value.
pub(crate) fn has_function_value(decl: Node) -> bool {
    named_children(decl)
        .into_iter()
        .filter(|c| c.kind() == "variable_declarator")
        .filter_map(|c| c.child_by_field_name("value"))
        .any(|v| is_function_value(v.kind()))
}

pub(crate) fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

// ---------------------------------------------------------------------------
// Import extraction
// ---------------------------------------------------------------------------

fn walk_imports(node: Node, src: &[u8], file: &Path, out: &mut Vec<ImportInfo>) {
    match node.kind() {
        "import_statement" => {
            if let Some(info) = parse_import_statement(node, src, file) {
                out.push(info);
            }
            return;
        }
        "export_statement" if node.child_by_field_name("source").is_some() => {
            if let Some(info) = parse_reexport(node, src, file) {
                out.push(info);
            }
            return;
        }
        "call_expression" => {
            if let Some(info) = parse_require_or_dynamic(node, src, file) {
                out.push(info);
            }
        }
        _ => {}
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i as u32) {
            walk_imports(child, src, file, out);
        }
    }
}

fn make_import(
    path: String,
    names: Vec<String>,
    kind: ImportKind,
    node: Node,
    src: &[u8],
    file: &Path,
) -> ImportInfo {
    let start = node.start_position();
    ImportInfo {
        path,
        names,
        kind,
        raw: node_text(node, src).trim().to_string(),
        position: Some(Position::new(start.row, start.column)),
        from_file: Some(file.to_path_buf()),
    }
}

/// True when an unnamed `type` keyword is a direct child (`import type`,
/// `export type`).
fn has_type_keyword(node: Node) -> bool {
    (0..node.child_count())
        .filter_map(|i| node.child(i as u32))
        .any(|c| !c.is_named() && c.kind() == "type")
}

fn parse_import_statement(node: Node, src: &[u8], file: &Path) -> Option<ImportInfo> {
    let children = named_children(node);

    // TypeScript `import fs = require("fs")`.
    if let Some(req) = children.iter().find(|c| c.kind() == "import_require_clause") {
        let path = unquote(field_text(*req, "source", src)?);
        let names = named_children(*req)
            .into_iter()
            .filter(|c| c.kind() == "identifier")
            .map(|c| node_text(c, src).to_string())
            .collect();
        return Some(make_import(path, names, ImportKind::Default, node, src, file));
    }

    let path = unquote(field_text(node, "source", src)?);
    let Some(clause) = children.iter().find(|c| c.kind() == "import_clause") else {
        return Some(make_import(path, Vec::new(), ImportKind::SideEffect, node, src, file));
    };

    let mut names = Vec::new();
    let mut has_default = false;
    let mut has_namespace = false;
    for part in named_children(*clause) {
        match part.kind() {
            "identifier" => {
                has_default = true;
                names.push(node_text(part, src).to_string());
            }
            "namespace_import" => {
                has_namespace = true;
                if let Some(alias) = named_children(part)
                    .into_iter()
                    .find(|c| c.kind() == "identifier")
                {
                    names.push(node_text(alias, src).to_string());
                }
            }
            "named_imports" => {
                for item in named_children(part) {
                    if item.kind() == "import_specifier"
                        && let Some(name) = field_text(item, "name", src)
                    {
                        names.push(name.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    let kind = if has_type_keyword(node) {
        ImportKind::Type
    } else if has_default {
        ImportKind::Default
    } else if has_namespace {
        ImportKind::Namespace
    } else {
        ImportKind::Named
    };
    Some(make_import(path, names, kind, node, src, file))
}

fn parse_reexport(node: Node, src: &[u8], file: &Path) -> Option<ImportInfo> {
    let path = unquote(field_text(node, "source", src)?);
    let mut names = Vec::new();
    let mut named = false;
    for child in named_children(node) {
        match child.kind() {
            "export_clause" => {
                named = true;
                for item in named_children(child) {
                    if item.kind() == "export_specifier"
                        && let Some(name) = field_text(item, "name", src)
                    {
                        names.push(name.to_string());
                    }
                }
            }
            "namespace_export" => {
                if let Some(alias) = named_children(child).first() {
                    names.push(node_text(*alias, src).to_string());
                }
            }
            _ => {}
        }
    }
    let kind = if has_type_keyword(node) {
        ImportKind::Type
    } else if named {
        ImportKind::Named
    } else {
        ImportKind::Namespace
    };
    Some(make_import(path, names, kind, node, src, file))
}

/// `require("./x")` and `import("./x")` calls with a string literal argument.
fn parse_require_or_dynamic(node: Node, src: &[u8], file: &Path) -> Option<ImportInfo> {
    let function = node.child_by_field_name("function")?;
    let is_require = function.kind() == "identifier" && node_text(function, src) == "require";
    let is_dynamic = function.kind() == "import";
    if !is_require && !is_dynamic {
        return None;
    }
    let args = node.child_by_field_name("arguments")?;
    let first = args.named_child(0u32)?;
    if first.kind() != "string" {
        return None;
    }
    let path = unquote(node_text(first, src));

    if is_dynamic {
        return Some(make_import(path, Vec::new(), ImportKind::Namespace, node, src, file));
    }

    // `const x = require(...)` / `const { a, b } = require(...)`
    let binding = node
        .parent()
        .filter(|p| p.kind() == "variable_declarator")
        .and_then(|p| p.child_by_field_name("name"));
    let (names, kind) = match binding {
        Some(b) if b.kind() == "identifier" => {
            (vec![node_text(b, src).to_string()], ImportKind::Default)
        }
        Some(b) => {
            let mut names = Vec::new();
            locals::pattern_names(b, src, &mut names);
            (names, ImportKind::Named)
        }
        None => (Vec::new(), ImportKind::SideEffect),
    };
    let raw_node = node
        .parent()
        .and_then(|p| p.parent())
        .filter(|gp| matches!(gp.kind(), "lexical_declaration" | "variable_declaration"))
        .unwrap_or(node);
    Some(make_import(path, names, kind, raw_node, src, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imports(source: &str) -> Vec<ImportInfo> {
        EcmaScriptPlugin::new(Lang::TypeScript).parse_imports(source, Path::new("/w/a.ts"))
    }

    #[test]
    fn named_imports() {
        let got = imports("import { b, c as d } from './b';");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, "./b");
        assert_eq!(got[0].names, vec!["b", "c"]);
        assert_eq!(got[0].kind, ImportKind::Named);
        assert_eq!(got[0].raw, "import { b, c as d } from './b';");
        assert_eq!(got[0].position, Some(Position::new(0, 0)));
        assert_eq!(got[0].from_file.as_deref(), Some(Path::new("/w/a.ts")));
    }

    #[test]
    fn default_and_named_imports() {
        let got = imports("import React, { useState } from \"react\";");
        assert_eq!(got[0].kind, ImportKind::Default);
        assert_eq!(got[0].names, vec!["React", "useState"]);
        assert_eq!(got[0].path, "react");
    }

    #[test]
    fn namespace_import() {
        let got = imports("import * as utils from '../utils';");
        assert_eq!(got[0].kind, ImportKind::Namespace);
        assert_eq!(got[0].names, vec!["utils"]);
    }

    #[test]
    fn type_only_import() {
        let got = imports("import type { User } from './types';");
        assert_eq!(got[0].kind, ImportKind::Type);
        assert_eq!(got[0].names, vec!["User"]);
    }

    #[test]
    fn side_effect_import() {
        let got = imports("import './polyfills';");
        assert_eq!(got[0].kind, ImportKind::SideEffect);
        assert!(got[0].names.is_empty());
        assert_eq!(got[0].path, "./polyfills");
    }

    #[test]
    fn reexports_are_imports() {
        let got = imports("export { a, b } from './ab';\nexport * from './all';");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].kind, ImportKind::Named);
        assert_eq!(got[0].names, vec!["a", "b"]);
        assert_eq!(got[1].kind, ImportKind::Namespace);
        assert_eq!(got[1].path, "./all");
    }

    #[test]
    fn local_exports_are_not_imports() {
        let got = imports("export const x = 1;\nexport { x as y };");
        assert!(got.is_empty());
    }

    #[test]
    fn require_calls() {
        let got = imports(
            "const fs = require('fs');\nconst { join, resolve } = require('./path-utils');\nrequire('./setup');",
        );
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].kind, ImportKind::Default);
        assert_eq!(got[0].names, vec!["fs"]);
        assert_eq!(got[0].raw, "const fs = require('fs');");
        assert_eq!(got[1].kind, ImportKind::Named);
        assert_eq!(got[1].names, vec!["join", "resolve"]);
        assert_eq!(got[2].kind, ImportKind::SideEffect);
        assert_eq!(got[2].path, "./setup");
    }

    #[test]
    fn require_inside_function_is_found() {
        let got =
            imports("function load() {\n  const cfg = require('./config');\n  return cfg;\n}");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, "./config");
        assert_eq!(got[0].position, Some(Position::new(1, 2)));
    }

    #[test]
    fn dynamic_import() {
        let got = imports("async function f() { const m = await import('./lazy'); }");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, "./lazy");
        assert_eq!(got[0].kind, ImportKind::Namespace);
    }

    #[test]
    fn typescript_import_equals_require() {
        let got = imports("import fs = require('fs');");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, "fs");
        assert_eq!(got[0].names, vec!["fs"]);
    }

    #[test]
    fn non_literal_require_is_ignored() {
        assert!(imports("const m = require(name);").is_empty());
    }

    #[test]
    fn javascript_grammar_parses_jsx_imports() {
        let plugin = EcmaScriptPlugin::new(Lang::JavaScript);
        let got = plugin.parse_imports(
            "import Button from './Button';\nexport const App = () => <Button />;",
            Path::new("/w/App.jsx"),
        );
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].names, vec!["Button"]);
    }

    #[test]
    fn externality_follows_resolver() {
        let plugin = EcmaScriptPlugin::new(Lang::TypeScript);
        assert!(plugin.is_external("lodash"));
        assert!(plugin.is_external("./node_modules/x"));
        assert!(!plugin.is_external("./x"));
    }
}
