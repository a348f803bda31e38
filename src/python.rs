//! Python plugin.
//!
//! Only relative imports (`from . import x`, `from ..pkg.mod import y`)
//! name local files; absolute module paths are treated as external. Dotted
//! relative specifiers are rewritten to slash paths before resolution, so
//! `..pkg.mod` is looked up as `../pkg/mod.py` or `../pkg/mod/__init__.py`.

use std::path::{Path, PathBuf};

use tree_sitter::Node;

use crate::config::ImportsConfig;
use crate::fragment::{self, ExtractedFragment};
use crate::lang::{Lang, named_children, node_text, parse_source};
use crate::outline::SyntaxOutline;
use crate::paths::ImportResolver;
use crate::plugin::LanguagePlugin;
use crate::types::{FragmentKind, ImportInfo, ImportKind, Position, TextRange};

pub struct PythonPlugin {
    resolver: ImportResolver,
}

impl PythonPlugin {
    pub fn new() -> Self {
        Self {
            resolver: ImportResolver::python(),
        }
    }

    pub fn with_config(imports: &ImportsConfig) -> Self {
        Self {
            resolver: ImportResolver::python()
                .with_extensions(&imports.python_extensions)
                .with_external_dirs(&imports.external_dirs),
        }
    }
}

impl Default for PythonPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguagePlugin for PythonPlugin {
    fn lang(&self) -> Lang {
        Lang::Python
    }

    fn parse_imports(&self, content: &str, file: &Path) -> Vec<ImportInfo> {
        let tree = match parse_source(Lang::Python, content) {
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
        !specifier.starts_with('.')
    }

    fn resolve_import(
        &self,
        specifier: &str,
        from_file: &Path,
        workspace_root: &Path,
    ) -> Option<PathBuf> {
        if self.is_external(specifier) {
            return None;
        }
        self.resolver
            .resolve(&to_relative_path(specifier), from_file, workspace_root)
    }

    fn extract_fragment(
        &self,
        content: &str,
        range: TextRange,
        requested: FragmentKind,
    ) -> ExtractedFragment {
        let tree = parse_source(Lang::Python, content).ok();
        fragment::extract_fragment(content, tree.as_ref(), range, requested, classify_declaration)
    }

    fn outline(&self, content: &str) -> Option<SyntaxOutline> {
        let tree = parse_source(Lang::Python, content).ok()?;
        Some(SyntaxOutline::build(&tree, content, Lang::Python))
    }
}

/// `.a.b` -> `./a/b`, `..a` -> `../a`, `...` -> `../..`.
pub fn to_relative_path(specifier: &str) -> String {
    let dots = specifier.chars().take_while(|&c| c == '.').count();
    let rest = &specifier[dots..];
    let prefix = if dots <= 1 {
        "./".to_string()
    } else {
        "../".repeat(dots - 1)
    };
    if rest.is_empty() {
        prefix.trim_end_matches('/').to_string()
    } else {
        format!("{prefix}{}", rest.replace('.', "/"))
    }
}

/// Functions, classes and their decorated forms. A definition under a
/// decorator is not a declaration of its own, so the decorators always
/// travel with it.
pub fn classify_declaration(node: Node) -> Option<FragmentKind> {
    match node.kind() {
        "class_definition" | "function_definition" => {
            if node.parent().is_some_and(|p| p.kind() == "decorated_definition") {
                return None;
            }
            definition_kind(node)
        }
        "decorated_definition" => node
            .child_by_field_name("definition")
            .and_then(definition_kind),
        _ => None,
    }
}

fn definition_kind(node: Node) -> Option<FragmentKind> {
    match node.kind() {
        "class_definition" => Some(FragmentKind::Class),
        "function_definition" => {
            let mut parent = node.parent();
            while let Some(p) = parent {
                match p.kind() {
                    "class_definition" => return Some(FragmentKind::Method),
                    "function_definition" => return Some(FragmentKind::Function),
                    _ => parent = p.parent(),
                }
            }
            Some(FragmentKind::Function)
        }
        _ => None,
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

/// The bound name of a `dotted_name` or `aliased_import`.
fn imported_name(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "dotted_name" => Some(node_text(node, src).to_string()),
        "aliased_import" => node
            .child_by_field_name("name")
            .map(|n| node_text(n, src).to_string()),
        _ => None,
    }
}

fn walk_imports(node: Node, src: &[u8], file: &Path, out: &mut Vec<ImportInfo>) {
    match node.kind() {
        "import_statement" => {
            for child in named_children(node) {
                if let Some(name) = imported_name(child, src) {
                    let bound = name.rsplit('.').next().unwrap_or(&name).to_string();
                    let import =
                        make_import(name, vec![bound], ImportKind::Namespace, node, src, file);
                    out.push(import);
                }
            }
            return;
        }
        "import_from_statement" => {
            parse_from_import(node, src, file, out);
            return;
        }
        _ => {}
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i as u32) {
            walk_imports(child, src, file, out);
        }
    }
}

fn parse_from_import(node: Node, src: &[u8], file: &Path, out: &mut Vec<ImportInfo>) {
    let Some(module) = node.child_by_field_name("module_name") else {
        return;
    };
    let module_text = node_text(module, src).to_string();

    let mut names = Vec::new();
    let mut wildcard = false;
    for child in named_children(node) {
        if child.id() == module.id() {
            continue;
        }
        if child.kind() == "wildcard_import" {
            wildcard = true;
        } else if let Some(name) = imported_name(child, src) {
            names.push(name);
        }
    }

    // `from . import a, b` names sibling modules, one import each.
    if !module_text.is_empty() && module_text.chars().all(|c| c == '.') {
        for name in names {
            out.push(make_import(
                format!("{module_text}{name}"),
                vec![name],
                ImportKind::Default,
                node,
                src,
                file,
            ));
        }
        return;
    }

    let kind = if wildcard {
        ImportKind::Namespace
    } else {
        ImportKind::Named
    };
    out.push(make_import(module_text, names, kind, node, src, file));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use std::fs;

    fn imports(source: &str) -> Vec<ImportInfo> {
        PythonPlugin::new().parse_imports(source, Path::new("/w/app/main.py"))
    }

    #[test]
    fn dotted_specifiers_become_paths() {
        assert_eq!(to_relative_path(".models"), "./models");
        assert_eq!(to_relative_path(".models.user"), "./models/user");
        assert_eq!(to_relative_path("..core"), "../core");
        assert_eq!(to_relative_path("...core.db"), "../../core/db");
        assert_eq!(to_relative_path("."), ".");
        assert_eq!(to_relative_path(".."), "..");
    }

    #[test]
    fn plain_imports_are_external() {
        let got = imports("import os\nimport os.path as osp\n");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].path, "os");
        assert_eq!(got[1].path, "os.path");
        let plugin = PythonPlugin::new();
        assert!(got.iter().all(|i| plugin.is_external(&i.path)));
    }

    #[test]
    fn relative_from_import() {
        let got = imports("from .models import User, Group\n");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].path, ".models");
        assert_eq!(got[0].names, vec!["User", "Group"]);
        assert_eq!(got[0].kind, ImportKind::Named);
        assert_eq!(got[0].position, Some(Position::new(0, 0)));
    }

    #[test]
    fn from_dot_import_names_modules() {
        let got = imports("from . import helpers, views\n");
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].path, ".helpers");
        assert_eq!(got[1].path, ".views");
    }

    #[test]
    fn wildcard_import() {
        let got = imports("from ..shared import *\n");
        assert_eq!(got[0].kind, ImportKind::Namespace);
        assert_eq!(got[0].path, "..shared");
    }

    #[test]
    fn resolves_relative_module_and_package() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/models")).unwrap();
        fs::write(root.join("app/main.py"), "").unwrap();
        fs::write(root.join("app/util.py"), "").unwrap();
        fs::write(root.join("app/models/__init__.py"), "").unwrap();
        let plugin = PythonPlugin::new();
        let from = root.join("app/main.py");
        assert_eq!(
            plugin.resolve_import(".util", &from, root),
            Some(root.join("app/util.py"))
        );
        assert_eq!(
            plugin.resolve_import(".models", &from, root),
            Some(root.join("app/models/__init__.py"))
        );
        assert_eq!(plugin.resolve_import("os", &from, root), None);
    }

    #[test]
    fn method_fragment_inside_class() {
        let mut src = String::from(
            "class Repo:\n    def save(self, item):\n        self.items.append(item)\n        return item\n\n",
        );
        src.push_str(&"PAD = 0\n".repeat(30));
        let plugin = PythonPlugin::new();
        let frag = plugin.extract_fragment(
            &src,
            TextRange::new(Position::new(2, 0), Position::new(2, 4)),
            FragmentKind::Selection,
        );
        assert!(frag.content.starts_with("def save(self, item):"));
        assert_eq!(frag.kind, FragmentKind::Method);
    }

    #[test]
    fn decorated_function_fragment() {
        let mut src = String::from("@cache\ndef load(key):\n    return key\n\n");
        src.push_str(&"PAD = 0\n".repeat(30));
        let plugin = PythonPlugin::new();
        let frag = plugin.extract_fragment(
            &src,
            TextRange::new(Position::new(0, 0), Position::new(2, 0)),
            FragmentKind::Selection,
        );
        assert!(frag.content.starts_with("@cache\ndef load"));
        assert_eq!(frag.kind, FragmentKind::Function);
    }

    #[test]
    fn body_line_keeps_decorators() {
        let mut src = String::from(
            "@cache\n@trace(level=2)\ndef load(key):\n    x = key\n    return x\n\n",
        );
        src.push_str(&"PAD = 0\n".repeat(30));
        let plugin = PythonPlugin::new();
        let frag = plugin.extract_fragment(
            &src,
            TextRange::new(Position::new(3, 4), Position::new(3, 9)),
            FragmentKind::Selection,
        );
        assert_eq!(
            frag.content,
            "@cache\n@trace(level=2)\ndef load(key):\n    x = key\n    return x"
        );
        assert_eq!(frag.kind, FragmentKind::Function);
        assert_eq!(frag.range.start, Position::new(0, 0));
    }

    #[test]
    fn decorated_method_keeps_decorator() {
        let mut src = String::from(
            "class Repo:\n    @property\n    def size(self):\n        return len(self.items)\n\n",
        );
        src.push_str(&"PAD = 0\n".repeat(30));
        let plugin = PythonPlugin::new();
        let frag = plugin.extract_fragment(
            &src,
            TextRange::new(Position::new(3, 8), Position::new(3, 14)),
            FragmentKind::Selection,
        );
        assert!(frag.content.starts_with("@property\n    def size(self):"));
        assert_eq!(frag.kind, FragmentKind::Method);
    }

    #[test]
    fn no_local_dependencies_for_python() {
        let plugin = PythonPlugin::new();
        let deps = plugin.extract_local_dependencies(
            "def a():\n    return b()\n\ndef b():\n    return 1\n",
            TextRange::new(Position::new(0, 0), Position::new(1, 14)),
            Path::new("/w/m.py"),
            Path::new("/w"),
        );
        assert!(deps.is_empty());
    }
}
