//! Language plugins and the registry that dispatches to them.
//!
//! A [`LanguagePlugin`] bundles everything the resolver needs to know about
//! one language: how to read import statements, which specifiers are
//! external, how to turn a specifier into a file, how to find the
//! declaration around a selection, and (optionally) how to collect
//! same-file dependencies.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::ImportsConfig;
use crate::ecmascript::EcmaScriptPlugin;
use crate::fragment::ExtractedFragment;
use crate::lang::{Lang, detect_language, language_for_id};
use crate::outline::SyntaxOutline;
use crate::python::PythonPlugin;
use crate::types::{
    Dependency, DependencyKind, FragmentKind, ImportInfo, ImportKind, TextRange, relative_to,
};

pub trait LanguagePlugin: Send + Sync {
    /// The language (and grammar) this plugin parses.
    fn lang(&self) -> Lang;

    /// Parse every import / require statement in `content`.
    ///
    /// A file that cannot be parsed yields no imports.
    fn parse_imports(&self, content: &str, file: &Path) -> Vec<ImportInfo>;

    /// True when `specifier` names a package rather than a local file.
    fn is_external(&self, specifier: &str) -> bool;

    /// Resolve a local specifier to a file on disk.
    fn resolve_import(&self, specifier: &str, from_file: &Path, workspace_root: &Path)
    -> Option<PathBuf>;

    /// Find the smallest declaration containing `range`, or fall back to
    /// the line-snapped selection.
    fn extract_fragment(
        &self,
        content: &str,
        range: TextRange,
        requested: FragmentKind,
    ) -> ExtractedFragment;

    /// Same-file declarations the code in `range` needs.
    fn extract_local_dependencies(
        &self,
        _content: &str,
        _range: TextRange,
        _file: &Path,
        _workspace_root: &Path,
    ) -> Vec<Dependency> {
        Vec::new()
    }

    /// Declarations of `content`, for cursor-based fragment selection.
    fn outline(&self, content: &str) -> Option<SyntaxOutline>;

    /// Build the Dependency record for a resolved import by reading the
    /// target file.
    fn resolve_dependency(
        &self,
        import: &ImportInfo,
        path: &Path,
        workspace_root: &Path,
    ) -> io::Result<Dependency> {
        let content = std::fs::read_to_string(path)?;
        let kind = if import.kind == ImportKind::Type {
            DependencyKind::Type
        } else {
            DependencyKind::Import
        };
        Ok(Dependency {
            file_path: path.to_path_buf(),
            content,
            relative_path: relative_to(path, workspace_root),
            kind,
            name: import.names.first().cloned(),
        })
    }

    fn name(&self) -> &'static str {
        self.lang().name()
    }

    fn handles_language_id(&self, id: &str) -> bool {
        language_for_id(id) == Some(self.lang())
    }

    fn handles_path(&self, path: &Path) -> bool {
        detect_language(path) == Some(self.lang())
    }

    fn comment_prefix(&self) -> &'static str {
        self.lang().comment_prefix()
    }
}

/// Dispatch table of plugins keyed by language id and file extension.
pub struct PluginRegistry {
    plugins: Vec<Box<dyn LanguagePlugin>>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Registry with every bundled plugin, honouring import settings.
    pub fn with_config(imports: &ImportsConfig) -> Self {
        let mut registry = Self::empty();
        for lang in [Lang::TypeScript, Lang::Tsx, Lang::JavaScript] {
            registry.register(Box::new(EcmaScriptPlugin::with_config(lang, imports)));
        }
        registry.register(Box::new(PythonPlugin::with_config(imports)));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn LanguagePlugin>) {
        self.plugins.push(plugin);
    }

    pub fn for_language(&self, id: &str) -> Option<&dyn LanguagePlugin> {
        self.plugins
            .iter()
            .find(|p| p.handles_language_id(id))
            .map(|p| p.as_ref())
    }

    pub fn for_path(&self, path: &Path) -> Option<&dyn LanguagePlugin> {
        self.plugins
            .iter()
            .find(|p| p.handles_path(path))
            .map(|p| p.as_ref())
    }

    /// Plugin by language id, falling back to the file extension.
    pub fn select(&self, language: &str, path: &Path) -> Option<&dyn LanguagePlugin> {
        self.for_language(language).or_else(|| self.for_path(path))
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_config(&ImportsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_language_id() {
        let reg = PluginRegistry::default();
        assert_eq!(reg.for_language("typescript").unwrap().lang(), Lang::TypeScript);
        assert_eq!(reg.for_language("typescriptreact").unwrap().lang(), Lang::Tsx);
        assert_eq!(reg.for_language("python").unwrap().lang(), Lang::Python);
    }

    #[test]
    fn falls_back_to_extension() {
        let reg = PluginRegistry::default();
        let p = reg.select("plaintext", Path::new("src/a.jsx")).unwrap();
        assert_eq!(p.lang(), Lang::JavaScript);
    }

    #[test]
    fn unknown_language_and_extension_is_none() {
        let reg = PluginRegistry::default();
        assert!(reg.select("cobol", Path::new("a.cbl")).is_none());
    }

    #[test]
    fn empty_registry_finds_nothing() {
        let reg = PluginRegistry::empty();
        assert!(reg.select("typescript", Path::new("a.ts")).is_none());
    }

    #[test]
    fn comment_prefix_follows_language() {
        let reg = PluginRegistry::default();
        assert_eq!(reg.for_language("typescript").unwrap().comment_prefix(), "//");
        assert_eq!(reg.for_language("python").unwrap().comment_prefix(), "#");
    }

    #[test]
    fn resolve_dependency_reads_file_and_marks_type_imports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("types.ts");
        std::fs::write(&path, "export interface User { id: string }\n").unwrap();
        let reg = PluginRegistry::default();
        let plugin = reg.for_language("typescript").unwrap();
        let import = ImportInfo {
            path: "./types".into(),
            names: vec!["User".into()],
            kind: ImportKind::Type,
            raw: "import type { User } from './types';".into(),
            position: None,
            from_file: None,
        };
        let dep = plugin.resolve_dependency(&import, &path, dir.path()).unwrap();
        assert_eq!(dep.kind, DependencyKind::Type);
        assert_eq!(dep.relative_path, "types.ts");
        assert_eq!(dep.name.as_deref(), Some("User"));
        assert!(dep.content.contains("interface User"));
    }
}
