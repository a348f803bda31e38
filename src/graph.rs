//! Cross-file dependency resolution.
//!
//! [`DependencyResolver::resolve`] walks the import graph outward from the
//! target file, bounded by `max_depth`, caching one [`Dependency`] per real
//! file. The walk state lives in a [`Traversal`] built fresh for every call,
//! so a resolver can be shared and reused freely.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use path_clean::PathClean;

use crate::errors::ClipError;
use crate::plugin::{LanguagePlugin, PluginRegistry};
use crate::toposort::topological_order;
use crate::types::{CodeFragment, Dependency, ResolveOptions, ResolveResult, relative_to};

/// Adjacency map from a file to the files it imports, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    adjacency: IndexMap<PathBuf, IndexSet<PathBuf>>,
}

impl DependencyGraph {
    /// Create an (empty) adjacency entry for `file` if none exists.
    pub fn ensure_node(&mut self, file: &Path) {
        if !self.adjacency.contains_key(file) {
            self.adjacency.insert(file.to_path_buf(), IndexSet::new());
        }
    }

    /// Record that `from` imports `to`.
    pub fn add_edge(&mut self, from: &Path, to: &Path) {
        self.adjacency
            .entry(from.to_path_buf())
            .or_default()
            .insert(to.to_path_buf());
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PathBuf> {
        self.adjacency.keys()
    }

    /// Direct imports of `file`; empty for files never visited.
    pub fn edges(&self, file: &Path) -> impl Iterator<Item = &PathBuf> {
        self.adjacency.get(file).into_iter().flatten()
    }
}

/// Resolves a fragment's dependencies using a registry of language plugins.
pub struct DependencyResolver {
    registry: PluginRegistry,
}

impl DependencyResolver {
    pub fn new(registry: PluginRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Collect everything `fragment` needs, in emission order.
    ///
    /// Never fails: problems are reported in [`ResolveResult::errors`] and
    /// the result holds whatever could be resolved.
    pub fn resolve(&self, fragment: &CodeFragment, options: &ResolveOptions) -> ResolveResult {
        let root = options.workspace_root.as_path();
        let file = absolute_in(&fragment.file_path, root);

        let mut target = fragment.clone();
        if target.relative_path.is_none() {
            target.relative_path = Some(relative_to(&file, root));
        }

        let Some(plugin) = self.registry.select(&fragment.language, &file) else {
            tracing::warn!(language = %fragment.language, "no plugin for language");
            return ResolveResult {
                dependencies: Vec::new(),
                target_fragment: target,
                errors: vec![ClipError::UnsupportedLanguage(fragment.language.clone()).to_string()],
            };
        };

        tracing::debug!(
            file = %file.display(),
            plugin = plugin.name(),
            max_depth = options.max_depth,
            "resolving dependencies"
        );

        let mut traversal = Traversal::new(&self.registry, plugin, options);
        traversal.visit(&file, 0);
        let mut dependencies = topological_order(&traversal.graph, &traversal.cache);

        if let Some(range) = fragment.range {
            match std::fs::read_to_string(&file) {
                Ok(source) => {
                    let extracted = plugin.extract_fragment(&source, range, fragment.kind);
                    tracing::debug!(
                        requested = %range,
                        extracted = %extracted.range,
                        kind = %extracted.kind,
                        "fragment extracted"
                    );
                    let locals =
                        plugin.extract_local_dependencies(&source, extracted.range, &file, root);
                    tracing::debug!(count = locals.len(), "local dependencies");
                    dependencies.extend(locals);
                    target.content = extracted.content;
                    target.range = Some(extracted.range);
                    target.kind = extracted.kind;
                }
                Err(e) => traversal.warn(read_error(&file, &e)),
            }
        }

        ResolveResult {
            dependencies,
            target_fragment: target,
            errors: traversal.errors,
        }
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new(PluginRegistry::default())
    }
}

/// Per-call walk state.
struct Traversal<'r> {
    registry: &'r PluginRegistry,
    /// Plugin of the target fragment, used for files no plugin claims.
    fallback: &'r dyn LanguagePlugin,
    options: &'r ResolveOptions,
    visited: HashSet<PathBuf>,
    graph: DependencyGraph,
    cache: IndexMap<PathBuf, Dependency>,
    errors: Vec<String>,
}

impl<'r> Traversal<'r> {
    fn new(
        registry: &'r PluginRegistry,
        fallback: &'r dyn LanguagePlugin,
        options: &'r ResolveOptions,
    ) -> Self {
        Self {
            registry,
            fallback,
            options,
            visited: HashSet::new(),
            graph: DependencyGraph::default(),
            cache: IndexMap::new(),
            errors: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        if !self.errors.contains(&message) {
            self.errors.push(message);
        }
    }

    fn visit(&mut self, file: &Path, depth: usize) {
        if depth >= self.options.max_depth {
            tracing::debug!(file = %file.display(), depth, "max depth reached");
            return;
        }
        if !self.visited.insert(file.to_path_buf()) {
            tracing::debug!(file = %file.display(), "already visited");
            return;
        }
        self.graph.ensure_node(file);
        tracing::debug!(file = %file.display(), depth, "visiting");

        let content = match self.cache.get(file) {
            Some(dep) => dep.content.clone(),
            None => match std::fs::read_to_string(file) {
                Ok(content) => content,
                Err(e) => {
                    self.warn(read_error(file, &e));
                    return;
                }
            },
        };

        let registry = self.registry;
        let options = self.options;
        let plugin = registry.for_path(file).unwrap_or(self.fallback);
        let root = options.workspace_root.as_path();

        for import in plugin.parse_imports(&content, file) {
            if !options.include_external && plugin.is_external(&import.path) {
                tracing::debug!(specifier = %import.path, "external import skipped");
                continue;
            }
            let Some(resolved) = plugin.resolve_import(&import.path, file, root) else {
                tracing::debug!(
                    specifier = %import.path,
                    from = %file.display(),
                    "unresolved import dropped"
                );
                continue;
            };

            self.graph.add_edge(file, &resolved);
            if self.cache.contains_key(&resolved) {
                continue;
            }

            match plugin.resolve_dependency(&import, &resolved, root) {
                Ok(dep) => {
                    self.cache.insert(resolved.clone(), dep);
                    self.visit(&resolved, depth + 1);
                }
                Err(e) => self.warn(read_error(&resolved, &e)),
            }
        }
    }
}

fn read_error(path: &Path, err: &std::io::Error) -> String {
    format!("failed to read {}: {err}", path.display())
}

/// `path` made absolute against `root` and lexically normalised.
fn absolute_in(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.clean()
    } else {
        root.join(path).clean()
    }
}
