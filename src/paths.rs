//! Import path resolution.
//!
//! Turns a module specifier written in a source file into a concrete file
//! on disk. Only local specifiers (`./x`, `../x`, `/x`) are resolved;
//! everything else is external and left alone. Candidates are tried in a
//! fixed order: each extension appended, the bare path, then each
//! extension on `<path>/<index stem>`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use path_clean::PathClean;

/// Extensions tried for ECMAScript specifiers, in priority order.
pub const ECMASCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

/// Extensions tried for Python modules.
pub const PYTHON_EXTENSIONS: &[&str] = &[".py"];

/// Files or directories marking the top of a workspace.
const WORKSPACE_MARKERS: &[&str] = &[
    ".git",
    ".codeclip",
    "package.json",
    "tsconfig.json",
    "pyproject.toml",
];

/// Resolves local import specifiers to files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResolver {
    extensions: Vec<String>,
    index_stem: String,
    external_dirs: Vec<String>,
}

impl ImportResolver {
    pub fn new<S: AsRef<str>>(extensions: &[S], index_stem: &str) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.as_ref().to_string()).collect(),
            index_stem: index_stem.to_string(),
            external_dirs: Vec::new(),
        }
    }

    /// Resolver for TypeScript / JavaScript: `index` files, `node_modules`
    /// treated as external.
    pub fn ecmascript() -> Self {
        Self::new(ECMASCRIPT_EXTENSIONS, "index").with_external_dirs(&["node_modules"])
    }

    /// Resolver for Python packages: `__init__` files, `site-packages`
    /// treated as external.
    pub fn python() -> Self {
        Self::new(PYTHON_EXTENSIONS, "__init__").with_external_dirs(&["site-packages"])
    }

    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions.iter().map(|e| e.as_ref().to_string()).collect();
        self
    }

    pub fn with_external_dirs<S: AsRef<str>>(mut self, dirs: &[S]) -> Self {
        self.external_dirs = dirs.iter().map(|d| d.as_ref().to_string()).collect();
        self
    }

    /// True when `specifier` refers to a package rather than a local file.
    pub fn is_external(&self, specifier: &str) -> bool {
        if !(specifier.starts_with('.') || specifier.starts_with('/')) {
            return true;
        }
        specifier
            .split(['/', '\\'])
            .any(|segment| self.external_dirs.iter().any(|d| d == segment))
    }

    /// Resolve `specifier`, imported from `from_file`, to an existing file.
    ///
    /// Returns `None` for external specifiers and for local specifiers
    /// that match nothing on disk.
    pub fn resolve(
        &self,
        specifier: &str,
        from_file: &Path,
        workspace_root: &Path,
    ) -> Option<PathBuf> {
        if self.is_external(specifier) {
            return None;
        }

        let base = if let Some(rooted) = specifier.strip_prefix('/') {
            workspace_root.join(rooted)
        } else {
            from_file.parent().unwrap_or(Path::new("")).join(specifier)
        }
        .clean();

        self.candidates(&base).into_iter().find(|c| c.is_file())
    }

    /// Candidate files for a base path, in the order they are tried.
    fn candidates(&self, base: &Path) -> Vec<PathBuf> {
        let mut out = Vec::with_capacity(self.extensions.len() * 2 + 1);
        out.extend(self.extensions.iter().map(|ext| append_ext(base, ext)));
        out.push(base.to_path_buf());
        let index = base.join(&self.index_stem);
        out.extend(self.extensions.iter().map(|ext| append_ext(&index, ext)));
        out
    }
}

/// `a/b` + `.ts` -> `a/b.ts`, keeping any dots already in the file name.
fn append_ext(path: &Path, ext: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(ext);
    PathBuf::from(s)
}

/// Walk up from `start` to the nearest directory containing a workspace
/// marker. Falls back to `start` itself (or its parent when `start` is a
/// file) when no marker is found.
pub fn find_workspace_root(start: &Path) -> PathBuf {
    let start = if start.is_file() {
        start.parent().unwrap_or(start)
    } else {
        start
    };
    let mut current = start.to_path_buf();
    loop {
        if WORKSPACE_MARKERS.iter().any(|m| current.join(m).exists()) {
            return current;
        }
        if !current.pop() {
            return start.to_path_buf();
        }
    }
}
