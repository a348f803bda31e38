//! Shared types and data structures.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Default traversal depth for [`ResolveOptions`].
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Delimiter appended to a file path to name a same-file declaration.
pub const LOCAL_MARKER: &str = "#local";

/// A 0-based line/column position. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A half-open span between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    /// True when `pos` lies within the range (end inclusive, like an
    /// editor cursor placed right after the last character).
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line + 1,
            self.start.column + 1,
            self.end.line + 1,
            self.end.column + 1
        )
    }
}

/// What the user targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    File,
    Class,
    Function,
    Selection,
    Method,
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FragmentKind::File => "file",
            FragmentKind::Class => "class",
            FragmentKind::Function => "function",
            FragmentKind::Selection => "selection",
            FragmentKind::Method => "method",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for FragmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(FragmentKind::File),
            "class" => Ok(FragmentKind::Class),
            "function" => Ok(FragmentKind::Function),
            "selection" => Ok(FragmentKind::Selection),
            "method" => Ok(FragmentKind::Method),
            other => Err(format!("unknown fragment kind: {other}")),
        }
    }
}

/// The user's target code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeFragment {
    pub content: String,
    pub file_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
    pub kind: FragmentKind,
    /// Editor-style language identifier (e.g. `"typescript"`).
    pub language: String,
}

impl CodeFragment {
    /// A fragment covering a whole file.
    pub fn whole_file(file_path: impl Into<PathBuf>, content: String, language: &str) -> Self {
        Self {
            content,
            file_path: file_path.into(),
            relative_path: None,
            range: None,
            kind: FragmentKind::File,
            language: language.to_string(),
        }
    }

    /// A fragment for a selected range; `content` is the selected text.
    pub fn selection(
        file_path: impl Into<PathBuf>,
        content: String,
        range: TextRange,
        kind: FragmentKind,
        language: &str,
    ) -> Self {
        Self {
            content,
            file_path: file_path.into(),
            relative_path: None,
            range: Some(range),
            kind,
            language: language.to_string(),
        }
    }
}

/// How an import statement binds names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    Default,
    Named,
    Namespace,
    Type,
    SideEffect,
}

/// One import statement parsed from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportInfo {
    /// The raw module specifier, quotes stripped.
    pub path: String,
    /// Imported identifiers in source order.
    pub names: Vec<String>,
    pub kind: ImportKind,
    /// The statement's source text.
    pub raw: String,
    pub position: Option<Position>,
    pub from_file: Option<PathBuf>,
}

/// What sort of unit a [`Dependency`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Import,
    Type,
    Interface,
    Class,
    Function,
    Constant,
    Enum,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyKind::Import => "import",
            DependencyKind::Type => "type",
            DependencyKind::Interface => "interface",
            DependencyKind::Class => "class",
            DependencyKind::Function => "function",
            DependencyKind::Constant => "constant",
            DependencyKind::Enum => "enum",
        };
        write!(f, "{s}")
    }
}

/// A resolved, emittable unit of code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Real file path, or `<file>#local:<name>` for a same-file declaration.
    pub file_path: PathBuf,
    pub content: String,
    pub relative_path: String,
    pub kind: DependencyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Dependency {
    /// Build the pseudo path naming a same-file declaration.
    pub fn local_path(file: &Path, name: Option<&str>) -> PathBuf {
        match name {
            Some(n) => PathBuf::from(format!("{}{LOCAL_MARKER}:{n}", file.display())),
            None => PathBuf::from(format!("{}{LOCAL_MARKER}", file.display())),
        }
    }

    /// True for same-file declarations produced by local extraction: the
    /// path ends in `#local` or `#local:<name>`.
    pub fn is_local(&self) -> bool {
        let path = self.file_path.to_string_lossy();
        if path.ends_with(LOCAL_MARKER) {
            return true;
        }
        match path.rsplit_once(LOCAL_MARKER) {
            Some((_, tail)) => tail
                .strip_prefix(':')
                .is_some_and(|name| !name.is_empty() && !name.contains(['/', '\\'])),
            None => false,
        }
    }
}

/// Settings for one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub workspace_root: PathBuf,
    pub max_depth: usize,
    pub include_comments: bool,
    pub include_external: bool,
}

impl ResolveOptions {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            include_comments: true,
            include_external: false,
        }
    }
}

/// Output of [`crate::graph::DependencyResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveResult {
    /// Cross-file dependencies in topological order, then local ones.
    pub dependencies: Vec<Dependency>,
    pub target_fragment: CodeFragment,
    pub errors: Vec<String>,
}

/// Render `path` relative to `root` with forward slashes, or the full path
/// when it lies outside the root.
pub fn relative_to(path: &Path, root: &Path) -> String {
    let Ok(rel) = path.strip_prefix(root) else {
        return path.to_string_lossy().into_owned();
    };
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_normalises_reversed_endpoints() {
        let r = TextRange::new(Position::new(5, 0), Position::new(2, 3));
        assert_eq!(r.start, Position::new(2, 3));
        assert_eq!(r.end, Position::new(5, 0));
    }

    #[test]
    fn range_contains_is_end_inclusive() {
        let r = TextRange::new(Position::new(1, 0), Position::new(3, 4));
        assert!(r.contains(Position::new(1, 0)));
        assert!(r.contains(Position::new(2, 80)));
        assert!(r.contains(Position::new(3, 4)));
        assert!(!r.contains(Position::new(3, 5)));
        assert!(!r.contains(Position::new(0, 9)));
    }

    #[test]
    fn range_display_is_one_based() {
        let r = TextRange::new(Position::new(0, 0), Position::new(2, 4));
        assert_eq!(r.to_string(), "1:1-3:5");
    }

    #[test]
    fn local_path_uses_reserved_marker() {
        let p = Dependency::local_path(Path::new("/w/src/a.ts"), Some("helper"));
        assert_eq!(p, PathBuf::from("/w/src/a.ts#local:helper"));
        let anon = Dependency::local_path(Path::new("/w/src/a.ts"), None);
        assert_eq!(anon, PathBuf::from("/w/src/a.ts#local"));
    }

    #[test]
    fn local_marker_must_end_the_path() {
        let dep = |path: &str| Dependency {
            file_path: PathBuf::from(path),
            content: String::new(),
            relative_path: String::new(),
            kind: DependencyKind::Function,
            name: None,
        };
        assert!(dep("/w/src/a.ts#local:helper").is_local());
        assert!(dep("/w/src/a.ts#local").is_local());
        assert!(!dep("/w/docs#local/a.ts").is_local());
        assert!(!dep("/w/docs#local:x/a.ts").is_local());
        assert!(!dep("/w/src/a.ts").is_local());
    }

    #[test]
    fn relative_to_strips_root() {
        let rel = relative_to(Path::new("/w/src/lib/a.ts"), Path::new("/w"));
        assert_eq!(rel, "src/lib/a.ts");
    }

    #[test]
    fn relative_to_outside_root_keeps_path() {
        let rel = relative_to(Path::new("/other/a.ts"), Path::new("/w"));
        assert_eq!(rel, "/other/a.ts");
    }

    #[test]
    fn fragment_kind_round_trips_through_str() {
        for kind in ["file", "class", "function", "selection", "method"] {
            let parsed: FragmentKind = kind.parse().unwrap();
            assert_eq!(parsed.to_string(), kind);
        }
        assert!("module".parse::<FragmentKind>().is_err());
    }

    #[test]
    fn default_options() {
        let opts = ResolveOptions::new("/w");
        assert_eq!(opts.max_depth, 10);
        assert!(opts.include_comments);
        assert!(!opts.include_external);
    }
}
