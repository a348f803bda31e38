//! Output formatting: commented source text (default) and JSON (`--json`).
//!
//! All result data flows through a [`Formatter`] which writes to an
//! arbitrary [`std::io::Write`] destination (typically stdout).
//! Hints and errors always go to stderr via [`print_hint`] and [`print_error`].

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::outline::SyntaxOutline;
use crate::types::{Dependency, LOCAL_MARKER, ResolveResult};

// ---------------------------------------------------------------------------
// Serializable output types
// ---------------------------------------------------------------------------

/// One line of `deps` output.
#[derive(Debug, Clone, Serialize)]
pub struct DepOutput {
    pub path: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One line of `outline` output.
#[derive(Debug, Clone, Serialize)]
pub struct OutlineOutput {
    pub name: String,
    pub kind: String,
    pub line: usize,
    pub col: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl DepOutput {
    pub fn from_dependency(dep: &Dependency) -> Self {
        Self {
            path: display_path(dep),
            kind: dep.kind.to_string(),
            name: dep.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Drop repeated file paths, keeping the first occurrence.
pub fn dedup_by_path(dependencies: &[Dependency]) -> Vec<Dependency> {
    let mut seen: HashSet<&PathBuf> = HashSet::new();
    dependencies
        .iter()
        .filter(|d| seen.insert(&d.file_path))
        .cloned()
        .collect()
}

/// The workspace-relative path, with the local marker for same-file
/// declarations.
fn display_path(dep: &Dependency) -> String {
    if dep.is_local() {
        match &dep.name {
            Some(name) => format!("{}{LOCAL_MARKER}:{name}", dep.relative_path),
            None => format!("{}{LOCAL_MARKER}", dep.relative_path),
        }
    } else {
        dep.relative_path.clone()
    }
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Output formatter that renders results either as text or as JSON.
pub struct Formatter<W: Write> {
    writer: W,
    json: bool,
}

impl<W: Write> Formatter<W> {
    /// Create a new formatter.
    ///
    /// * `writer` - The destination for output (e.g. `std::io::stdout()`).
    /// * `json`   - When `true`, emit JSON; otherwise, emit text.
    pub fn new(writer: W, json: bool) -> Self {
        Self { writer, json }
    }

    fn write_json<T: Serialize>(&mut self, value: &T, pretty: bool) -> std::io::Result<()> {
        let text = if pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
        .map_err(std::io::Error::other)?;
        writeln!(self.writer, "{text}")
    }

    /// Render a resolution as a self-contained, copyable block of code.
    ///
    /// Dependencies are deduplicated by file path before rendering. When
    /// `include_comments` is false the header and provenance lines are
    /// left out; warnings are always listed.
    pub fn format_result(
        &mut self,
        result: &ResolveResult,
        comment_prefix: &str,
        include_comments: bool,
    ) -> std::io::Result<()> {
        let dependencies = dedup_by_path(&result.dependencies);

        if self.json {
            let deduped = ResolveResult {
                dependencies,
                target_fragment: result.target_fragment.clone(),
                errors: result.errors.clone(),
            };
            return self.write_json(&deduped, true);
        }

        let target = &result.target_fragment;
        let target_path = target
            .relative_path
            .clone()
            .unwrap_or_else(|| target.file_path.to_string_lossy().into_owned());

        if include_comments {
            writeln!(self.writer, "{comment_prefix} Code with dependencies: {target_path}")?;
            writeln!(self.writer, "{comment_prefix} Dependencies: {}", dependencies.len())?;
            writeln!(self.writer)?;
        }

        for dep in &dependencies {
            if include_comments {
                writeln!(self.writer, "{comment_prefix} From: {}", dep.relative_path)?;
            }
            writeln!(self.writer, "{}", dep.content.trim_end())?;
            writeln!(self.writer)?;
        }

        if include_comments {
            writeln!(self.writer, "{comment_prefix} From: {target_path} (target)")?;
        }
        writeln!(self.writer, "{}", target.content.trim_end())?;

        if !result.errors.is_empty() {
            writeln!(self.writer)?;
            writeln!(self.writer, "{comment_prefix} Warnings:")?;
            for err in &result.errors {
                writeln!(self.writer, "{comment_prefix} - {err}")?;
            }
        }
        Ok(())
    }

    /// List the resolved dependencies in emission order.
    pub fn format_dependencies(&mut self, result: &ResolveResult) -> std::io::Result<()> {
        for dep in dedup_by_path(&result.dependencies) {
            let out = DepOutput::from_dependency(&dep);
            if self.json {
                self.write_json(&out, false)?;
            } else {
                writeln!(self.writer, "{}", out.path)?;
            }
        }
        Ok(())
    }

    /// List the declarations of a file, one per line.
    pub fn format_outline(&mut self, outline: &SyntaxOutline) -> std::io::Result<()> {
        for sym in &outline.symbols {
            let out = OutlineOutput {
                name: sym.name.clone(),
                kind: sym.kind.to_string(),
                line: sym.range.start.line + 1,
                col: sym.range.start.column + 1,
                end_line: sym.range.end.line + 1,
                scope: sym.scope.clone(),
            };
            if self.json {
                self.write_json(&out, false)?;
                continue;
            }
            let name = match &out.scope {
                Some(scope) => format!("{scope}.{}", out.name),
                None => out.name.clone(),
            };
            writeln!(
                self.writer,
                "{}:{}-{}  {} {}",
                out.line, out.col, out.end_line, out.kind, name
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stderr helpers
// ---------------------------------------------------------------------------

/// Print a hint message to stderr (suppressed when `json` is true).
pub fn print_hint(msg: &str, json: bool) {
    if !json {
        eprintln!("hint: {msg}");
    }
}

/// Print an error message to stderr.
pub fn print_error(msg: &str) {
    eprintln!("error: {msg}");
}

/// Format an error to stderr with structured `error:` / `hint:` lines.
///
/// * Always prints `error: <message>` to stderr.
/// * When `json` is `false` and the error carries a contextual hint, also
///   prints `hint: <suggestion>` to stderr.
/// * Returns the appropriate process exit code.
pub fn format_error(err: &anyhow::Error, json: bool) -> i32 {
    print_error(&format!("{err:#}"));
    match crate::errors::downcast(err) {
        Some(clip) => {
            if let Some(hint) = clip.hint() {
                print_hint(hint, json);
            }
            clip.exit_code()
        }
        None => crate::errors::EXIT_ERROR,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{Lang, parse_source};
    use crate::types::{CodeFragment, DependencyKind};
    use std::path::Path;

    /// Helper: renders output into a String.
    fn render<F>(json: bool, f: F) -> String
    where
        F: FnOnce(&mut Formatter<&mut Vec<u8>>) -> std::io::Result<()>,
    {
        let mut buf = Vec::new();
        {
            let mut fmt = Formatter::new(&mut buf, json);
            f(&mut fmt).unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    fn dep(rel: &str, content: &str) -> Dependency {
        Dependency {
            file_path: Path::new("/w").join(rel),
            content: content.into(),
            relative_path: rel.into(),
            kind: DependencyKind::Import,
            name: None,
        }
    }

    fn sample(errors: Vec<String>) -> ResolveResult {
        let mut target = CodeFragment::whole_file(
            "/w/a.ts",
            "import { b } from './b';\n".into(),
            "typescript",
        );
        target.relative_path = Some("a.ts".into());
        ResolveResult {
            dependencies: vec![
                dep("c.ts", "export const c = 1;\n"),
                dep("b.ts", "export const b = c;\n"),
                dep("c.ts", "export const c = 1;\n"),
            ],
            target_fragment: target,
            errors,
        }
    }

    #[test]
    fn text_format_with_comments() {
        let out = render(false, |fmt| fmt.format_result(&sample(vec![]), "//", true));
        assert_eq!(
            out,
            "// Code with dependencies: a.ts\n\
             // Dependencies: 2\n\
             \n\
             // From: c.ts\n\
             export const c = 1;\n\
             \n\
             // From: b.ts\n\
             export const b = c;\n\
             \n\
             // From: a.ts (target)\n\
             import { b } from './b';\n"
        );
    }

    #[test]
    fn text_format_without_comments_keeps_warnings() {
        let result = sample(vec!["failed to read /w/x.ts: denied".into()]);
        let out = render(false, |fmt| fmt.format_result(&result, "#", false));
        assert!(!out.contains("From:"));
        assert!(!out.contains("Code with dependencies"));
        assert!(out.starts_with("export const c = 1;\n\nexport const b = c;\n\n"));
        assert!(out.ends_with("\n# Warnings:\n# - failed to read /w/x.ts: denied\n"));
    }

    #[test]
    fn json_format_is_deduplicated() {
        let out = render(true, |fmt| fmt.format_result(&sample(vec![]), "//", true));
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        let deps = v["dependencies"].as_array().unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0]["relative_path"], "c.ts");
        assert_eq!(deps[0]["kind"], "import");
        assert_eq!(v["target_fragment"]["kind"], "file");
        assert_eq!(v["target_fragment"]["language"], "typescript");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let deps = vec![dep("x.ts", "first"), dep("y.ts", "y"), dep("x.ts", "second")];
        let out = dedup_by_path(&deps);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content, "first");
    }

    #[test]
    fn dependency_list_marks_locals() {
        let mut result = sample(vec![]);
        result.dependencies.push(Dependency {
            file_path: Dependency::local_path(Path::new("/w/a.ts"), Some("helper")),
            content: "function helper() {}".into(),
            relative_path: "a.ts".into(),
            kind: DependencyKind::Function,
            name: Some("helper".into()),
        });
        let out = render(false, |fmt| fmt.format_dependencies(&result));
        assert_eq!(out, "c.ts\nb.ts\na.ts#local:helper\n");

        let json = render(true, |fmt| fmt.format_dependencies(&result));
        let last: serde_json::Value = serde_json::from_str(json.lines().last().unwrap()).unwrap();
        assert_eq!(last["kind"], "function");
        assert_eq!(last["name"], "helper");
    }

    #[test]
    fn outline_text_and_json() {
        let src = "class Store {\n  add() {}\n}\n";
        let tree = parse_source(Lang::TypeScript, src).unwrap();
        let outline = SyntaxOutline::build(&tree, src, Lang::TypeScript);
        let out = render(false, |fmt| fmt.format_outline(&outline));
        assert_eq!(out, "1:1-3  class Store\n2:3-2  method Store.add\n");

        let json = render(true, |fmt| fmt.format_outline(&outline));
        let first: serde_json::Value = serde_json::from_str(json.lines().next().unwrap()).unwrap();
        assert_eq!(first["name"], "Store");
        assert!(first.get("scope").is_none());
    }
}
