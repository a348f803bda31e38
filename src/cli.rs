use std::path::PathBuf;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use regex::Regex;

use crate::text::LineIndex;
use crate::types::{FragmentKind, Position, TextRange};

/// codeclip - copy code together with the local code it depends on
#[derive(Parser, Debug)]
#[command(name = "codeclip", version, about)]
pub struct Cli {
    /// Workspace root (default: nearest directory with .git, package.json, ...)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Language id to use instead of detecting it from the file extension
    #[arg(long, global = true)]
    pub language: Option<String>,

    /// How many import hops to follow
    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    /// Consider package imports as well as relative ones
    #[arg(long, global = true)]
    pub include_external: bool,

    /// Leave out the header and "From:" comments
    #[arg(long, global = true)]
    pub no_comments: bool,

    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log resolution steps to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a file or fragment followed by everything it depends on
    Copy(CopyArgs),

    /// List the dependencies of a file in emission order
    Deps(DepsArgs),

    /// List the declarations of a file
    Outline(OutlineArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CopyArgs {
    /// File to copy
    pub file: PathBuf,

    /// Selected lines, 1-based: `START[:COL]-END[:COL]`
    #[arg(long, value_parser = parse_line_span, conflicts_with = "at")]
    pub lines: Option<LineSpan>,

    /// Cursor position, 1-based: `LINE[:COL]`; selects the innermost declaration
    #[arg(long, value_parser = parse_cursor)]
    pub at: Option<Position>,

    /// Fragment kind to report when no declaration is found
    #[arg(long, default_value = "selection")]
    pub kind: FragmentKind,
}

#[derive(clap::Args, Debug)]
pub struct DepsArgs {
    /// File to show dependencies for
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct OutlineArgs {
    /// File to outline
    pub file: PathBuf,
}

/// A `--lines` selection, 0-based. Missing columns mean "start of line" for
/// the start and "end of line" for the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start_line: usize,
    pub start_col: Option<usize>,
    pub end_line: usize,
    pub end_col: Option<usize>,
}

impl LineSpan {
    pub fn to_range(self, index: &LineIndex) -> TextRange {
        let end_col = self
            .end_col
            .unwrap_or_else(|| index.line_text(self.end_line).chars().count());
        TextRange::new(
            Position::new(self.start_line, self.start_col.unwrap_or(0)),
            Position::new(self.end_line, end_col),
        )
    }
}

static LINE_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?::(\d+))?(?:-(\d+)(?::(\d+))?)?$").expect("valid regex")
});

static CURSOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?::(\d+))?$").expect("valid regex"));

/// A 1-based number from the command line as a 0-based index.
fn one_based(text: &str, what: &str) -> Result<usize, String> {
    let n: usize = text
        .parse()
        .map_err(|_| format!("{what} out of range: {text}"))?;
    if n == 0 {
        return Err(format!("{what} numbers start at 1"));
    }
    Ok(n - 1)
}

fn parse_line_span(s: &str) -> Result<LineSpan, String> {
    let caps = LINE_SPAN_RE
        .captures(s.trim())
        .ok_or_else(|| format!("expected START[:COL]-END[:COL], got `{s}`"))?;
    let num = |i: usize, what: &str| caps.get(i).map(|m| one_based(m.as_str(), what)).transpose();

    let start_line = num(1, "line")?.unwrap_or(0);
    let start_col = num(2, "column")?;
    let end_line = num(3, "line")?.unwrap_or(start_line);
    let end_col = num(4, "column")?;
    if end_line < start_line {
        return Err(format!("selection ends before it starts: `{s}`"));
    }
    Ok(LineSpan {
        start_line,
        start_col,
        end_line,
        end_col,
    })
}

fn parse_cursor(s: &str) -> Result<Position, String> {
    let caps = CURSOR_RE
        .captures(s.trim())
        .ok_or_else(|| format!("expected LINE[:COL], got `{s}`"))?;
    let line = one_based(&caps[1], "line")?;
    let column = caps
        .get(2)
        .map(|m| one_based(m.as_str(), "column"))
        .transpose()?
        .unwrap_or(0);
    Ok(Position::new(line, column))
}

pub fn parse() -> Cli {
    Cli::parse()
}
