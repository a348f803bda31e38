use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::{Cli, Command, CopyArgs};
use crate::config::Config;
use crate::errors::ClipError;
use crate::graph::DependencyResolver;
use crate::lang::detect_language;
use crate::outline::DeclarationRanges;
use crate::output::Formatter;
use crate::paths::find_workspace_root;
use crate::plugin::{LanguagePlugin, PluginRegistry};
use crate::text::LineIndex;
use crate::types::{CodeFragment, Position, ResolveOptions, TextRange};

/// Settings shared by every subcommand once flags and config are merged.
struct Session {
    file: PathBuf,
    language: String,
    options: ResolveOptions,
    resolver: DependencyResolver,
    json: bool,
}

impl Session {
    fn open(cli: &Cli, file: &Path) -> Result<Self> {
        let file = std::path::absolute(file)
            .with_context(|| format!("invalid path: {}", file.display()))?;
        let root = match &cli.root {
            Some(root) => std::path::absolute(root)
                .with_context(|| format!("invalid root: {}", root.display()))?,
            None => find_workspace_root(&file),
        };
        let config = Config::load(Some(&root))?;

        let mut options = config.resolve_options(&root);
        if let Some(depth) = cli.max_depth {
            options.max_depth = depth;
        }
        if cli.include_external {
            options.include_external = true;
        }
        if cli.no_comments {
            options.include_comments = false;
        }

        let language = cli.language.clone().unwrap_or_else(|| language_id_for(&file));
        tracing::debug!(
            file = %file.display(),
            root = %root.display(),
            language = %language,
            "session"
        );

        Ok(Self {
            file,
            language,
            options,
            resolver: DependencyResolver::new(PluginRegistry::with_config(&config.imports)),
            json: cli.json || config.output.format == "json",
        })
    }

    fn plugin(&self) -> Option<&dyn LanguagePlugin> {
        self.resolver.registry().select(&self.language, &self.file)
    }

    fn require_plugin(&self) -> Result<&dyn LanguagePlugin> {
        self.plugin()
            .ok_or_else(|| ClipError::UnsupportedLanguage(self.language.clone()).into())
    }

    fn read_target(&self) -> Result<String> {
        std::fs::read_to_string(&self.file)
            .map_err(ClipError::from)
            .with_context(|| format!("failed to read {}", self.file.display()))
    }
}

/// Editor-style id for a file, or its bare extension when no language
/// claims it.
fn language_id_for(file: &Path) -> String {
    match detect_language(file) {
        Some(lang) => lang.language_ids()[0].to_string(),
        None => file
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "plaintext".to_string()),
    }
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Copy(args) => {
            let session = Session::open(&cli, &args.file)?;
            run_copy(&session, args)
        }
        Command::Deps(args) => {
            let session = Session::open(&cli, &args.file)?;
            let content = session.read_target()?;
            let fragment = CodeFragment::whole_file(&session.file, content, &session.language);
            let result = session.resolver.resolve(&fragment, &session.options);
            let mut fmt = Formatter::new(std::io::stdout().lock(), session.json);
            fmt.format_dependencies(&result)?;
            Ok(())
        }
        Command::Outline(args) => {
            let session = Session::open(&cli, &args.file)?;
            let plugin = session.require_plugin()?;
            let content = session.read_target()?;
            let outline = plugin.outline(&content).ok_or_else(|| {
                ClipError::Parse(format!("could not parse {}", session.file.display()))
            })?;
            let mut fmt = Formatter::new(std::io::stdout().lock(), session.json);
            fmt.format_outline(&outline)?;
            Ok(())
        }
    }
}

fn run_copy(session: &Session, args: &CopyArgs) -> Result<()> {
    let content = session.read_target()?;
    let fragment = build_fragment(session, args, content)?;
    let result = session.resolver.resolve(&fragment, &session.options);

    let prefix = session.plugin().map(|p| p.comment_prefix()).unwrap_or("//");
    let mut stdout = std::io::stdout().lock();
    let mut fmt = Formatter::new(&mut stdout, session.json);
    fmt.format_result(&result, prefix, session.options.include_comments)?;
    stdout.flush()?;
    Ok(())
}

/// Innermost of the declarations the host reports around `cursor`.
fn innermost_declaration(ranges: &impl DeclarationRanges, cursor: Position) -> Option<TextRange> {
    ranges.declaration_ranges_containing(cursor).pop()
}

fn check_line(session: &Session, index: &LineIndex, line: usize) -> Result<()> {
    if line >= index.line_count() {
        return Err(ClipError::Usage(format!(
            "line {} is past the end of {}",
            line + 1,
            session.file.display()
        ))
        .into());
    }
    Ok(())
}

/// The fragment named by `--lines` / `--at`, or the whole file.
fn build_fragment(session: &Session, args: &CopyArgs, content: String) -> Result<CodeFragment> {
    let index = LineIndex::new(&content);

    let (range, kind) = if let Some(span) = args.lines {
        check_line(session, &index, span.start_line)?;
        (span.to_range(&index), args.kind)
    } else if let Some(cursor) = args.at {
        check_line(session, &index, cursor.line)?;
        let plugin = session.require_plugin()?;
        let symbol = plugin.outline(&content).and_then(|outline| {
            let range = innermost_declaration(&outline, cursor)?;
            let kind = outline.symbol_at(range).map(|s| s.kind.fragment_kind());
            Some((range, kind.unwrap_or(args.kind)))
        });
        match symbol {
            Some(found) => found,
            None => {
                tracing::debug!(line = cursor.line, "no declaration at cursor, using the line");
                let line = TextRange::new(cursor, cursor);
                (index.snap_to_lines(line), args.kind)
            }
        }
    } else {
        return Ok(CodeFragment::whole_file(&session.file, content, &session.language));
    };

    let (start, end) = index.byte_span(range);
    let selected = content[start..end].to_string();
    Ok(CodeFragment::selection(
        &session.file,
        selected,
        range,
        kind,
        &session.language,
    ))
}
