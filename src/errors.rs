//! Application error types and user-facing error formatting.
//!
//! Errors inside a resolution pass are never fatal: they are rendered to
//! strings and collected in [`crate::types::ResolveResult::errors`]. The
//! [`ClipError`] type covers that rendering and the CLI layer, carrying
//! exit codes and hints so that `main()` can print `error:` / `hint:`
//! lines without exposing debug formatting.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Process exit codes.
///
/// * `1` - general runtime error
/// * `2` - usage / argument error (bad CLI invocation)
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

// ---------------------------------------------------------------------------
// Unified application error
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ClipError {
    /// No language plugin handles the fragment's language or extension.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A grammar could not be loaded or a parse produced no tree.
    #[error("parse failed: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A usage / argument error (exit code 2).
    #[error("{0}")]
    Usage(String),
}

impl ClipError {
    /// Return the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClipError::Usage(_) => EXIT_USAGE,
            _ => EXIT_ERROR,
        }
    }

    /// Return an optional human-readable hint that may help the user fix
    /// the problem.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ClipError::UnsupportedLanguage(_) => Some(
                "pass --language with one of: typescript, typescriptreact, javascript, python",
            ),
            ClipError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Some("verify the file or directory exists")
            }
            ClipError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Some("check file permissions")
            }
            ClipError::Usage(_) => Some("run `codeclip --help` for usage"),
            _ => None,
        }
    }
}

/// Find the most specific [`ClipError`] in an anyhow chain, if any.
pub fn downcast(err: &anyhow::Error) -> Option<&ClipError> {
    err.chain().find_map(|e| e.downcast_ref::<ClipError>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_usage() {
        let err = ClipError::Usage("bad flag".into());
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn exit_code_general() {
        let err = ClipError::UnsupportedLanguage("cobol".into());
        assert_eq!(err.exit_code(), EXIT_ERROR);
        let err = ClipError::Parse("no tree".into());
        assert_eq!(err.exit_code(), EXIT_ERROR);
    }

    #[test]
    fn unsupported_language_display() {
        let err = ClipError::UnsupportedLanguage("cobol".into());
        assert_eq!(format!("{err}"), "unsupported language: cobol");
        assert!(err.hint().unwrap().contains("--language"));
    }

    #[test]
    fn hint_io_not_found() {
        let err = ClipError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.hint().unwrap().contains("exists"));
    }

    #[test]
    fn hint_io_permission() {
        let err = ClipError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        ));
        assert!(err.hint().unwrap().contains("permissions"));
    }

    #[test]
    fn hint_none_for_parse() {
        let err = ClipError::Parse("no tree".into());
        assert!(err.hint().is_none());
    }

    #[test]
    fn display_no_debug_formatting() {
        let err = ClipError::Parse("Python parser produced no tree".into());
        let msg = format!("{err}");
        assert_eq!(msg, "parse failed: Python parser produced no tree");
        assert!(!msg.contains("Parse("));
    }

    #[test]
    fn downcast_finds_wrapped_error() {
        let err: anyhow::Error = ClipError::Usage("missing file".into()).into();
        let err = err.context("while parsing arguments");
        let found = downcast(&err).unwrap();
        assert_eq!(found.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn clip_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ClipError = io_err.into();
        assert!(matches!(err, ClipError::Io(_)));
    }
}
