//! Diagnostic logging via `tracing`.
//!
//! Log lines go to stderr so stdout carries only the copyable output.
//! Level selection, highest priority first:
//! 1. `--verbose`: debug
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. warnings

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "codeclip=warn";

/// Filter directive forced by the command-line flags, if any.
fn flag_directive(verbose: bool, quiet: bool) -> Option<&'static str> {
    if verbose {
        Some("codeclip=debug")
    } else if quiet {
        Some("codeclip=error")
    } else {
        None
    }
}

fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    match flag_directive(verbose, quiet) {
        Some(directive) => EnvFilter::new(directive),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    }
}

/// Install the global subscriber. Call once, before any logging occurs;
/// later calls are ignored.
pub fn init_logger(verbose: bool, quiet: bool) {
    let ansi = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(ansi)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins_over_quiet() {
        assert_eq!(flag_directive(true, true), Some("codeclip=debug"));
        assert_eq!(flag_directive(false, true), Some("codeclip=error"));
        assert_eq!(flag_directive(false, false), None);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logger(false, true);
        init_logger(true, false);
        tracing::debug!("still running");
    }
}
