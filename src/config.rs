//! Configuration file parsing, defaults, and merging.
//!
//! Configuration is loaded in layers (last wins):
//! 1. Built-in defaults
//! 2. Global config from `~/.codeclip/config.toml`
//! 3. Per-workspace config from `<workspace_root>/.codeclip/config.toml`
//!
//! Each layer only overrides fields it explicitly sets; absent fields
//! are left at their previous value.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::paths::{ECMASCRIPT_EXTENSIONS, PYTHON_EXTENSIONS};
use crate::types::{DEFAULT_MAX_DEPTH, ResolveOptions};

// ---------------------------------------------------------------------------
// Public config types (fully resolved, no Options)
// ---------------------------------------------------------------------------

/// Top-level configuration, fully resolved with defaults applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub resolve: ResolveConfig,
    pub imports: ImportsConfig,
    pub output: OutputConfig,
}

/// Traversal settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveConfig {
    /// How many import hops to follow from the target file.
    pub max_depth: usize,
    /// Whether package imports are considered at all.
    pub include_external: bool,
    /// Whether provenance comments are written into the output.
    pub include_comments: bool,
}

/// Import path resolution settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportsConfig {
    /// Extensions tried, in order, for TypeScript / JavaScript specifiers.
    pub extensions: Vec<String>,
    /// Extensions tried for Python modules.
    pub python_extensions: Vec<String>,
    /// Path segments marking a specifier as external.
    pub external_dirs: Vec<String>,
}

/// Output / display settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    /// Default output format: `"text"` or `"json"`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            include_external: false,
            include_comments: true,
        }
    }
}

impl Default for ImportsConfig {
    fn default() -> Self {
        Self {
            extensions: ECMASCRIPT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            python_extensions: PYTHON_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            external_dirs: vec!["node_modules".to_string(), "site-packages".to_string()],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Option-based overlay types (for partial deserialization)
// ---------------------------------------------------------------------------

/// Mirror of [`Config`] where every field is `Option`, so we can
/// deserialize a partial TOML file and overlay only the keys that are
/// present.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigOverlay {
    resolve: Option<ResolveOverlay>,
    imports: Option<ImportsOverlay>,
    output: Option<OutputOverlay>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ResolveOverlay {
    max_depth: Option<usize>,
    include_external: Option<bool>,
    include_comments: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ImportsOverlay {
    extensions: Option<Vec<String>>,
    python_extensions: Option<Vec<String>>,
    external_dirs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputOverlay {
    format: Option<String>,
}

// ---------------------------------------------------------------------------
// Merge helpers
// ---------------------------------------------------------------------------

impl Config {
    /// Apply an overlay on top of this config, replacing only the fields
    /// that are `Some` in the overlay.
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(r) = overlay.resolve {
            if let Some(v) = r.max_depth {
                self.resolve.max_depth = v;
            }
            if let Some(v) = r.include_external {
                self.resolve.include_external = v;
            }
            if let Some(v) = r.include_comments {
                self.resolve.include_comments = v;
            }
        }
        if let Some(imp) = overlay.imports {
            if let Some(v) = imp.extensions {
                self.imports.extensions = v.into_iter().map(normalize_extension).collect();
            }
            if let Some(v) = imp.python_extensions {
                self.imports.python_extensions = v.into_iter().map(normalize_extension).collect();
            }
            if let Some(v) = imp.external_dirs {
                self.imports.external_dirs = v;
            }
        }
        if let Some(out) = overlay.output
            && let Some(v) = out.format
        {
            self.output.format = v;
        }
    }

    /// Resolution options for a workspace, taken from the `[resolve]`
    /// section.
    pub fn resolve_options(&self, workspace_root: &Path) -> ResolveOptions {
        ResolveOptions {
            workspace_root: workspace_root.to_path_buf(),
            max_depth: self.resolve.max_depth,
            include_comments: self.resolve.include_comments,
            include_external: self.resolve.include_external,
        }
    }
}

/// Accept `ts` as well as `.ts` in config files.
fn normalize_extension(ext: String) -> String {
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Return the user's home directory.
fn home_dir() -> Option<PathBuf> {
    #[allow(deprecated)]
    std::env::home_dir()
}

/// Parse a TOML string into a [`ConfigOverlay`], producing a clear error
/// message on malformed input.
fn parse_overlay(contents: &str, path: &Path) -> Result<ConfigOverlay> {
    toml::from_str(contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Try to read a config file and parse it as an overlay.
/// Returns `Ok(None)` if the file does not exist.
fn load_overlay(path: &Path) -> Result<Option<ConfigOverlay>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let overlay = parse_overlay(&contents, path)?;
            tracing::debug!(path = %path.display(), "loaded config layer");
            Ok(Some(overlay))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config file {}: {}",
            path.display(),
            e
        )),
    }
}

impl Config {
    /// Load configuration by merging layers:
    /// defaults -> global (`~/.codeclip/config.toml`) -> per-workspace
    /// (`<root>/.codeclip/config.toml`).
    pub fn load(workspace_root: Option<&Path>) -> Result<Config> {
        let global_dir = home_dir().map(|h| h.join(".codeclip"));
        Self::load_with_global_dir(global_dir.as_deref(), workspace_root)
    }

    /// Load config with an explicit global config directory, so tests can
    /// supply a temporary directory instead of the real `~/.codeclip`.
    fn load_with_global_dir(
        global_dir: Option<&Path>,
        workspace_root: Option<&Path>,
    ) -> Result<Config> {
        let mut config = Config::default();

        if let Some(dir) = global_dir {
            let global_path = dir.join("config.toml");
            if let Some(overlay) = load_overlay(&global_path)? {
                config.apply_overlay(overlay);
            }
        }

        if let Some(root) = workspace_root {
            let local_path = root.join(".codeclip").join("config.toml");
            if let Some(overlay) = load_overlay(&local_path)? {
                config.apply_overlay(overlay);
            }
        }

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
