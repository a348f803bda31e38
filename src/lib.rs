//! codeclip: extract a code fragment together with the local code it
//! depends on, in dependency order.
//!
//! The engine entry point is [`graph::DependencyResolver::resolve`]; the
//! rest of the crate supplies language plugins, path resolution, fragment
//! and local-dependency extraction, and the command-line front end.

pub mod cli;
pub mod config;
pub mod ecmascript;
pub mod errors;
pub mod fragment;
pub mod graph;
pub mod lang;
pub mod locals;
pub mod logging;
pub mod outline;
pub mod output;
pub mod paths;
pub mod plugin;
pub mod python;
pub mod router;
pub mod text;
pub mod toposort;
pub mod types;

pub use graph::{DependencyGraph, DependencyResolver};
pub use plugin::{LanguagePlugin, PluginRegistry};
pub use types::{
    CodeFragment, Dependency, DependencyKind, FragmentKind, ImportInfo, ImportKind, Position,
    ResolveOptions, ResolveResult, TextRange,
};
