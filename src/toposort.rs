//! Dependency ordering.
//!
//! A depth-first postorder walk over the file graph: every file is emitted
//! after the files it imports. An edge back into a file that is still on
//! the walk stack closes a cycle and is treated as satisfied.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::graph::DependencyGraph;
use crate::types::Dependency;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Order the cached dependencies so that imports precede their importers.
///
/// Graph nodes are walked in insertion order. Nodes without a cache entry
/// (the target file, unreadable files) contribute edges but emit nothing.
/// Cache entries the walk never reaches are appended in cache order.
pub fn topological_order(
    graph: &DependencyGraph,
    cache: &IndexMap<PathBuf, Dependency>,
) -> Vec<Dependency> {
    let mut sorter = Sorter {
        graph,
        cache,
        marks: HashMap::new(),
        out: Vec::with_capacity(cache.len()),
    };

    for node in graph.nodes() {
        sorter.visit(node);
    }

    for (path, dep) in cache {
        if sorter.mark(path) == Mark::Unvisited {
            sorter.marks.insert(path.clone(), Mark::Done);
            sorter.out.push(dep.clone());
        }
    }

    sorter.out
}

struct Sorter<'a> {
    graph: &'a DependencyGraph,
    cache: &'a IndexMap<PathBuf, Dependency>,
    marks: HashMap<PathBuf, Mark>,
    out: Vec<Dependency>,
}

impl Sorter<'_> {
    fn mark(&self, path: &Path) -> Mark {
        self.marks.get(path).copied().unwrap_or(Mark::Unvisited)
    }

    fn visit(&mut self, path: &Path) {
        match self.mark(path) {
            Mark::Done => return,
            Mark::InProgress => {
                tracing::debug!(file = %path.display(), "cycle edge skipped during ordering");
                return;
            }
            Mark::Unvisited => {}
        }

        self.marks.insert(path.to_path_buf(), Mark::InProgress);
        let graph = self.graph;
        for next in graph.edges(path) {
            self.visit(next);
        }
        self.marks.insert(path.to_path_buf(), Mark::Done);

        if let Some(dep) = self.cache.get(path) {
            self.out.push(dep.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DependencyKind;

    fn dep(path: &str) -> Dependency {
        Dependency {
            file_path: PathBuf::from(path),
            content: format!("// {path}\n"),
            relative_path: path.trim_start_matches('/').to_string(),
            kind: DependencyKind::Import,
            name: None,
        }
    }

    fn cache_of(paths: &[&str]) -> IndexMap<PathBuf, Dependency> {
        paths.iter().map(|p| (PathBuf::from(p), dep(p))).collect()
    }

    fn order(deps: &[Dependency]) -> Vec<String> {
        deps.iter()
            .map(|d| d.file_path.to_string_lossy().into_owned())
            .collect()
    }

    fn graph_of(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::default();
        for (from, to) in edges {
            g.ensure_node(Path::new(from));
            g.add_edge(Path::new(from), Path::new(to));
        }
        g
    }

    #[test]
    fn chain_is_emitted_leaves_first() {
        let mut g = graph_of(&[("/a", "/b"), ("/b", "/c")]);
        g.ensure_node(Path::new("/c"));
        let out = topological_order(&g, &cache_of(&["/b", "/c"]));
        assert_eq!(order(&out), vec!["/c", "/b"]);
    }

    #[test]
    fn every_edge_target_precedes_its_source() {
        let edges = [
            ("/app", "/ui"),
            ("/app", "/store"),
            ("/ui", "/util"),
            ("/store", "/util"),
            ("/store", "/api"),
            ("/api", "/util"),
        ];
        let g = graph_of(&edges);
        let out = topological_order(&g, &cache_of(&["/ui", "/store", "/util", "/api"]));
        let pos = |p: &str| order(&out).iter().position(|x| x == p).unwrap();
        for (from, to) in edges {
            if from != "/app" {
                assert!(pos(to) < pos(from), "{to} should precede {from}");
            }
        }
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn cycle_terminates_and_emits_each_once() {
        let g = graph_of(&[("/x", "/y"), ("/y", "/z"), ("/z", "/x")]);
        let out = topological_order(&g, &cache_of(&["/y", "/z", "/x"]));
        let mut names = order(&out);
        assert_eq!(names, vec!["/z", "/y", "/x"]);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn unreached_cache_entries_are_appended() {
        let g = graph_of(&[("/a", "/b")]);
        let out = topological_order(&g, &cache_of(&["/b", "/orphan"]));
        assert_eq!(order(&out), vec!["/b", "/orphan"]);
    }

    #[test]
    fn nodes_without_cache_entries_emit_nothing() {
        let g = graph_of(&[("/target", "/missing")]);
        let out = topological_order(&g, &IndexMap::new());
        assert!(out.is_empty());
    }

    #[test]
    fn empty_graph_yields_cache_order() {
        let out = topological_order(&DependencyGraph::default(), &cache_of(&["/q", "/p"]));
        assert_eq!(order(&out), vec!["/q", "/p"]);
    }
}
