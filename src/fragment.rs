//! Fragment extraction: the smallest declaration around a selection.
//!
//! The descent prunes every subtree that does not overlap the selection
//! and keeps the smallest declaration node spanning all of it. The match
//! is rejected in favour of the literal, line-snapped selection when it is
//! the whole source unit, when no declaration contains the selection, or
//! when it covers more than [`MAX_FRAGMENT_SHARE`] of the file.

use serde::Serialize;
use tree_sitter::{Node, Tree};

use crate::text::LineIndex;
use crate::types::{FragmentKind, TextRange};

/// Largest share of the file a declaration may cover and still count as
/// a fragment.
pub const MAX_FRAGMENT_SHARE: f64 = 0.8;

/// Classifies a syntax node: `Some(kind)` for declarations, `None` for
/// everything else. [`FragmentKind::Selection`] marks a declaration with
/// no more specific kind.
pub type DeclarationClassifier = fn(Node) -> Option<FragmentKind>;

/// The text chosen to stand for the user's target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedFragment {
    pub content: String,
    pub range: TextRange,
    pub kind: FragmentKind,
}

impl ExtractedFragment {
    /// The literal selection widened to whole lines.
    pub fn literal(source: &str, range: TextRange, kind: FragmentKind) -> Self {
        let index = LineIndex::new(source);
        Self {
            content: index.line_snapped_text(range),
            range: index.snap_to_lines(range),
            kind,
        }
    }
}

/// Find the fragment for `range` in a parsed tree. Pass `None` when the
/// source failed to parse to get the literal fallback.
pub fn extract_fragment(
    source: &str,
    tree: Option<&Tree>,
    range: TextRange,
    requested: FragmentKind,
    classify: DeclarationClassifier,
) -> ExtractedFragment {
    let Some(tree) = tree else {
        return ExtractedFragment::literal(source, range, requested);
    };
    let index = LineIndex::new(source);
    let (start, end) = index.byte_span(range);
    let root = tree.root_node();

    let mut best: Option<Node> = None;
    find_smallest(root, start, end, classify, &mut best);

    let Some(node) = best else {
        tracing::debug!(%range, "no declaration contains the selection");
        return ExtractedFragment::literal(source, range, requested);
    };
    if node.id() == root.id()
        || (node.start_byte() <= root.start_byte() && node.end_byte() >= root.end_byte())
    {
        return ExtractedFragment::literal(source, range, requested);
    }
    let span = source[node.start_byte()..node.end_byte()].chars().count();
    let total = source.chars().count();
    if span as f64 > total as f64 * MAX_FRAGMENT_SHARE {
        tracing::debug!(
            kind = node.kind(),
            span,
            total,
            "declaration covers most of the file, keeping the selection"
        );
        return ExtractedFragment::literal(source, range, requested);
    }

    let kind = match classify(node) {
        Some(FragmentKind::Selection) | None => requested,
        Some(k) => k,
    };
    ExtractedFragment {
        content: source[node.start_byte()..node.end_byte()].to_string(),
        range: index.range_of(node.start_byte(), node.end_byte()),
        kind,
    }
}

fn find_smallest<'t>(
    node: Node<'t>,
    start: usize,
    end: usize,
    classify: DeclarationClassifier,
    best: &mut Option<Node<'t>>,
) {
    if node.end_byte() < start || node.start_byte() > end {
        return;
    }
    if node.start_byte() <= start && node.end_byte() >= end && classify(node).is_some() {
        let span = node.end_byte() - node.start_byte();
        let smaller = best
            .map(|b| span < b.end_byte() - b.start_byte())
            .unwrap_or(true);
        if smaller {
            *best = Some(node);
        }
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i as u32) {
            find_smallest(child, start, end, classify, best);
        }
    }
}
