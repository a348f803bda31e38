//! Same-file dependency extraction for TypeScript / JavaScript.
//!
//! Collects the top-level declarations the selected code refers to by
//! name, then closes over what those declarations refer to in turn. The
//! matching is purely lexical: an identifier is a dependency when its text
//! equals a top-level declaration name that is not redeclared inside the
//! code being scanned.
//!
//! When the selection is exactly a named top-level function or class, the
//! statements that use it elsewhere in the file contribute the names they
//! reference too. This usage-context rule is a heuristic that pulls in
//! helpers used alongside the target, not a reachability guarantee.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use tree_sitter::{Node, Tree};

use crate::ecmascript::{has_function_value, is_function_value};
use crate::lang::{named_children, node_text};
use crate::text::LineIndex;
use crate::types::{Dependency, DependencyKind, TextRange, relative_to};

/// Node kinds whose `name` field declares a binding.
const NAMED_DECLARATIONS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_signature",
    "function_expression",
    "function",
    "generator_function",
    "class_declaration",
    "abstract_class_declaration",
    "class",
    "interface_declaration",
    "type_alias_declaration",
    "enum_declaration",
    "module",
    "internal_module",
    "variable_declarator",
    "type_parameter",
];

/// Identifier kinds that can refer to a top-level declaration.
const REFERENCE_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "shorthand_property_identifier",
];

/// A top-level statement that declares at least one name.
#[derive(Debug, Clone, Copy)]
struct TopLevel<'t> {
    /// The statement as it appears at the top level (`export` included).
    statement: Node<'t>,
    /// The declaration inside it.
    declaration: Node<'t>,
}

pub fn extract_local_dependencies(
    tree: &Tree,
    source: &str,
    range: TextRange,
    file: &Path,
    workspace_root: &Path,
) -> Vec<Dependency> {
    let src = source.as_bytes();
    let (start, end) = trimmed_span(source, range);
    let root = tree.root_node();

    let decls: Vec<(TopLevel, Vec<String>)> = named_children(root)
        .into_iter()
        .filter_map(|stmt| unwrap_declaration(stmt))
        .map(|d| {
            let names = declared_names(d.declaration, src);
            (d, names)
        })
        .filter(|(_, names)| !names.is_empty())
        .collect();

    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (i, (_, names)) in decls.iter().enumerate() {
        for name in names {
            by_name.entry(name.clone()).or_insert(i);
        }
    }
    if by_name.is_empty() {
        return Vec::new();
    }

    let mut required = Vec::new();
    let shadowed = declared_within(root, start, end, src);
    for name in references_within(root, start, end, src) {
        if by_name.contains_key(&name) && !shadowed.contains(&name) {
            required.push(name);
        }
    }

    let target = decls.iter().position(|(d, names)| {
        is_callable(d.declaration) && spans(d, start, end) && !names.is_empty()
    });
    if let Some(t) = target {
        let target_name = decls[t].1[0].clone();
        let target_id = decls[t].0.statement.id();
        usage_context(root, &target_name, target_id, &by_name, src, &mut required);
    }

    // Closure over the required names.
    let mut queue: VecDeque<String> = required.into_iter().collect();
    let mut queued: HashSet<String> = queue.iter().cloned().collect();
    let mut included: Vec<usize> = Vec::new();
    while let Some(name) = queue.pop_front() {
        let Some(&i) = by_name.get(&name) else {
            continue;
        };
        if Some(i) == target || included.contains(&i) {
            continue;
        }
        included.push(i);

        let stmt = decls[i].0.statement;
        let own = declared_within(stmt, stmt.start_byte(), stmt.end_byte(), src);
        for r in references_within(stmt, stmt.start_byte(), stmt.end_byte(), src) {
            if by_name.contains_key(&r) && !own.contains(&r) && queued.insert(r.clone()) {
                queue.push_back(r);
            }
        }
    }

    included.sort_by_key(|&i| decls[i].0.statement.start_byte());
    let relative = relative_to(file, workspace_root);
    included
        .into_iter()
        .map(|i| {
            let (decl, names) = &decls[i];
            let name = names.first().map(String::as_str);
            tracing::debug!(name = name.unwrap_or("<anonymous>"), "local dependency");
            Dependency {
                file_path: Dependency::local_path(file, name),
                content: node_text(decl.statement, src).to_string(),
                relative_path: relative.clone(),
                kind: dependency_kind(decl.declaration),
                name: name.map(str::to_string),
            }
        })
        .collect()
}

/// Pull in the names referenced by other top-level statements that use
/// `target_name`.
fn usage_context(
    root: Node,
    target_name: &str,
    target_id: usize,
    by_name: &HashMap<String, usize>,
    src: &[u8],
    required: &mut Vec<String>,
) {
    for stmt in named_children(root) {
        if stmt.id() == target_id || !is_usage_candidate(stmt) {
            continue;
        }
        let (s, e) = (stmt.start_byte(), stmt.end_byte());
        let refs = references_within(stmt, s, e, src);
        let shadowed = declared_within(stmt, s, e, src);
        if shadowed.contains(target_name) || !refs.iter().any(|r| r == target_name) {
            continue;
        }
        for r in refs {
            if r != target_name && by_name.contains_key(&r) && !shadowed.contains(&r) {
                required.push(r);
            }
        }
    }
}

/// Import statements and bare export lists mention names without using
/// them.
fn is_usage_candidate(stmt: Node) -> bool {
    match stmt.kind() {
        "import_statement" | "comment" => false,
        "export_statement" => stmt.child_by_field_name("declaration").is_some(),
        _ => true,
    }
}

/// Byte span of a range with surrounding whitespace removed.
fn trimmed_span(source: &str, range: TextRange) -> (usize, usize) {
    let (mut start, mut end) = LineIndex::new(source).byte_span(range);
    let bytes = source.as_bytes();
    while start < end && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    (start, end)
}

fn spans(d: &TopLevel, start: usize, end: usize) -> bool {
    let exact = |n: Node| n.start_byte() == start && n.end_byte() == end;
    exact(d.statement) || exact(d.declaration)
}

/// Functions, classes and function-valued constants.
fn is_callable(decl: Node) -> bool {
    match decl.kind() {
        "function_declaration"
        | "generator_function_declaration"
        | "class_declaration"
        | "abstract_class_declaration" => true,
        "lexical_declaration" | "variable_declaration" => {
            let declarators: Vec<Node> = named_children(decl)
                .into_iter()
                .filter(|c| c.kind() == "variable_declarator")
                .collect();
            declarators.len() == 1 && has_function_value(decl)
        }
        _ => false,
    }
}

/// The declaration carried by a top-level statement, if any.
fn unwrap_declaration(stmt: Node) -> Option<TopLevel> {
    let declaration = match stmt.kind() {
        "export_statement" => stmt.child_by_field_name("declaration")?,
        "expression_statement" => named_children(stmt)
            .into_iter()
            .find(|c| c.kind() == "internal_module")?,
        "ambient_declaration" => named_children(stmt)
            .into_iter()
            .find(|c| is_declaration_kind(c.kind()))?,
        kind if is_declaration_kind(kind) => stmt,
        _ => return None,
    };
    let declaration = if declaration.kind() == "ambient_declaration" {
        named_children(declaration)
            .into_iter()
            .find(|c| is_declaration_kind(c.kind()))?
    } else {
        declaration
    };
    Some(TopLevel {
        statement: stmt,
        declaration,
    })
}

fn is_declaration_kind(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "generator_function_declaration"
            | "function_signature"
            | "class_declaration"
            | "abstract_class_declaration"
            | "interface_declaration"
            | "type_alias_declaration"
            | "enum_declaration"
            | "lexical_declaration"
            | "variable_declaration"
            | "module"
            | "internal_module"
    )
}

/// Names bound by a top-level declaration.
fn declared_names(decl: Node, src: &[u8]) -> Vec<String> {
    match decl.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut names = Vec::new();
            for declarator in named_children(decl) {
                if declarator.kind() == "variable_declarator"
                    && let Some(pattern) = declarator.child_by_field_name("name")
                {
                    pattern_names(pattern, src, &mut names);
                }
            }
            names
        }
        _ => decl
            .child_by_field_name("name")
            .filter(|n| matches!(n.kind(), "identifier" | "type_identifier" | "nested_identifier"))
            .map(|n| vec![node_text(n, src).to_string()])
            .unwrap_or_default(),
    }
}

fn dependency_kind(decl: Node) -> DependencyKind {
    match decl.kind() {
        "class_declaration" | "abstract_class_declaration" => DependencyKind::Class,
        "interface_declaration" => DependencyKind::Interface,
        "type_alias_declaration" => DependencyKind::Type,
        "enum_declaration" => DependencyKind::Enum,
        "lexical_declaration" | "variable_declaration" => {
            let values: Vec<Node> = named_children(decl)
                .into_iter()
                .filter(|c| c.kind() == "variable_declarator")
                .filter_map(|c| c.child_by_field_name("value"))
                .collect();
            if values.iter().any(|v| is_function_value(v.kind())) {
                DependencyKind::Function
            } else if values.iter().any(|v| v.kind() == "class") {
                DependencyKind::Class
            } else {
                DependencyKind::Constant
            }
        }
        _ => DependencyKind::Function,
    }
}

/// Collect the identifiers bound by a (possibly destructuring) pattern.
pub(crate) fn pattern_names(pattern: Node, src: &[u8], out: &mut Vec<String>) {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            out.push(node_text(pattern, src).to_string());
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            for child in named_children(pattern) {
                pattern_names(child, src, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = pattern.child_by_field_name("value") {
                pattern_names(value, src, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = pattern.child_by_field_name("left") {
                pattern_names(left, src, out);
            }
        }
        _ => {}
    }
}

/// Names declared anywhere inside `[start, end)` of `node`'s subtree.
fn declared_within(node: Node, start: usize, end: usize, src: &[u8]) -> HashSet<String> {
    let mut names = Vec::new();
    walk_declared(node, start, end, src, &mut names);
    names.into_iter().collect()
}

fn walk_declared(node: Node, start: usize, end: usize, src: &[u8], out: &mut Vec<String>) {
    if node.end_byte() <= start || node.start_byte() >= end {
        return;
    }
    let inside = |n: &Node| n.start_byte() >= start && n.end_byte() <= end;
    let mut bound = Vec::new();
    match node.kind() {
        "variable_declarator" => {
            if let Some(p) = node.child_by_field_name("name") {
                pattern_names(p, src, &mut bound);
            }
        }
        "required_parameter" | "optional_parameter" => {
            if let Some(p) = node.child_by_field_name("pattern") {
                pattern_names(p, src, &mut bound);
            }
        }
        "formal_parameters" => {
            for param in named_children(node) {
                pattern_names(param, src, &mut bound);
            }
        }
        "arrow_function" => {
            if let Some(p) = node.child_by_field_name("parameter") {
                pattern_names(p, src, &mut bound);
            }
        }
        "catch_clause" => {
            if let Some(p) = node.child_by_field_name("parameter") {
                pattern_names(p, src, &mut bound);
            }
        }
        "for_in_statement" if node.child_by_field_name("kind").is_some() => {
            if let Some(p) = node.child_by_field_name("left") {
                pattern_names(p, src, &mut bound);
            }
        }
        kind if NAMED_DECLARATIONS.contains(&kind) => {
            if let Some(n) = node.child_by_field_name("name")
                && matches!(n.kind(), "identifier" | "type_identifier")
                && inside(&n)
            {
                out.push(node_text(n, src).to_string());
            }
        }
        _ => {}
    }
    // Parameters and patterns are only bindings when they sit inside the
    // scanned span.
    if inside(&node) {
        out.extend(bound);
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i as u32) {
            walk_declared(child, start, end, src, out);
        }
    }
}

/// Identifier references fully inside `[start, end)`, in source order.
fn references_within(node: Node, start: usize, end: usize, src: &[u8]) -> Vec<String> {
    let mut refs = Vec::new();
    walk_references(node, start, end, src, &mut refs);
    refs
}

fn walk_references(node: Node, start: usize, end: usize, src: &[u8], out: &mut Vec<String>) {
    if node.end_byte() <= start || node.start_byte() >= end {
        return;
    }
    if REFERENCE_KINDS.contains(&node.kind())
        && node.start_byte() >= start
        && node.end_byte() <= end
        && !is_declaration_name(node)
    {
        let text = node_text(node, src);
        if !out.iter().any(|r| r == text) {
            out.push(text.to_string());
        }
        return;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i as u32) {
            walk_references(child, start, end, src, out);
        }
    }
}

/// True when `node` is the name token of the declaration that owns it.
fn is_declaration_name(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    NAMED_DECLARATIONS.contains(&parent.kind())
        && parent
            .child_by_field_name("name")
            .is_some_and(|n| n.id() == node.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{Lang, parse_source};
    use crate::types::Position;
    use std::path::PathBuf;

    fn locals_for(source: &str, range: TextRange) -> Vec<Dependency> {
        let tree = parse_source(Lang::TypeScript, source).unwrap();
        extract_local_dependencies(&tree, source, range, Path::new("/w/src/a.ts"), Path::new("/w"))
    }

    fn names(deps: &[Dependency]) -> Vec<&str> {
        deps.iter().filter_map(|d| d.name.as_deref()).collect()
    }

    /// Range covering the full text of the line that starts with `prefix`
    /// through the line that starts with `end_prefix`.
    fn range_of_lines(source: &str, prefix: &str, end_prefix: &str) -> TextRange {
        let lines: Vec<&str> = source.lines().collect();
        let s = lines.iter().position(|l| l.starts_with(prefix)).unwrap();
        let e = s + lines[s..].iter().position(|l| l.starts_with(end_prefix)).unwrap();
        TextRange::new(Position::new(s, 0), Position::new(e, lines[e].chars().count()))
    }

    #[test]
    fn direct_reference_is_collected() {
        let src = "\
function foo() {
  return bar(1);
}

function bar(n: number) {
  return n + 1;
}

function unrelated() {}
";
        let deps = locals_for(src, range_of_lines(src, "function foo", "}"));
        assert_eq!(names(&deps), vec!["bar"]);
        assert_eq!(deps[0].file_path, PathBuf::from("/w/src/a.ts#local:bar"));
        assert_eq!(deps[0].relative_path, "src/a.ts");
        assert_eq!(deps[0].kind, DependencyKind::Function);
        assert!(deps[0].content.starts_with("function bar"));
    }

    #[test]
    fn usage_context_pulls_in_sibling_helpers() {
        let src = "\
function foo() {
  return bar();
}

function bar() {
  return 1;
}

function baz() {
  return 2;
}

function qux() {
  return 3;
}

export function main() {
  foo();
  baz();
}
";
        let deps = locals_for(src, range_of_lines(src, "function foo", "}"));
        assert_eq!(names(&deps), vec!["bar", "baz"]);
    }

    #[test]
    fn usage_context_requires_exact_declaration_selection() {
        let src = "\
function foo() {
  const x = bar();
  return x;
}

function bar() { return 1; }
function baz() { return 2; }

foo();
baz();
foo(baz());
";
        // Selecting only the body line is not the whole declaration.
        let deps = locals_for(src, range_of_lines(src, "  const x", "  const x"));
        assert_eq!(names(&deps), vec!["bar"]);
    }

    #[test]
    fn second_order_dependencies_are_closed_over() {
        let src = "\
const LIMIT = 10;

interface Options { size: Size }
type Size = number;

function clamp(n: number): number {
  return Math.min(n, LIMIT);
}

function run(opts: Options) {
  return clamp(opts.size);
}
";
        let deps = locals_for(src, range_of_lines(src, "function run", "}"));
        assert_eq!(names(&deps), vec!["LIMIT", "Options", "Size", "clamp"]);
        let kinds: Vec<DependencyKind> = deps.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DependencyKind::Constant,
                DependencyKind::Interface,
                DependencyKind::Type,
                DependencyKind::Function
            ]
        );
    }

    #[test]
    fn local_names_shadow_top_level_declarations() {
        let src = "\
const value = 1;
function helper() { return 2; }

function target(value: number) {
  const helper = () => 3;
  return value + helper();
}
";
        let deps = locals_for(src, range_of_lines(src, "function target", "}"));
        assert!(deps.is_empty(), "got {:?}", names(&deps));
    }

    #[test]
    fn property_names_are_not_references() {
        let src = "\
const size = 3;
const color = 'red';

function paint(obj: any) {
  obj.size = 4;
  return { color: obj.color };
}
";
        let deps = locals_for(src, range_of_lines(src, "function paint", "}"));
        assert!(deps.is_empty(), "got {:?}", names(&deps));
    }

    #[test]
    fn shorthand_properties_are_references() {
        let src = "\
const retries = 3;

function config() {
  return { retries };
}
";
        let deps = locals_for(src, range_of_lines(src, "function config", "}"));
        assert_eq!(names(&deps), vec!["retries"]);
    }

    #[test]
    fn exported_declarations_keep_their_export_keyword() {
        let src = "\
export enum Color { Red, Green }
export class Palette { primary = Color.Red; }

function pick(): Palette {
  return new Palette();
}
";
        let deps = locals_for(src, range_of_lines(src, "function pick", "}"));
        assert_eq!(names(&deps), vec!["Color", "Palette"]);
        assert!(deps[0].content.starts_with("export enum Color"));
        assert_eq!(deps[0].kind, DependencyKind::Enum);
        assert_eq!(deps[1].kind, DependencyKind::Class);
    }

    #[test]
    fn mutual_recursion_terminates() {
        let src = "\
function isEven(n: number): boolean { return n === 0 ? true : isOdd(n - 1); }
function isOdd(n: number): boolean { return n === 0 ? false : isEven(n - 1); }

function check() {
  return isEven(4);
}
";
        let deps = locals_for(src, range_of_lines(src, "function check", "}"));
        assert_eq!(names(&deps), vec!["isEven", "isOdd"]);
    }

    #[test]
    fn target_is_never_its_own_dependency() {
        let src = "\
function fact(n: number): number {
  return n <= 1 ? 1 : n * fact(n - 1);
}
";
        let deps = locals_for(src, range_of_lines(src, "function fact", "}"));
        assert!(deps.is_empty());
    }

    #[test]
    fn destructured_declarations_are_indexed() {
        let src = "\
const { width, height } = { width: 1, height: 2 };

function area() {
  return width * height;
}
";
        let deps = locals_for(src, range_of_lines(src, "function area", "}"));
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name.as_deref(), Some("width"));
        assert_eq!(deps[0].kind, DependencyKind::Constant);
    }

    #[test]
    fn arrow_function_constants_are_functions() {
        let src = "\
const double = (n: number) => n * 2;

function quad(n: number) {
  return double(double(n));
}
";
        let deps = locals_for(src, range_of_lines(src, "function quad", "}"));
        assert_eq!(names(&deps), vec!["double"]);
        assert_eq!(deps[0].kind, DependencyKind::Function);
    }

    #[test]
    fn file_without_declarations_yields_nothing() {
        let src = "console.log('hi');\n";
        let deps = locals_for(src, TextRange::new(Position::new(0, 0), Position::new(0, 5)));
        assert!(deps.is_empty());
    }
}
