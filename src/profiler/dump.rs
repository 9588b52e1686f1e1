//=====================================================
// File: profiler/dump.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Serialise the call tree for offline analysis
// Objective: Emit the nested dict(...) record format read by the analysis
//            tooling, plus a JSON report for general consumers
//=====================================================

use std::fmt;
use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use super::error::ProfilerError;
use super::tree::{CallTree, NodeId, ProfileNode};

/// Name reported for the synthetic root.
pub const TOP_LEVEL_NAME: &str = "<top level>";

/// Deepest indentation the dump emits. Records nested further stay at this
/// level so output grows linearly with recursion depth.
pub const MAX_INDENT_LEVELS: usize = 32;

/// Prefix that turns a dumped record into a loadable Python assignment.
pub const ASSIGNMENT_PREFIX: &str = "profile = ";

/// Source location of a function's first instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourcePosition {
    pub file: Option<String>,
    pub line: u32,
}

impl SourcePosition {
    pub fn new(file: Option<String>, line: u32) -> Self {
        Self { file, line }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self.file.is_none() && self.line == 0
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (None, 0) => Ok(()),
            (Some(file), 0) => f.write_str(file),
            (Some(file), line) => write!(f, "{file}:{line}"),
            (None, line) => write!(f, "{line}"),
        }
    }
}

/// Interpreter-side lookups the serialiser needs for a function identity.
pub trait FunctionResolver<F> {
    fn function_name(&self, function: &F) -> String;

    /// Position of the function's first instruction, or
    /// [`SourcePosition::unknown`] when it has none.
    fn source_position(&self, function: &F) -> SourcePosition;
}

/// Resolver for identities that already print as their name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayResolver;

impl<F: fmt::Display> FunctionResolver<F> for DisplayResolver {
    fn function_name(&self, function: &F) -> String {
        function.to_string()
    }

    fn source_position(&self, _function: &F) -> SourcePosition {
        SourcePosition::unknown()
    }
}

/// Field values of one dumped record, in wire order minus `children`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub name: String,
    pub pos: String,
    pub calls: u64,
    pub instructions: u64,
    pub nsecs: u64,
}

impl NodeRecord {
    pub fn resolve<F, R>(node: &ProfileNode<F>, resolver: &R) -> Self
    where
        R: FunctionResolver<F> + ?Sized,
    {
        let (name, pos) = match node.function() {
            Some(function) => (
                resolver.function_name(function),
                resolver.source_position(function).to_string(),
            ),
            None => (TOP_LEVEL_NAME.to_string(), String::new()),
        };
        Self {
            name,
            pos,
            calls: node.calls(),
            instructions: node.instructions(),
            nsecs: node.nsecs(),
        }
    }
}

/// Depth-first `dict(...)` rendering of `tree`, children in insertion order.
///
/// `record` maps each node to its field values, so the wire format does not
/// depend on how nodes are stored. The walk keeps its own stack; recursion in
/// the profiled program never recurses here. Indentation is capped at
/// [`MAX_INDENT_LEVELS`].
pub fn write_tree<F, W, M>(tree: &CallTree<F>, out: &mut W, mut record: M) -> std::io::Result<()>
where
    W: Write + ?Sized,
    M: FnMut(&ProfileNode<F>) -> NodeRecord,
{
    let root = tree.root();
    write_open(out, 0, &record(tree.node(root)))?;
    let mut frames: Vec<(NodeId, usize)> = vec![(root, 0)];

    while let Some(frame) = frames.last_mut() {
        let (id, next) = *frame;
        let children = tree.children(id);
        if next < children.len() {
            frame.1 += 1;
            out.write_all(if next == 0 { b"\n" } else { b",\n" })?;
            let child = children[next];
            write_open(out, frames.len(), &record(tree.node(child)))?;
            frames.push((child, 0));
        } else {
            if !children.is_empty() {
                out.write_all(b"\n")?;
                write_indent(out, frames.len() - 1)?;
            }
            out.write_all(b"])")?;
            frames.pop();
        }
    }
    Ok(())
}

/// Render `tree` as a `dict(...)` record, resolving names and positions
/// through `resolver`.
pub fn dump<F, R, W>(tree: &CallTree<F>, resolver: &R, out: &mut W) -> Result<(), ProfilerError>
where
    R: FunctionResolver<F> + ?Sized,
    W: Write + ?Sized,
{
    write_tree(tree, out, |node| NodeRecord::resolve(node, resolver))?;
    out.write_all(b"\n")?;
    out.flush()?;
    tracing::debug!(nodes = tree.len(), "call tree dumped");
    Ok(())
}

/// [`dump`] preceded by `profile = `, the assignment form older tooling
/// imports directly.
pub fn dump_assignment<F, R, W>(
    tree: &CallTree<F>,
    resolver: &R,
    out: &mut W,
) -> Result<(), ProfilerError>
where
    R: FunctionResolver<F> + ?Sized,
    W: Write + ?Sized,
{
    out.write_all(ASSIGNMENT_PREFIX.as_bytes())?;
    dump(tree, resolver, out)
}

pub fn dump_to_string<F, R>(tree: &CallTree<F>, resolver: &R) -> String
where
    R: FunctionResolver<F> + ?Sized,
{
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_tree(tree, &mut buffer, |node| NodeRecord::resolve(node, resolver));
    String::from_utf8_lossy(&buffer).into_owned()
}

fn write_open<W: Write + ?Sized>(
    out: &mut W,
    depth: usize,
    record: &NodeRecord,
) -> std::io::Result<()> {
    write_indent(out, depth)?;
    write!(
        out,
        "dict(name={}, pos={}, calls={}, instructions={}, nsecs={}, children=[",
        quote(&record.name),
        quote(&record.pos),
        record.calls,
        record.instructions,
        record.nsecs
    )
}

fn write_indent<W: Write + ?Sized>(out: &mut W, depth: usize) -> std::io::Result<()> {
    for _ in 0..depth.min(MAX_INDENT_LEVELS) {
        out.write_all(b"    ")?;
    }
    Ok(())
}

/// Single-quoted string literal valid in Python.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            ch if (ch as u32) < 0x20 || ch == '\u{7f}' => {
                quoted.push_str(&format!("\\x{:02x}", ch as u32));
            }
            ch => quoted.push(ch),
        }
    }
    quoted.push('\'');
    quoted
}

/// JSON view of a profile.
///
/// Nodes are listed flat in creation order, root first, and refer to each
/// other by index, so call paths of any depth encode without nesting.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub generated_at: String,
    pub total_nsecs: u64,
    pub total_instructions: u64,
    pub nodes: Vec<ReportNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub name: String,
    pub pos: String,
    pub calls: u64,
    pub instructions: u64,
    pub nsecs: u64,
    pub inclusive_nsecs: u64,
    pub children: Vec<usize>,
}

impl ProfileReport {
    pub fn build<F, R>(tree: &CallTree<F>, resolver: &R) -> Self
    where
        R: FunctionResolver<F> + ?Sized,
    {
        let inclusive = tree.inclusive_nsecs_by_node();
        let mut nodes: Vec<ReportNode> = tree
            .iter()
            .map(|(id, node)| {
                let record = NodeRecord::resolve(node, resolver);
                ReportNode {
                    id: id.index(),
                    parent: None,
                    name: record.name,
                    pos: record.pos,
                    calls: record.calls,
                    instructions: record.instructions,
                    nsecs: record.nsecs,
                    inclusive_nsecs: inclusive[id.index()],
                    children: node.children().iter().map(NodeId::index).collect(),
                }
            })
            .collect();
        for (id, node) in tree.iter() {
            for child in node.children() {
                nodes[child.index()].parent = Some(id.index());
            }
        }

        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            total_nsecs: tree.total_nsecs(),
            total_instructions: tree.total_instructions(),
            nodes,
        }
    }

    /// The top-level record; present for any report built from a tree.
    pub fn root(&self) -> Option<&ReportNode> {
        self.nodes.first()
    }

    pub fn write_json<W: Write>(&self, out: W) -> Result<(), ProfilerError> {
        serde_json::to_writer_pretty(out, self)?;
        Ok(())
    }
}


//=====================================================
// End of file
//=====================================================
