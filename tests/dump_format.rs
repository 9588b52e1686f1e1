//==============================================
// File: tests/dump_format.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Pin down the dict(...) dump format
// Objective: Compare rendered trees against exact expected text
//==============================================

use callgraph_profiler::profiler::dump::{dump, dump_assignment, dump_to_string, write_tree};
use callgraph_profiler::profiler::{
    CallProfiler, CallTree, DisplayResolver, FunctionResolver, MAX_INDENT_LEVELS, ManualClock,
    NodeRecord, ProfileReport, SourcePosition,
};

/// Root with `a` (3 calls, 10 instructions, 500ns) and `b` (1, 2, 100).
fn two_leaf_tree() -> CallTree<&'static str> {
    let clock = ManualClock::new();
    let mut prof = CallProfiler::with_clock(clock.clone());
    for (instructions, nsecs) in [(4, 200), (3, 200), (3, 100)] {
        prof.on_function_enter("a");
        for _ in 0..instructions {
            prof.on_instruction_executed();
        }
        clock.advance(nsecs);
        prof.on_function_leave("a");
    }
    prof.on_function_enter("b");
    prof.on_instruction_executed();
    prof.on_instruction_executed();
    clock.advance(100);
    prof.on_function_leave("b");
    prof.finish();
    prof.into_tree()
}

struct Positions;

impl FunctionResolver<&'static str> for Positions {
    fn function_name(&self, function: &&'static str) -> String {
        format!("mod::{function}")
    }

    fn source_position(&self, function: &&'static str) -> SourcePosition {
        match *function {
            "a" => SourcePosition::new(Some("lib.svs".into()), 12),
            _ => SourcePosition::unknown(),
        }
    }
}

#[test]
fn two_children_render_in_insertion_order() {
    let text = dump_to_string(&two_leaf_tree(), &DisplayResolver);
    let expected = "\
dict(name='<top level>', pos='', calls=0, instructions=0, nsecs=0, children=[
    dict(name='a', pos='', calls=3, instructions=10, nsecs=500, children=[]),
    dict(name='b', pos='', calls=1, instructions=2, nsecs=100, children=[])
])";
    assert_eq!(text, expected);
}

#[test]
fn nested_children_are_indented_and_closed() {
    let mut prof = CallProfiler::with_clock(ManualClock::new());
    prof.on_function_enter("main");
    prof.on_function_enter("fib");
    prof.on_function_enter("fib");
    prof.on_function_leave("fib");
    prof.on_function_leave("fib");
    prof.on_function_enter("log");
    prof.on_function_leave("log");
    prof.on_function_leave("main");

    let text = dump_to_string(prof.tree(), &DisplayResolver);
    let expected = "\
dict(name='<top level>', pos='', calls=0, instructions=0, nsecs=0, children=[
    dict(name='main', pos='', calls=1, instructions=0, nsecs=0, children=[
        dict(name='fib', pos='', calls=1, instructions=0, nsecs=0, children=[
            dict(name='fib', pos='', calls=1, instructions=0, nsecs=0, children=[])
        ]),
        dict(name='log', pos='', calls=1, instructions=0, nsecs=0, children=[])
    ])
])";
    assert_eq!(text, expected);
}

#[test]
fn resolver_supplies_names_and_positions() {
    let text = dump_to_string(&two_leaf_tree(), &Positions);
    assert!(
        text.contains("dict(name='mod::a', pos='lib.svs:12', calls=3"),
        "unexpected dump: {text}"
    );
    assert!(text.contains("dict(name='mod::b', pos='', calls=1"), "unexpected dump: {text}");
}

#[test]
fn record_fields_keep_wire_order() {
    let text = dump_to_string(&two_leaf_tree(), &DisplayResolver);
    let first_record = text.lines().nth(1).expect("child line");
    let mut last = 0;
    for key in ["name=", "pos=", "calls=", "instructions=", "nsecs=", "children="] {
        let at = first_record.find(key).expect("key present");
        assert!(at >= last, "{key} out of order in {first_record}");
        last = at;
    }
}

#[test]
fn custom_mapping_drives_the_same_walk() {
    let tree = two_leaf_tree();
    let mut out = Vec::new();
    write_tree(&tree, &mut out, |node| NodeRecord {
        name: node.function().map(|f| f.to_uppercase()).unwrap_or_default(),
        pos: String::new(),
        calls: node.calls(),
        instructions: 0,
        nsecs: 0,
    })
    .expect("write tree");
    let text = String::from_utf8(out).expect("utf8 dump");
    assert!(text.starts_with("dict(name='', "));
    assert!(text.contains("dict(name='A', pos='', calls=3, instructions=0, nsecs=0"));
}

#[test]
fn dump_writes_trailing_newline_and_prefix() {
    let tree = two_leaf_tree();
    let mut plain = Vec::new();
    dump(&tree, &DisplayResolver, &mut plain).expect("dump");
    let plain = String::from_utf8(plain).expect("utf8");
    assert!(plain.starts_with("dict("));
    assert!(plain.ends_with("])\n"));

    let mut assigned = Vec::new();
    dump_assignment(&tree, &DisplayResolver, &mut assigned).expect("dump assignment");
    let assigned = String::from_utf8(assigned).expect("utf8");
    assert_eq!(assigned, format!("profile = {plain}"));
}

#[test]
fn json_report_mirrors_tree() {
    let tree = two_leaf_tree();
    let report = ProfileReport::build(&tree, &DisplayResolver);
    assert_eq!(report.total_nsecs, 600);
    assert_eq!(report.total_instructions, 12);
    let root = report.root().expect("root record");
    assert_eq!(root.inclusive_nsecs, 600);
    assert_eq!(root.parent, None);
    assert_eq!(root.children, vec![1, 2]);

    let mut out = Vec::new();
    report.write_json(&mut out).expect("write json");
    let value: serde_json::Value = serde_json::from_slice(&out).expect("parse json");
    let nodes = value["nodes"].as_array().expect("nodes array");
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0]["name"], "<top level>");
    assert_eq!(nodes[1]["name"], "a");
    assert_eq!(nodes[1]["parent"], 0);
    assert_eq!(nodes[1]["calls"], 3);
    assert_eq!(nodes[1]["instructions"], 10);
    assert_eq!(nodes[1]["nsecs"], 500);
    assert_eq!(nodes[2]["name"], "b");
    assert!(nodes[2]["children"].as_array().expect("leaf children").is_empty());
}

/// A single function recursing `depth` times: root -> 1 -> 1 -> ... -> 1.
fn deep_recursion(depth: usize) -> CallTree<u32> {
    let clock = ManualClock::new();
    let mut prof = CallProfiler::with_clock(clock.clone());
    for _ in 0..depth {
        prof.on_function_enter(1);
        prof.on_instruction_executed();
        clock.advance(1);
    }
    for _ in 0..depth {
        prof.on_function_leave(1);
    }
    prof.finish();
    prof.into_tree()
}

#[test]
fn json_report_handles_very_deep_recursion() {
    const DEPTH: usize = 50_000;
    let tree = deep_recursion(DEPTH);
    let report = ProfileReport::build(&tree, &DisplayResolver);
    assert_eq!(report.nodes.len(), DEPTH + 1);
    assert_eq!(report.root().expect("root").inclusive_nsecs, DEPTH as u64);
    let deepest = report.nodes.last().expect("deepest record");
    assert_eq!(deepest.parent, Some(DEPTH - 1));
    assert_eq!(deepest.inclusive_nsecs, 1);
    assert_eq!(report.nodes[DEPTH / 2].inclusive_nsecs, (DEPTH / 2 + 1) as u64);

    let mut out = Vec::new();
    report.write_json(&mut out).expect("write json");
    let value: serde_json::Value = serde_json::from_slice(&out).expect("parse json");
    assert_eq!(value["nodes"].as_array().expect("nodes").len(), DEPTH + 1);
}

#[test]
fn deep_dump_indentation_is_capped() {
    const DEPTH: usize = 20_000;
    let text = dump_to_string(&deep_recursion(DEPTH), &DisplayResolver);
    let widest = text
        .lines()
        .map(|line| line.len() - line.trim_start().len())
        .max()
        .expect("dump lines");
    assert_eq!(widest, 4 * MAX_INDENT_LEVELS);
    // One opening line per record and one closing line per non-leaf record.
    assert_eq!(text.lines().count(), 2 * DEPTH + 1);
    assert!(text.len() < (DEPTH + 1) * 400, "dump grew to {} bytes", text.len());
}
