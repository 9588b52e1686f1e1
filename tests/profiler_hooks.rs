//==============================================
// File: tests/profiler_hooks.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Exercise the enter/leave/instruction hooks directly
// Objective: Validate call-path keying, counters, and exclusive timing
//==============================================

use callgraph_profiler::profiler::{CallProfiler, ManualClock};

fn profiler() -> (CallProfiler<&'static str, ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    (CallProfiler::with_clock(clock.clone()), clock)
}

#[test]
fn balanced_sequence_restores_stack_depth() {
    let (mut prof, _clock) = profiler();
    let before = prof.stack_depth();
    prof.on_function_enter("f");
    prof.on_function_enter("g");
    prof.on_function_enter("g");
    assert_eq!(prof.stack_depth(), before + 3);
    prof.on_function_leave("g");
    prof.on_function_leave("g");
    prof.on_function_enter("h");
    prof.on_function_leave("h");
    prof.on_function_leave("f");
    assert_eq!(prof.stack_depth(), before);
    assert_eq!(prof.active_node(), prof.tree().root());
}

#[test]
fn repeated_calls_share_one_node() {
    let (mut prof, _clock) = profiler();
    prof.on_function_enter("main");
    for _ in 0..4 {
        prof.on_function_enter("helper");
        prof.on_function_leave("helper");
    }
    prof.on_function_leave("main");

    let tree = prof.tree();
    let main = tree.find_path(&["main"]).expect("main path");
    assert_eq!(tree.children(main).len(), 1, "helper must not be duplicated");
    let helper = tree.find_path(&["main", "helper"]).expect("helper path");
    assert_eq!(tree.node(helper).calls(), 4);
    assert_eq!(tree.node(main).calls(), 1);
}

#[test]
fn distinct_paths_to_same_function_are_separate_nodes() {
    let (mut prof, _clock) = profiler();
    prof.on_function_enter("f");
    prof.on_function_enter("g");
    prof.on_function_leave("g");
    prof.on_function_leave("f");
    prof.on_function_enter("g");
    prof.on_function_enter("f");
    prof.on_function_leave("f");
    prof.on_function_leave("g");

    let tree = prof.tree();
    let fg = tree.find_path(&["f", "g"]).expect("f -> g");
    let gf = tree.find_path(&["g", "f"]).expect("g -> f");
    assert_ne!(fg, gf);
    assert_eq!(tree.node(fg).calls(), 1);
    assert_eq!(tree.node(gf).calls(), 1);
    assert_eq!(tree.children(tree.root()).len(), 2);
}

#[test]
fn recursion_nests_under_the_caller() {
    let (mut prof, _clock) = profiler();
    prof.on_function_enter("f");
    prof.on_function_enter("f");
    prof.on_function_leave("f");
    prof.on_function_leave("f");

    let tree = prof.tree();
    let root = tree.root();
    assert_eq!(tree.children(root).len(), 1);
    let outer = tree.find_path(&["f"]).expect("root -> f");
    let inner = tree.find_path(&["f", "f"]).expect("root -> f -> f");
    assert_eq!(tree.children(outer), &[inner]);
    assert_eq!(tree.node(outer).calls(), 1);
    assert_eq!(tree.node(inner).calls(), 1);
    assert!(tree.children(inner).is_empty());
}

#[test]
fn elapsed_time_is_attributed_exclusively() {
    let (mut prof, clock) = profiler();
    clock.advance(5); // top level
    prof.on_function_enter("f");
    clock.advance(100);
    prof.on_function_enter("g");
    clock.advance(40);
    prof.on_function_leave("g");
    clock.advance(7);
    prof.on_function_leave("f");
    clock.advance(3);
    prof.finish();

    let tree = prof.tree();
    let f = tree.find_path(&["f"]).expect("f");
    let g = tree.find_path(&["f", "g"]).expect("g");
    assert_eq!(tree.node(tree.root()).nsecs(), 8);
    assert_eq!(tree.node(f).nsecs(), 107);
    assert_eq!(tree.node(g).nsecs(), 40);
    assert_eq!(tree.inclusive_nsecs(f), 147);
    assert_eq!(tree.total_nsecs(), clock.elapsed());
}

#[test]
fn total_time_matches_clock_span_for_long_runs() {
    let (mut prof, clock) = profiler();
    let names = ["a", "b", "c"];
    for round in 0..30u64 {
        let name = names[(round % 3) as usize];
        prof.on_function_enter(name);
        clock.advance(round * 11 + 1);
        prof.on_function_enter("leaf");
        clock.advance(1_000_000_000 + round);
        prof.on_function_leave("leaf");
        clock.advance(2);
        prof.on_function_leave(name);
        clock.advance(round);
    }
    prof.finish();
    assert_eq!(prof.tree().total_nsecs(), clock.elapsed());
}

#[test]
fn instructions_land_on_active_node_only() {
    let (mut prof, _clock) = profiler();
    prof.on_instruction_executed();
    prof.on_function_enter("f");
    prof.on_instruction_executed();
    prof.on_instruction_executed();
    prof.on_function_enter("g");
    for _ in 0..5 {
        prof.on_instruction_executed();
    }
    prof.on_function_leave("g");
    prof.on_instruction_executed();
    prof.on_function_leave("f");

    let tree = prof.tree();
    let f = tree.find_path(&["f"]).expect("f");
    let g = tree.find_path(&["f", "g"]).expect("g");
    assert_eq!(tree.node(tree.root()).instructions(), 1);
    assert_eq!(tree.node(f).instructions(), 3);
    assert_eq!(tree.node(g).instructions(), 5);
    assert_eq!(tree.total_instructions(), 9);
    assert_eq!(tree.inclusive_instructions(f), 8);
}

#[test]
fn instruction_counting_does_not_touch_timing() {
    let (mut prof, clock) = profiler();
    prof.on_function_enter("f");
    clock.advance(50);
    prof.on_instruction_executed();
    clock.advance(50);
    prof.on_function_leave("f");
    let f = prof.tree().find_path(&["f"]).expect("f");
    assert_eq!(prof.tree().node(f).nsecs(), 100);
}

#[test]
fn failed_clock_reads_degrade_to_zero() {
    let (mut prof, clock) = profiler();
    prof.on_function_enter("f");
    clock.advance(10);
    clock.set_available(false);
    prof.on_function_enter("g");
    clock.advance(500);
    prof.on_instruction_executed();
    clock.set_available(true);
    prof.on_function_leave("g");
    clock.advance(20);
    prof.on_function_leave("f");

    let tree = prof.tree();
    let f = tree.find_path(&["f"]).expect("f");
    let g = tree.find_path(&["f", "g"]).expect("g");
    assert_eq!(tree.node(f).nsecs(), 20, "window before the failed read is dropped");
    assert_eq!(tree.node(g).nsecs(), 0);
    assert_eq!(tree.node(g).instructions(), 1, "counts stay valid without a clock");
    assert_eq!(prof.clock_failures(), 1);
}

#[test]
#[should_panic(expected = "does not match active function")]
fn mismatched_leave_is_fatal() {
    let (mut prof, _clock) = profiler();
    prof.on_function_enter("f");
    prof.on_function_enter("g");
    prof.on_function_leave("f");
}

#[test]
#[should_panic(expected = "no active function")]
fn leave_at_top_level_is_fatal() {
    let (mut prof, _clock) = profiler();
    prof.on_function_leave("f");
}
