//=====================================================
// File: profiler/hooks.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Instrumentation hooks driven by the interpreter loop
// Objective: Track the active call path and attribute every nanosecond and
//            dispatched instruction to exactly one call-tree node
//=====================================================

use std::fmt;

use super::clock::{Clock, MonotonicClock, Timestamp};
use super::tree::{CallTree, NodeId};

/// Events an interpreter reports while it executes bytecode.
///
/// `function_enter` runs before the callee's first instruction,
/// `function_leave` right after it returns, and `instruction_executed` once
/// per dispatch.
pub trait ExecutionHooks<F> {
    fn function_enter(&mut self, function: F);
    fn function_leave(&mut self, function: F);
    fn instruction_executed(&mut self);
}

/// Hooks that record nothing; the VM default when profiling is off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<F> ExecutionHooks<F> for NoHooks {
    #[inline]
    fn function_enter(&mut self, _function: F) {}

    #[inline]
    fn function_leave(&mut self, _function: F) {}

    #[inline]
    fn instruction_executed(&mut self) {}
}

impl<F, H: ExecutionHooks<F> + ?Sized> ExecutionHooks<F> for &mut H {
    fn function_enter(&mut self, function: F) {
        (**self).function_enter(function);
    }

    fn function_leave(&mut self, function: F) {
        (**self).function_leave(function);
    }

    fn instruction_executed(&mut self) {
        (**self).instruction_executed();
    }
}

/// Call-path profiler for one interpreter thread.
///
/// The call stack always holds the root at the bottom. Time between two
/// stack changes goes to whichever node was on top, so nothing is counted
/// twice and no interval is dropped.
pub struct CallProfiler<F, C = MonotonicClock> {
    tree: CallTree<F>,
    stack: Vec<NodeId>,
    clock: C,
    lap_start: Option<Timestamp>,
    clock_failures: u64,
}

impl<F: PartialEq> CallProfiler<F, MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl<F: PartialEq> Default for CallProfiler<F, MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: PartialEq, C: Clock> CallProfiler<F, C> {
    /// Build a profiler and start the first timing window immediately; time
    /// before the first call belongs to the top level.
    pub fn with_clock(clock: C) -> Self {
        let tree = CallTree::new();
        let root = tree.root();
        let mut profiler = Self {
            tree,
            stack: vec![root],
            clock,
            lap_start: None,
            clock_failures: 0,
        };
        profiler.start_lap();
        tracing::debug!("call profiler started");
        profiler
    }

    pub fn on_function_enter(&mut self, function: F) {
        let parent = self.active_node();
        let elapsed = self.time_and_reset_lap();
        self.tree.node_mut(parent).add_nsecs(elapsed);

        let child = self.tree.get_or_create_child(parent, function);
        self.stack.push(child);
        self.tree.node_mut(child).record_call();
    }

    /// Panics when `function` is not the active node's function or when only
    /// the root is left; either means the interpreter's call/return events
    /// are unbalanced.
    pub fn on_function_leave(&mut self, function: F)
    where
        F: fmt::Debug,
    {
        let active = self.active_node();
        let node = self.tree.node(active);
        assert!(
            !node.is_root(),
            "call profiler: leave({function:?}) with no active function"
        );
        assert!(
            node.function() == Some(&function),
            "call profiler: leave({function:?}) does not match active function {:?}",
            node.function()
        );

        let elapsed = self.time_and_reset_lap();
        self.tree.node_mut(active).add_nsecs(elapsed);
        self.stack.pop();
    }

    #[inline]
    pub fn on_instruction_executed(&mut self) {
        let active = self.active_node();
        self.tree.node_mut(active).record_instruction();
    }

    /// Close the current timing window on the active node. Call once the
    /// interpreter is done so trailing top-level time is not lost.
    pub fn finish(&mut self) {
        let active = self.active_node();
        let elapsed = self.time_and_reset_lap();
        self.tree.node_mut(active).add_nsecs(elapsed);
        tracing::debug!(
            nodes = self.tree.len(),
            total_nsecs = self.tree.total_nsecs(),
            total_instructions = self.tree.total_instructions(),
            clock_failures = self.clock_failures,
            "call profiler finished"
        );
    }

    pub fn active_node(&self) -> NodeId {
        // The root is never popped.
        self.stack[self.stack.len() - 1]
    }

    /// Number of entries on the call stack, root included.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn tree(&self) -> &CallTree<F> {
        &self.tree
    }

    pub fn into_tree(self) -> CallTree<F> {
        self.tree
    }

    /// Clock reads that failed and were counted as zero time.
    pub fn clock_failures(&self) -> u64 {
        self.clock_failures
    }

    fn start_lap(&mut self) {
        self.lap_start = self.read_clock();
    }

    /// Time since the last lap, then restart the lap at now. A failed read
    /// reports zero and leaves no lap open, so the gap is skipped rather
    /// than charged to a later node.
    fn time_and_reset_lap(&mut self) -> u64 {
        let now = self.read_clock();
        let elapsed = match (self.lap_start, now) {
            (Some(start), Some(now)) => now.nanos_since(start),
            _ => 0,
        };
        self.lap_start = now;
        elapsed
    }

    fn read_clock(&mut self) -> Option<Timestamp> {
        let now = self.clock.now();
        if now.is_none() {
            if self.clock_failures == 0 {
                tracing::warn!("clock read failed, attributing zero elapsed time");
            }
            self.clock_failures += 1;
        }
        now
    }
}

impl<F: PartialEq + fmt::Debug, C: Clock> ExecutionHooks<F> for CallProfiler<F, C> {
    fn function_enter(&mut self, function: F) {
        self.on_function_enter(function);
    }

    fn function_leave(&mut self, function: F) {
        self.on_function_leave(function);
    }

    fn instruction_executed(&mut self) {
        self.on_instruction_executed();
    }
}

impl<F, C> fmt::Debug for CallProfiler<F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallProfiler")
            .field("nodes", &self.tree.len())
            .field("stack", &self.stack)
            .field("lap_start", &self.lap_start)
            .finish()
    }
}

//=====================================================
// End of file
//=====================================================
