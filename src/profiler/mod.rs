//=====================================================
// File: profiler/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Call-path profiling for the bytecode VM
// Objective: Expose the call tree, instrumentation hooks, clocks, and the
//            profile serialisers as one module
//=====================================================

pub mod clock;
pub mod dump;
mod error;
pub mod hooks;
pub mod tree;

pub use clock::{
    Clock, ClockSource, ManualClock, MonotonicClock, RealtimeClock, SystemClock, Timestamp,
};
pub use dump::{
    DisplayResolver, FunctionResolver, MAX_INDENT_LEVELS, NodeRecord, ProfileReport, ReportNode,
    SourcePosition, TOP_LEVEL_NAME,
};
pub use error::ProfilerError;
pub use hooks::{CallProfiler, ExecutionHooks, NoHooks};
pub use tree::{CallTree, NodeId, ProfileNode};

//=====================================================
// End of file
//=====================================================
