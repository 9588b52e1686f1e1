pub mod config;
pub mod profiler;
pub mod vm;

pub use config::{ConfigError, OutputFormat, ProfilerConfig};
pub use profiler::{
    CallProfiler, CallTree, ExecutionHooks, FunctionResolver, NodeId, ProfileNode, ProfilerError,
    SourcePosition,
};
