pub mod bytecode;
pub mod errors;
pub mod instruction;
pub mod stack_vm;
pub mod value;

use std::sync::Arc;

use crate::profiler::{CallProfiler, Clock};

pub use bytecode::{FunctionId, VmBytecode, VmConstant, VmFunction};
pub use errors::{VmError, VmResult};
pub use instruction::{Instruction, Opcode};
pub use stack_vm::StackVm;
pub use value::Value;

/// Outcome of a profiled run: the program's result and the finished profile.
#[derive(Debug)]
pub struct ProfiledRun<C> {
    pub result: VmResult<Value>,
    pub profiler: CallProfiler<FunctionId, C>,
}

/// Execute `program` from its entry point under a fresh call profiler.
///
/// The profile is returned even when the program fails; the VM keeps the
/// profiler's call stack balanced across errors.
pub fn run_profiled<C: Clock>(
    program: Arc<VmBytecode>,
    clock: C,
    max_call_depth: usize,
) -> ProfiledRun<C> {
    let profiler = CallProfiler::with_clock(clock);
    let mut vm = StackVm::with_hooks(program, profiler).with_max_call_depth(max_call_depth);
    let result = vm.execute();
    let mut profiler = vm.into_hooks();
    profiler.finish();
    if let Err(err) = &result {
        tracing::debug!(error = %err, "profiled program failed");
    }
    ProfiledRun { result, profiler }
}
