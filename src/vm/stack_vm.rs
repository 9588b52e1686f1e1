use std::sync::Arc;

use crate::config::DEFAULT_MAX_CALL_DEPTH;
use crate::profiler::{ExecutionHooks, NoHooks};

use super::bytecode::{FunctionId, VmBytecode, VmConstant, VmFunction};
use super::errors::{VmError, VmResult};
use super::instruction::Opcode;
use super::value::Value;

/// Stack interpreter that reports calls, returns, and dispatches to `H`.
pub struct StackVm<H = NoHooks> {
    bytecode: Arc<VmBytecode>,
    stack: Vec<Value>,
    hooks: H,
    depth: usize,
    max_call_depth: usize,
}

impl StackVm<NoHooks> {
    pub fn new(bytecode: Arc<VmBytecode>) -> Self {
        Self::with_hooks(bytecode, NoHooks)
    }
}

impl<H: ExecutionHooks<FunctionId>> StackVm<H> {
    pub fn with_hooks(bytecode: Arc<VmBytecode>, hooks: H) -> Self {
        Self {
            bytecode,
            stack: Vec::new(),
            hooks,
            depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn into_hooks(self) -> H {
        self.hooks
    }

    pub fn execute(&mut self) -> VmResult<Value> {
        let entry = FunctionId::new(self.bytecode.entry);
        self.call_function(entry, Vec::new())
    }

    /// Run `function` to completion. The leave hook fires even when the
    /// callee fails, keeping the hook's view of the call stack balanced.
    pub fn call_function(&mut self, function: FunctionId, args: Vec<Value>) -> VmResult<Value> {
        let bytecode = Arc::clone(&self.bytecode);
        let body = bytecode
            .function(function)
            .ok_or(VmError::InvalidFunction(function.index()))?;
        if args.len() != usize::from(body.arity) {
            return Err(VmError::ArityMismatch {
                name: body.name.clone(),
                expected: body.arity,
                received: args.len(),
            });
        }
        if self.depth >= self.max_call_depth {
            return Err(VmError::StackOverflow(self.max_call_depth));
        }

        self.hooks.function_enter(function);
        self.depth += 1;
        let result = self.run_function(body, args);
        self.depth -= 1;
        self.hooks.function_leave(function);
        result
    }

    fn run_function(&mut self, function: &VmFunction, args: Vec<Value>) -> VmResult<Value> {
        let mut locals = vec![Value::Null; usize::from(function.locals.max(function.arity))];
        for (slot, arg) in locals.iter_mut().zip(args) {
            *slot = arg;
        }

        let mut ip = 0usize;
        while ip < function.instructions.len() {
            let instruction = &function.instructions[ip];
            self.hooks.instruction_executed();
            match instruction.opcode {
                Opcode::Nop => {}
                Opcode::LoadConst => {
                    let value = self
                        .bytecode
                        .constants
                        .get(instruction.operand_a as usize)
                        .cloned()
                        .unwrap_or(VmConstant::Null)
                        .into();
                    self.stack.push(value);
                }
                Opcode::LoadVar => {
                    let value = locals
                        .get(instruction.operand_a as usize)
                        .cloned()
                        .unwrap_or(Value::Null);
                    self.stack.push(value);
                }
                Opcode::StoreVar => {
                    let value = self.pop();
                    if let Some(slot) = locals.get_mut(instruction.operand_a as usize) {
                        *slot = value;
                    }
                }
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                    let rhs = self.pop();
                    let lhs = self.pop();
                    let value = execute_arithmetic(instruction.opcode, lhs, rhs)?;
                    self.stack.push(value);
                }
                Opcode::Neg => {
                    let value = self.pop();
                    self.stack.push(negate_value(value)?);
                }
                Opcode::Not => {
                    let value = self.pop();
                    self.stack.push(Value::Boolean(!value.is_truthy()));
                }
                Opcode::Pop => {
                    self.stack.pop();
                }
                Opcode::Jump => {
                    ip = instruction.operand_a as usize;
                    continue;
                }
                Opcode::JumpIfFalse => {
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        ip = instruction.operand_a as usize;
                        continue;
                    }
                }
                Opcode::Equal
                | Opcode::NotEqual
                | Opcode::Less
                | Opcode::LessEqual
                | Opcode::Greater
                | Opcode::GreaterEqual => {
                    let rhs = self.pop();
                    let lhs = self.pop();
                    let value = execute_comparison(instruction.opcode, lhs, rhs)?;
                    self.stack.push(value);
                }
                Opcode::And | Opcode::Or => {
                    let rhs = self.pop();
                    let lhs = self.pop();
                    self.stack.push(execute_logical(instruction.opcode, lhs, rhs));
                }
                Opcode::LoadFunction => {
                    self.stack
                        .push(Value::Function(FunctionId::new(instruction.operand_a as usize)));
                }
                Opcode::Call => {
                    let callee = FunctionId::new(instruction.operand_a as usize);
                    let call_args = self.pop_args(instruction.operand_b as usize);
                    let result = self.call_function(callee, call_args)?;
                    self.stack.push(result);
                }
                Opcode::CallIndirect => {
                    let call_args = self.pop_args(instruction.operand_a as usize);
                    let callee = match self.pop() {
                        Value::Function(id) => id,
                        other => return Err(VmError::NotCallable(other.to_string())),
                    };
                    let result = self.call_function(callee, call_args)?;
                    self.stack.push(result);
                }
                Opcode::CallBuiltin => {
                    let name_index = instruction.operand_a as usize;
                    let call_args = self.pop_args(instruction.operand_b as usize);
                    let name = match self.bytecode.constants.get(name_index) {
                        Some(VmConstant::String(value)) => value.as_str(),
                        _ => return Err(VmError::InvalidBuiltinName(name_index)),
                    };
                    let result = invoke_builtin(name, &call_args)?;
                    self.stack.push(result);
                }
                Opcode::Return => {
                    return Ok(self.pop());
                }
            }
            ip += 1;
        }
        Ok(Value::Null)
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Null)
    }

    fn pop_args(&mut self, count: usize) -> Vec<Value> {
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.pop());
        }
        args.reverse();
        args
    }
}

fn invoke_builtin(name: &str, args: &[Value]) -> VmResult<Value> {
    match name {
        "print" => {
            let payload = args.first().map(Value::to_string).unwrap_or_default();
            print!("{payload}");
            Ok(Value::Null)
        }
        "println" => {
            let payload = args.first().map(Value::to_string).unwrap_or_default();
            println!("{payload}");
            Ok(Value::Null)
        }
        other => Err(VmError::UnknownBuiltin(other.to_string())),
    }
}

fn execute_arithmetic(opcode: Opcode, lhs: Value, rhs: Value) -> VmResult<Value> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => execute_integer_arithmetic(opcode, a, b),
        (Value::Float(a), Value::Float(b)) => execute_float_arithmetic(opcode, a, b),
        (Value::Integer(a), Value::Float(b)) => execute_float_arithmetic(opcode, a as f64, b),
        (Value::Float(a), Value::Integer(b)) => execute_float_arithmetic(opcode, a, b as f64),
        (Value::String(a), Value::String(b)) if opcode == Opcode::Add => {
            Ok(Value::String(a + &b))
        }
        other => Err(VmError::TypeError(format!(
            "unsupported operands for arithmetic: {other:?}"
        ))),
    }
}

fn execute_integer_arithmetic(opcode: Opcode, lhs: i64, rhs: i64) -> VmResult<Value> {
    use Opcode::*;
    let value = match opcode {
        Add => lhs.checked_add(rhs),
        Sub => lhs.checked_sub(rhs),
        Mul => lhs.checked_mul(rhs),
        Div => {
            if rhs == 0 {
                return Err(VmError::DivisionByZero("integer division"));
            }
            lhs.checked_div(rhs)
        }
        Mod => {
            if rhs == 0 {
                return Err(VmError::DivisionByZero("integer modulo"));
            }
            lhs.checked_rem(rhs)
        }
        _ => return Err(VmError::TypeError("unsupported integer opcode".into())),
    };
    value.map(Value::Integer).ok_or(VmError::Overflow)
}

fn execute_float_arithmetic(opcode: Opcode, lhs: f64, rhs: f64) -> VmResult<Value> {
    use Opcode::*;
    match opcode {
        Add => Ok(Value::Float(lhs + rhs)),
        Sub => Ok(Value::Float(lhs - rhs)),
        Mul => Ok(Value::Float(lhs * rhs)),
        Div | Mod => {
            if rhs == 0.0 {
                Err(VmError::DivisionByZero("float division"))
            } else if opcode == Div {
                Ok(Value::Float(lhs / rhs))
            } else {
                Ok(Value::Float(lhs % rhs))
            }
        }
        _ => Err(VmError::TypeError("unsupported float opcode".into())),
    }
}

fn negate_value(value: Value) -> VmResult<Value> {
    match value {
        Value::Integer(v) => v.checked_neg().map(Value::Integer).ok_or(VmError::Overflow),
        Value::Float(v) => Ok(Value::Float(-v)),
        other => Err(VmError::TypeError(format!(
            "negation not supported for value: {other:?}"
        ))),
    }
}

fn execute_comparison(opcode: Opcode, lhs: Value, rhs: Value) -> VmResult<Value> {
    use Opcode::*;
    match opcode {
        Equal => Ok(Value::Boolean(lhs == rhs)),
        NotEqual => Ok(Value::Boolean(lhs != rhs)),
        Less | LessEqual | Greater | GreaterEqual => {
            let lhs_num = lhs.as_number().map_err(VmError::TypeError)?;
            let rhs_num = rhs.as_number().map_err(VmError::TypeError)?;
            let result = match opcode {
                Less => lhs_num < rhs_num,
                LessEqual => lhs_num <= rhs_num,
                Greater => lhs_num > rhs_num,
                _ => lhs_num >= rhs_num,
            };
            Ok(Value::Boolean(result))
        }
        _ => Err(VmError::TypeError("unsupported comparison opcode".into())),
    }
}

fn execute_logical(opcode: Opcode, lhs: Value, rhs: Value) -> Value {
    match opcode {
        Opcode::And => Value::Boolean(lhs.is_truthy() && rhs.is_truthy()),
        Opcode::Or => Value::Boolean(lhs.is_truthy() || rhs.is_truthy()),
        _ => Value::Null,
    }
}
