use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    LoadConst,
    LoadVar,
    StoreVar,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Not,
    Pop,
    Jump,
    JumpIfFalse,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    /// Push a reference to function `operand_a`.
    LoadFunction,
    /// Call function `operand_a` with `operand_b` arguments.
    Call,
    /// Call the function reference below the `operand_a` arguments.
    CallIndirect,
    CallBuiltin,
    Return,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    #[serde(default)]
    pub operand_a: u32,
    #[serde(default)]
    pub operand_b: u32,
    /// Source line this instruction was compiled from.
    #[serde(default)]
    pub debug: Option<u32>,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand_a: u32, operand_b: u32, debug: Option<u32>) -> Self {
        Self {
            opcode,
            operand_a,
            operand_b,
            debug,
        }
    }

    pub fn simple(opcode: Opcode) -> Self {
        Self::new(opcode, 0, 0, None)
    }

    pub fn with_operand(opcode: Opcode, operand_a: u32) -> Self {
        Self::new(opcode, operand_a, 0, None)
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.debug = Some(line);
        self
    }
}
