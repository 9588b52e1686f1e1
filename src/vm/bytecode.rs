use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{VmError, VmResult};
use super::instruction::Instruction;
use crate::profiler::{FunctionResolver, SourcePosition};

/// Index of a function inside a [`VmBytecode`]; the identity the profiler
/// keys call paths on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u32);

impl FunctionId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmBytecode {
    /// Source file the program was compiled from.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub constants: Vec<VmConstant>,
    pub functions: Vec<VmFunction>,
    #[serde(default)]
    pub entry: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VmConstant {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmFunction {
    pub name: String,
    #[serde(default)]
    pub arity: u16,
    #[serde(default)]
    pub locals: u16,
    pub instructions: Vec<Instruction>,
}

impl VmFunction {
    pub fn new(
        name: impl Into<String>,
        arity: u16,
        locals: u16,
        instructions: Vec<Instruction>,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            locals: locals.max(arity),
            instructions,
        }
    }
}

impl VmBytecode {
    pub fn new(constants: Vec<VmConstant>, functions: Vec<VmFunction>, entry: usize) -> Self {
        Self {
            source: None,
            constants,
            functions,
            entry,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn from_json_str(data: &str) -> VmResult<Self> {
        let program: Self = serde_json::from_str(data)?;
        program.validate()?;
        Ok(program)
    }

    pub fn from_reader<R: Read>(reader: R) -> VmResult<Self> {
        let program: Self = serde_json::from_reader(reader)?;
        program.validate()?;
        Ok(program)
    }

    pub fn load(path: &Path) -> VmResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn function(&self, id: FunctionId) -> Option<&VmFunction> {
        self.functions.get(id.index())
    }

    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .position(|function| function.name == name)
            .map(FunctionId::new)
    }

    fn validate(&self) -> VmResult<()> {
        if self.entry >= self.functions.len() {
            return Err(VmError::InvalidFunction(self.entry));
        }
        Ok(())
    }
}

impl FunctionResolver<FunctionId> for VmBytecode {
    fn function_name(&self, function: &FunctionId) -> String {
        self.function(*function)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| format!("<fn #{}>", function.index()))
    }

    fn source_position(&self, function: &FunctionId) -> SourcePosition {
        let first_line = self
            .function(*function)
            .and_then(|f| f.instructions.first())
            .and_then(|inst| inst.debug);
        match first_line {
            Some(line) => SourcePosition::new(self.source.clone(), line),
            None => SourcePosition::unknown(),
        }
    }
}
