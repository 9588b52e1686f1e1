use std::fmt;

use super::bytecode::{FunctionId, VmConstant};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Function(FunctionId),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(flag) => *flag,
            Value::Integer(int) => *int != 0,
            Value::Float(float) => *float != 0.0,
            Value::String(text) => !text.is_empty(),
            Value::Function(_) => true,
        }
    }

    pub fn as_number(&self) -> Result<f64, String> {
        match self {
            Value::Integer(int) => Ok(*int as f64),
            Value::Float(float) => Ok(*float),
            other => Err(format!("expected a number, found {other:?}")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(flag) => write!(f, "{flag}"),
            Value::Integer(int) => write!(f, "{int}"),
            Value::Float(float) => write!(f, "{float}"),
            Value::String(text) => f.write_str(text),
            Value::Function(id) => write!(f, "<fn #{}>", id.index()),
        }
    }
}

impl From<VmConstant> for Value {
    fn from(constant: VmConstant) -> Self {
        match constant {
            VmConstant::Null => Value::Null,
            VmConstant::Bool(b) => Value::Boolean(b),
            VmConstant::Int(i) => Value::Integer(i),
            VmConstant::Float(f) => Value::Float(f),
            VmConstant::String(s) => Value::String(s),
        }
    }
}
