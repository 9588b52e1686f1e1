use thiserror::Error;

pub type VmResult<T> = Result<T, VmError>;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("invalid function index {0}")]
    InvalidFunction(usize),
    #[error("function '{name}' expects {expected} arguments, received {received}")]
    ArityMismatch {
        name: String,
        expected: u16,
        received: usize,
    },
    #[error("call depth exceeded {0}")]
    StackOverflow(usize),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("{0} by zero")]
    DivisionByZero(&'static str),
    #[error("integer overflow")]
    Overflow,
    #[error("unknown builtin function '{0}'")]
    UnknownBuiltin(String),
    #[error("builtin call expects string constant at index {0}")]
    InvalidBuiltinName(usize),
    #[error("value is not callable: {0}")]
    NotCallable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed program: {0}")]
    Decode(#[from] serde_json::Error),
}
