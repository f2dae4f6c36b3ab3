//! Expression evaluation errors.

use thiserror::Error;

/// Result type alias for expression operations.
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while compiling or running an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("expression is empty")]
    Empty,

    #[error("undefined reference: {0}")]
    UndefinedReference(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("`{0}` is not a function")]
    NotCallable(String),

    #[error("{function}() expects {expected} argument(s), got {got}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("{function}(): {reason}")]
    InvalidArgument {
        function: &'static str,
        reason: String,
    },

    #[error("result is not a finite number: {0}")]
    NonNumericResult(String),

    #[error("execution limit exceeded: {0}")]
    LimitExceeded(String),
}

impl EvalError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}
