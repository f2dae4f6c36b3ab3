//! Numeric evaluation entry point.

use std::collections::HashMap;

use tracing::trace;

use crate::error::{EvalError, EvalResult};
use crate::eval::{run, EvalLimits};
use crate::parser::compile;
use crate::value::Value;

/// Named values visible to an expression.
pub type Bindings = HashMap<String, Value>;

/// Evaluates an expression to a single finite number.
///
/// Implementations must be deterministic for identical bindings and must
/// not carry state from one evaluation to the next.
pub trait NumericEvaluator: Send + Sync {
    /// Syntax-check `expression` without running it.
    fn check(&self, expression: &str) -> EvalResult<()>;

    /// Run `expression` against `bindings`. Any result other than a finite
    /// number is an error.
    fn evaluate(&self, expression: &str, bindings: &Bindings) -> EvalResult<f64>;
}

/// The built-in capgrid expression language.
#[derive(Debug, Clone, Default)]
pub struct ScriptEngine {
    limits: EvalLimits,
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: EvalLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> EvalLimits {
        self.limits
    }
}

impl NumericEvaluator for ScriptEngine {
    fn check(&self, expression: &str) -> EvalResult<()> {
        compile(expression).map(|_| ())
    }

    fn evaluate(&self, expression: &str, bindings: &Bindings) -> EvalResult<f64> {
        let program = compile(expression)?;
        let value = run(&program, bindings, self.limits)?;
        trace!(result = %value, "expression evaluated");
        match value {
            Value::Number(n) if n.is_finite() => Ok(n),
            other => Err(EvalError::NonNumericResult(format!(
                "{} ({other})",
                other.type_name()
            ))),
        }
    }
}
