//! capgrid-expr — a small, deterministic expression language used to
//! combine forecasts into a single number.
//!
//! Scripts are JavaScript-flavoured: statements separated by `;` or line
//! breaks, `let` bindings, arithmetic/comparison/logical operators, member
//! access, indexing, and a fixed set of numeric builtins. The value of the
//! last expression statement is the result.
//!
//! ```text
//! let peak = max(predictions);
//! peak > 10 ? peak * 1.2 : peak
//! ```
//!
//! There are no loops or user-defined functions, and every evaluation runs
//! under [`EvalLimits`] (step budget plus wall-clock timeout).

pub mod builtins;
pub mod engine;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

pub use engine::{Bindings, NumericEvaluator, ScriptEngine};
pub use error::{EvalError, EvalResult};
pub use eval::EvalLimits;
pub use parser::{compile, Program};
pub use value::Value;
