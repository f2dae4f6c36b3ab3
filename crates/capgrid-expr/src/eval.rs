//! Tree-walking interpreter with execution limits.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::builtins::Builtin;
use crate::error::{EvalError, EvalResult};
use crate::parser::{BinaryOp, Expr, MAX_DEPTH, Program, Stmt, UnaryOp};
use crate::value::Value;

/// Bounds applied to a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    /// Maximum number of expression nodes evaluated.
    pub max_steps: u64,
    /// Wall-clock budget for the whole evaluation.
    pub timeout: Duration,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            timeout: Duration::from_millis(250),
        }
    }
}

/// Steps between wall-clock checks.
const CLOCK_CHECK_INTERVAL: u64 = 256;

/// Run `program` against `bindings`, returning the value of the last
/// expression statement (or of the first `return`).
pub fn run(
    program: &Program,
    bindings: &HashMap<String, Value>,
    limits: EvalLimits,
) -> EvalResult<Value> {
    let mut interp = Interpreter {
        bindings,
        locals: HashMap::new(),
        steps: 0,
        depth: 0,
        limits,
        deadline: Instant::now() + limits.timeout,
    };

    let mut last = None;
    for stmt in &program.statements {
        match stmt {
            Stmt::Let(name, expr) => {
                let value = interp.eval(expr)?;
                interp.locals.insert(name.clone(), value);
            }
            Stmt::Expr(expr) => last = Some(interp.eval(expr)?),
            Stmt::Return(expr) => return interp.eval(expr),
        }
    }
    last.ok_or(EvalError::Empty)
}

struct Interpreter<'a> {
    bindings: &'a HashMap<String, Value>,
    locals: HashMap<String, Value>,
    steps: u64,
    depth: usize,
    limits: EvalLimits,
    deadline: Instant,
}

impl Interpreter<'_> {
    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(EvalError::LimitExceeded(format!(
                "more than {} steps",
                self.limits.max_steps
            )));
        }
        if self.steps % CLOCK_CHECK_INTERVAL == 0 && Instant::now() >= self.deadline {
            return Err(EvalError::LimitExceeded(format!(
                "ran longer than {:?}",
                self.limits.timeout
            )));
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.tick()?;
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::LimitExceeded(format!(
                "expression nested deeper than {MAX_DEPTH}"
            )));
        }
        self.depth += 1;
        let result = self.eval_node(expr);
        self.depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Ident(name) => self.resolve(name),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::Array),
            Expr::Record(fields) => {
                let mut record = std::collections::BTreeMap::new();
                for (key, value) in fields {
                    let value = self.eval(value)?;
                    record.insert(key.clone(), value);
                }
                Ok(Value::Record(record))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(EvalError::Type(format!(
                            "cannot negate {}",
                            other.type_name()
                        ))),
                    },
                }
            }
            Expr::Binary(first, rest) => {
                let mut acc = self.eval(first)?;
                for (op, operand) in rest {
                    acc = match op {
                        BinaryOp::And if !acc.is_truthy() => acc,
                        BinaryOp::Or if acc.is_truthy() => acc,
                        BinaryOp::And | BinaryOp::Or => self.eval(operand)?,
                        _ => {
                            let right = self.eval(operand)?;
                            binary(*op, acc, right)?
                        }
                    };
                }
                Ok(acc)
            }
            Expr::Conditional(cond, then, otherwise) => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Member(target, field) => {
                let target = self.eval(target)?;
                member(target, field)
            }
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                self.index(target, index)
            }
            Expr::Call(callee, args) => {
                let function = match self.eval(callee)? {
                    Value::Builtin(b) => b,
                    other => return Err(EvalError::NotCallable(other.to_string())),
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<EvalResult<Vec<_>>>()?;
                function.call(args)
            }
        }
    }

    /// Local `let` bindings shadow caller bindings, which shadow builtins.
    fn resolve(&self, name: &str) -> EvalResult<Value> {
        if let Some(value) = self.locals.get(name).or_else(|| self.bindings.get(name)) {
            return Ok(value.clone());
        }
        if name == "Math" {
            return Ok(Builtin::math_namespace());
        }
        Builtin::lookup(name)
            .map(Value::Builtin)
            .ok_or_else(|| EvalError::UndefinedReference(name.to_string()))
    }

    fn index(&self, target: Value, index: Value) -> EvalResult<Value> {
        match (target, index) {
            (Value::Array(items), Value::Number(i)) => {
                if i < 0.0 || i.fract() != 0.0 {
                    return Err(EvalError::Type(format!("invalid array index {i}")));
                }
                items
                    .into_iter()
                    .nth(i as usize)
                    .ok_or_else(|| EvalError::UndefinedReference(format!("index {i}")))
            }
            (target @ Value::Record(_), Value::Str(field)) => member(target, &field),
            (target, index) => Err(EvalError::Type(format!(
                "cannot index {} with {}",
                target.type_name(),
                index.type_name()
            ))),
        }
    }
}

fn member(target: Value, field: &str) -> EvalResult<Value> {
    match target {
        Value::Record(mut fields) => fields
            .remove(field)
            .ok_or_else(|| EvalError::UndefinedReference(format!("field `{field}`"))),
        Value::Array(items) if field == "length" => Ok(Value::Number(items.len() as f64)),
        other => Err(EvalError::Type(format!(
            "cannot read `{field}` of {}",
            other.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left == right)),
        BinaryOp::Ne => return Ok(Value::Bool(left != right)),
        BinaryOp::Add => {
            if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                return Ok(Value::Str(format!("{left}{right}")));
            }
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if let (Value::Str(a), Value::Str(b)) = (&left, &right) {
                return Ok(Value::Bool(compare(op, a.as_str(), b.as_str())));
            }
        }
        _ => {}
    }

    let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
        return Err(EvalError::Type(format!(
            "unsupported operands {} and {} for {op:?}",
            left.type_name(),
            right.type_name()
        )));
    };
    let (a, b) = (*a, *b);
    Ok(match op {
        BinaryOp::Add => Value::Number(a + b),
        BinaryOp::Sub => Value::Number(a - b),
        BinaryOp::Mul => Value::Number(a * b),
        BinaryOp::Div => Value::Number(a / b),
        BinaryOp::Rem => Value::Number(a % b),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Value::Bool(compare(op, a, b))
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::And | BinaryOp::Or => {
            unreachable!("handled before numeric dispatch")
        }
    })
}

fn compare<T: PartialOrd>(op: BinaryOp, a: T, b: T) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => false,
    }
}
