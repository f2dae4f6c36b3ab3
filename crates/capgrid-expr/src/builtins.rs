//! Numeric builtin functions.

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Max,
    Min,
    Sum,
    Avg,
    Count,
    Abs,
    Ceil,
    Floor,
    Round,
    Sqrt,
    Pow,
    Clamp,
    Pluck,
}

impl Builtin {
    pub const ALL: [Builtin; 13] = [
        Builtin::Max,
        Builtin::Min,
        Builtin::Sum,
        Builtin::Avg,
        Builtin::Count,
        Builtin::Abs,
        Builtin::Ceil,
        Builtin::Floor,
        Builtin::Round,
        Builtin::Sqrt,
        Builtin::Pow,
        Builtin::Clamp,
        Builtin::Pluck,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::Sum => "sum",
            Builtin::Avg => "avg",
            Builtin::Count => "count",
            Builtin::Abs => "abs",
            Builtin::Ceil => "ceil",
            Builtin::Floor => "floor",
            Builtin::Round => "round",
            Builtin::Sqrt => "sqrt",
            Builtin::Pow => "pow",
            Builtin::Clamp => "clamp",
            Builtin::Pluck => "pluck",
        }
    }

    pub fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "mean" => Some(Builtin::Avg),
            _ => Self::ALL.into_iter().find(|b| b.name() == name),
        }
    }

    /// The `Math` namespace record, so `Math.max(...)` resolves to `max`.
    pub fn math_namespace() -> Value {
        Value::record(Self::ALL.map(|b| (b.name(), Value::Builtin(b))))
    }

    pub fn call(self, args: Vec<Value>) -> EvalResult<Value> {
        let name = self.name();
        match self {
            Builtin::Max => {
                let values = numbers(name, args)?;
                nonempty(name, &values)?;
                Ok(Value::Number(values.into_iter().fold(f64::NEG_INFINITY, f64::max)))
            }
            Builtin::Min => {
                let values = numbers(name, args)?;
                nonempty(name, &values)?;
                Ok(Value::Number(values.into_iter().fold(f64::INFINITY, f64::min)))
            }
            Builtin::Sum => Ok(Value::Number(numbers(name, args)?.into_iter().sum())),
            Builtin::Avg => {
                let values = numbers(name, args)?;
                nonempty(name, &values)?;
                let n = values.len() as f64;
                Ok(Value::Number(values.into_iter().sum::<f64>() / n))
            }
            Builtin::Count => {
                let [arg] = exact::<1>(name, "1", args)?;
                match arg {
                    Value::Array(items) => Ok(Value::Number(items.len() as f64)),
                    other => Err(EvalError::InvalidArgument {
                        function: name,
                        reason: format!("expected array, got {}", other.type_name()),
                    }),
                }
            }
            Builtin::Abs => unary(name, args, f64::abs),
            Builtin::Ceil => unary(name, args, f64::ceil),
            Builtin::Floor => unary(name, args, f64::floor),
            Builtin::Round => unary(name, args, f64::round),
            Builtin::Sqrt => unary(name, args, f64::sqrt),
            Builtin::Pow => {
                let [base, exp] = exact::<2>(name, "2", args)?;
                Ok(Value::Number(number(name, &base)?.powf(number(name, &exp)?)))
            }
            Builtin::Clamp => {
                let [x, lo, hi] = exact::<3>(name, "3", args)?;
                let (x, lo, hi) = (number(name, &x)?, number(name, &lo)?, number(name, &hi)?);
                if lo > hi {
                    return Err(EvalError::InvalidArgument {
                        function: name,
                        reason: format!("lower bound {lo} exceeds upper bound {hi}"),
                    });
                }
                Ok(Value::Number(x.clamp(lo, hi)))
            }
            Builtin::Pluck => {
                let [list, field] = exact::<2>(name, "2", args)?;
                let (Value::Array(items), Value::Str(field)) = (list, field) else {
                    return Err(EvalError::InvalidArgument {
                        function: name,
                        reason: "expected (array, string)".to_string(),
                    });
                };
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Record(mut fields) => fields.remove(&field).ok_or_else(|| {
                            EvalError::UndefinedReference(format!("field `{field}`"))
                        }),
                        other => Err(EvalError::Type(format!(
                            "pluck() cannot read `{field}` of {}",
                            other.type_name()
                        ))),
                    })
                    .collect::<EvalResult<Vec<_>>>()
                    .map(Value::Array)
            }
        }
    }
}

/// Arguments as numbers: either several numbers or one array of numbers.
fn numbers(name: &'static str, args: Vec<Value>) -> EvalResult<Vec<f64>> {
    let items = match <[Value; 1]>::try_from(args) {
        Ok([Value::Array(items)]) => items,
        Ok([single]) => vec![single],
        Err(args) => args,
    };
    items.iter().map(|v| number(name, v)).collect()
}

fn number(name: &'static str, value: &Value) -> EvalResult<f64> {
    value.as_number().ok_or_else(|| EvalError::InvalidArgument {
        function: name,
        reason: format!("expected number, got {}", value.type_name()),
    })
}

fn nonempty(name: &'static str, values: &[f64]) -> EvalResult<()> {
    if values.is_empty() {
        return Err(EvalError::InvalidArgument {
            function: name,
            reason: "no values".to_string(),
        });
    }
    Ok(())
}

fn exact<const N: usize>(
    name: &'static str,
    expected: &'static str,
    args: Vec<Value>,
) -> EvalResult<[Value; N]> {
    <[Value; N]>::try_from(args).map_err(|args| EvalError::Arity {
        function: name,
        expected,
        got: args.len(),
    })
}

fn unary(name: &'static str, args: Vec<Value>, f: fn(f64) -> f64) -> EvalResult<Value> {
    let [x] = exact::<1>(name, "1", args)?;
    Ok(Value::Number(f(number(name, &x)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Vec<Value> {
        values.iter().copied().map(Value::Number).collect()
    }

    #[test]
    fn max_accepts_varargs_or_array() {
        assert_eq!(
            Builtin::Max.call(nums(&[1.2, 4.3, 3.2])).unwrap(),
            Value::Number(4.3)
        );
        assert_eq!(
            Builtin::Max.call(vec![Value::Array(nums(&[1.0, 7.0]))]).unwrap(),
            Value::Number(7.0)
        );
    }

    #[test]
    fn empty_aggregates() {
        assert!(Builtin::Max.call(vec![Value::Array(vec![])]).is_err());
        assert!(Builtin::Avg.call(vec![]).is_err());
        assert_eq!(Builtin::Sum.call(vec![]).unwrap(), Value::Number(0.0));
    }

    #[test]
    fn avg_and_clamp() {
        assert_eq!(
            Builtin::Avg.call(nums(&[2.0, 4.0])).unwrap(),
            Value::Number(3.0)
        );
        assert_eq!(
            Builtin::Clamp.call(nums(&[12.0, 1.0, 10.0])).unwrap(),
            Value::Number(10.0)
        );
        assert!(Builtin::Clamp.call(nums(&[1.0, 5.0, 2.0])).is_err());
    }

    #[test]
    fn arity_is_checked() {
        assert_eq!(
            Builtin::Pow.call(nums(&[2.0])),
            Err(EvalError::Arity {
                function: "pow",
                expected: "2",
                got: 1
            })
        );
    }

    #[test]
    fn pluck_reads_record_fields() {
        let records = Value::Array(vec![
            Value::record([("prediction", Value::Number(1.0))]),
            Value::record([("prediction", Value::Number(2.0))]),
        ]);
        assert_eq!(
            Builtin::Pluck
                .call(vec![records, Value::from("prediction")])
                .unwrap(),
            Value::Array(nums(&[1.0, 2.0]))
        );
    }

    #[test]
    fn non_numeric_arguments_rejected() {
        assert!(matches!(
            Builtin::Abs.call(vec![Value::from("x")]),
            Err(EvalError::InvalidArgument { function: "abs", .. })
        ));
    }

    #[test]
    fn lookup_names() {
        assert_eq!(Builtin::lookup("max"), Some(Builtin::Max));
        assert_eq!(Builtin::lookup("mean"), Some(Builtin::Avg));
        assert_eq!(Builtin::lookup("eval"), None);
    }
}
