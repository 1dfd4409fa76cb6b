//! Built-in function library.

use crate::error::ExprError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    True,
    False,
    RoundTo,
    IfErr,
    In,
    Count,
    Min,
    Max,
    Abs,
}

impl Function {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "true" => Function::True,
            "false" => Function::False,
            "roundto" => Function::RoundTo,
            "iferr" => Function::IfErr,
            "in" => Function::In,
            "count" => Function::Count,
            "min" => Function::Min,
            "max" => Function::Max,
            "abs" => Function::Abs,
            _ => return None,
        })
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Function::True => "true",
            Function::False => "false",
            Function::RoundTo => "roundto",
            Function::IfErr => "iferr",
            Function::In => "in",
            Function::Count => "count",
            Function::Min => "min",
            Function::Max => "max",
            Function::Abs => "abs",
        }
    }

    pub(crate) fn check_arity(self, n: usize) -> Result<(), ExprError> {
        let ok = match self {
            Function::True | Function::False => n == 0,
            Function::RoundTo | Function::IfErr => n == 2,
            Function::Abs => n == 1,
            Function::In | Function::Count => n >= 2,
            Function::Min | Function::Max => n >= 1,
        };
        if ok {
            return Ok(());
        }
        let expected = match self {
            Function::True | Function::False => "expected 0",
            Function::RoundTo | Function::IfErr => "expected 2",
            Function::Abs => "expected 1",
            Function::In | Function::Count => "expected at least 2",
            Function::Min | Function::Max => "expected at least 1",
        };
        Err(ExprError::wrong_num_of_args(
            self.name(),
            format!("{expected}, got {n}"),
        ))
    }

    /// Applies the function to already evaluated arguments. Error
    /// arguments propagate, except through `iferr`.
    pub(crate) fn call(self, args: Vec<Value>) -> Value {
        if self == Function::IfErr {
            return if_err(args);
        }
        match args.iter().find_map(Value::error) {
            Some(e) => Value::Error(e.clone()),
            None => self.apply(args),
        }
    }

    fn apply(self, args: Vec<Value>) -> Value {
        match self {
            Function::True => Value::from(true),
            Function::False => Value::from(false),
            Function::RoundTo => round_to(&args),
            Function::IfErr => if_err(args),
            Function::In => {
                let needle = args[0].to_string();
                Value::from(args[1..].iter().any(|v| v.to_string() == needle))
            }
            Function::Count => {
                let n = args[1..]
                    .iter()
                    .filter(|v| args[0].loose_eq(v) == Some(true))
                    .count();
                Value::Int(n as i64)
            }
            Function::Min | Function::Max => extremum(self, &args),
            Function::Abs => match (args[0].as_int(), args[0].as_float()) {
                (Some(i), _) => i
                    .checked_abs()
                    .map(Value::Int)
                    .unwrap_or(Value::Float((i as f64).abs())),
                (None, Some(f)) => Value::Float(f.abs()),
                _ => Value::Error(ExprError::type_mismatch("abs requires a number")),
            },
        }
    }
}

fn if_err(args: Vec<Value>) -> Value {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(Value::Error(_)), Some(fallback)) => fallback,
        (Some(v), _) => v,
        _ => Value::Error(ExprError::wrong_num_of_args("iferr", "expected 2")),
    }
}

fn round_to(args: &[Value]) -> Value {
    let Some(x) = args[0].as_float() else {
        return Value::Error(ExprError::type_mismatch("roundto requires a number"));
    };
    let dp = match args[1].as_int() {
        Some(dp) if (0..=15).contains(&dp) => dp as u32,
        _ => {
            return Value::Error(ExprError::type_mismatch(
                "roundto places must be an integer between 0 and 15",
            ))
        }
    };
    Value::rounded(x, dp)
}

fn extremum(function: Function, args: &[Value]) -> Value {
    let mut best: Option<&Value> = None;
    for arg in args {
        if !arg.is_numeric() {
            return Value::Error(ExprError::type_mismatch(format!(
                "{} requires numbers",
                function.name()
            )));
        }
        best = match best {
            None => Some(arg),
            Some(b) => {
                let replace = match arg.numeric_cmp(b) {
                    Some(std::cmp::Ordering::Less) => function == Function::Min,
                    Some(std::cmp::Ordering::Greater) => function == Function::Max,
                    _ => false,
                };
                Some(if replace { arg } else { b })
            }
        };
    }
    match best {
        Some(v) => v.clone(),
        None => Value::Error(ExprError::wrong_num_of_args(
            function.name(),
            "expected at least 1",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        assert!(Function::True.check_arity(0).is_ok());
        assert!(Function::RoundTo.check_arity(1).is_err());
        assert!(Function::In.check_arity(1).is_err());
        assert!(Function::Count.check_arity(5).is_ok());
        let err = Function::Abs.check_arity(2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "wrong number of arguments to abs: expected 1, got 2"
        );
    }

    #[test]
    fn test_iferr_passes_value_or_fallback() {
        let ok = Function::IfErr.call(vec![Value::Int(3), Value::Int(0)]);
        assert_eq!(ok, Value::Int(3));
        let fallback = Function::IfErr.call(vec![
            Value::Error(ExprError::DivideByZero),
            Value::Int(0),
        ]);
        assert_eq!(fallback, Value::Int(0));
    }

    #[test]
    fn test_errors_propagate_through_calls() {
        let v = Function::Abs.call(vec![Value::Error(ExprError::DivideByZero)]);
        assert_eq!(v, Value::Error(ExprError::DivideByZero));
    }

    #[test]
    fn test_in_is_textual() {
        let args = vec![Value::from("5.0"), Value::from("5"), Value::from("5.0")];
        assert_eq!(Function::In.call(args).as_bool(), Some(true));
        let args = vec![Value::from("5.0"), Value::from("5")];
        assert_eq!(Function::In.call(args).as_bool(), Some(false));
    }

    #[test]
    fn test_count_is_numeric_aware() {
        let args = vec![
            Value::from("1"),
            Value::from("1.0"),
            Value::Int(1),
            Value::from("2"),
        ];
        assert_eq!(Function::Count.call(args), Value::Int(2));
    }

    #[test]
    fn test_min_max() {
        let args = vec![Value::Int(3), Value::from("1.5"), Value::Float(9.0)];
        assert_eq!(Function::Min.call(args.clone()), Value::from("1.5"));
        assert_eq!(Function::Max.call(args), Value::Float(9.0));
    }
}
