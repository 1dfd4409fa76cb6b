use std::cmp::Ordering;
use std::collections::HashMap;

use super::parser::{BinOp, Node};
use crate::error::ExprError;
use crate::value::Value;

macro_rules! propagate {
    ($v:expr) => {{
        let v = $v;
        if let Value::Error(_) = v {
            return v;
        }
        v
    }};
}

pub(super) fn eval(node: &Node, vars: &HashMap<String, Value>) -> Value {
    match node {
        Node::Literal(v) => v.clone(),
        Node::Var(name) => vars
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Error(ExprError::VarNotExist(name.clone()))),
        Node::Neg(inner) => {
            let v = propagate!(eval(inner, vars));
            match (v.as_int(), v.as_float()) {
                (Some(i), _) => i
                    .checked_neg()
                    .map(Value::Int)
                    .unwrap_or(Value::Float(-(i as f64))),
                (None, Some(f)) => Value::Float(-f),
                _ => Value::Error(ExprError::type_mismatch(format!("can't negate: {v}"))),
            }
        }
        Node::Not(inner) => {
            let v = propagate!(eval(inner, vars));
            match v.as_bool() {
                Some(b) => Value::from(!b),
                None => Value::Error(ExprError::type_mismatch(format!(
                    "can't apply ! to: {v}"
                ))),
            }
        }
        Node::Binary(op @ (BinOp::And | BinOp::Or), l, r) => logical(*op, l, r, vars),
        Node::Binary(op, l, r) => {
            let lv = propagate!(eval(l, vars));
            let rv = propagate!(eval(r, vars));
            binary(*op, &lv, &rv)
        }
        Node::Call(function, args) => {
            let args = args.iter().map(|a| eval(a, vars)).collect();
            function.call(args)
        }
    }
}

fn logical(op: BinOp, l: &Node, r: &Node, vars: &HashMap<String, Value>) -> Value {
    let lv = propagate!(eval(l, vars));
    let Some(lb) = lv.as_bool() else {
        return Value::Error(ExprError::type_mismatch(format!(
            "expected a boolean, got: {lv}"
        )));
    };
    match (op, lb) {
        (BinOp::And, false) => return Value::from(false),
        (BinOp::Or, true) => return Value::from(true),
        _ => {}
    }
    let rv = propagate!(eval(r, vars));
    match rv.as_bool() {
        Some(rb) => Value::from(rb),
        None => Value::Error(ExprError::type_mismatch(format!(
            "expected a boolean, got: {rv}"
        ))),
    }
}

fn binary(op: BinOp, l: &Value, r: &Value) -> Value {
    match op {
        BinOp::Eq | BinOp::Neq => match l.loose_eq(r) {
            Some(eq) => Value::from(eq == (op == BinOp::Eq)),
            None => Value::Error(ExprError::type_mismatch("can't compare errors")),
        },
        BinOp::Lt | BinOp::Lte | BinOp::Gt | BinOp::Gte => match l.numeric_cmp(r) {
            Some(ord) => Value::from(match op {
                BinOp::Lt => ord == Ordering::Less,
                BinOp::Lte => ord != Ordering::Greater,
                BinOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }),
            None => Value::Error(ExprError::type_mismatch(format!(
                "can't order non-numbers: {l}, {r}"
            ))),
        },
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => arithmetic(op, l, r),
        BinOp::And | BinOp::Or => logical_values(op, l, r),
    }
}

fn logical_values(op: BinOp, l: &Value, r: &Value) -> Value {
    match (l.as_bool(), r.as_bool()) {
        (Some(a), Some(b)) => Value::from(if op == BinOp::And { a && b } else { a || b }),
        _ => Value::Error(ExprError::type_mismatch(format!(
            "expected booleans, got: {l}, {r}"
        ))),
    }
}

fn arithmetic(op: BinOp, l: &Value, r: &Value) -> Value {
    if let (Some(a), Some(b)) = (l.as_int(), r.as_int()) {
        let exact = match op {
            BinOp::Add => a.checked_add(b),
            BinOp::Sub => a.checked_sub(b),
            BinOp::Mul => a.checked_mul(b),
            _ => {
                if b == 0 {
                    return Value::Error(ExprError::DivideByZero);
                }
                a.checked_rem(b)
                    .filter(|rem| *rem == 0)
                    .and_then(|_| a.checked_div(b))
            }
        };
        if let Some(v) = exact {
            return Value::Int(v);
        }
    }
    let (Some(a), Some(b)) = (l.as_float(), r.as_float()) else {
        return Value::Error(ExprError::type_mismatch(format!(
            "arithmetic requires numbers: {l}, {r}"
        )));
    };
    match op {
        BinOp::Add => Value::Float(a + b),
        BinOp::Sub => Value::Float(a - b),
        BinOp::Mul => Value::Float(a * b),
        _ if b == 0.0 => Value::Error(ExprError::DivideByZero),
        _ => Value::Float(a / b),
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    fn eval_str(src: &str) -> Value {
        eval(&parse(src).unwrap(), &HashMap::new())
    }

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        assert_eq!(eval_str("2 + 3 * 4"), Value::Int(14));
        assert_eq!(eval_str("9 / 3"), Value::Int(3));
        assert_eq!(eval_str("7 / 2"), Value::Float(3.5));
        assert_eq!(eval_str("-(4 - 9)"), Value::Int(5));
    }

    #[test]
    fn test_overflow_falls_back_to_float() {
        let v = eval_str("9223372036854775807 + 1");
        assert_eq!(v, Value::Float(9223372036854775808.0));
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(eval_str("1 / 0"), Value::Error(ExprError::DivideByZero));
        assert_eq!(eval_str("1.5 / 0.0"), Value::Error(ExprError::DivideByZero));
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(eval_str("false() && missing > 1").as_bool(), Some(false));
        assert_eq!(eval_str("true() || missing > 1").as_bool(), Some(true));
        assert_eq!(
            eval_str("true() && missing > 1"),
            Value::Error(ExprError::VarNotExist("missing".to_string()))
        );
    }

    #[test]
    fn test_string_equality() {
        assert_eq!(eval_str("\"a\" == \"a\"").as_bool(), Some(true));
        assert_eq!(eval_str("\"a\" != 5").as_bool(), Some(true));
        assert!(eval_str("\"a\" < 5").error().is_some());
    }
}
