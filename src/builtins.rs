//! Operators and functions installed by [`FunctionRegistry::with_builtins`].

use crate::types::{Arity, CompareOp, FunctionError, FunctionRegistry, Value};

type Builtin = fn(&[Value]) -> Result<Value, FunctionError>;

const FUNCTIONS: &[(&str, Arity, Builtin)] = &[
    ("and", Arity::Variadic, all),
    ("all?", Arity::Variadic, all),
    ("or", Arity::Variadic, any),
    ("any?", Arity::Variadic, any),
    ("not", Arity::Fixed(1), not),
    ("add", Arity::Variadic, add),
    ("subtract", Arity::Fixed(2), subtract),
    ("multiply", Arity::Variadic, multiply),
    ("divide", Arity::Fixed(2), divide),
    ("concatenate", Arity::Variadic, concatenate),
    ("upcase", Arity::Fixed(1), upcase),
    ("downcase", Arity::Fixed(1), downcase),
    ("remove_spaces", Arity::Fixed(1), remove_spaces),
    ("length", Arity::Fixed(1), length),
    ("truncate", Arity::Fixed(2), truncate),
    ("conditional", Arity::Fixed(3), conditional),
];

pub(crate) fn install(registry: &mut FunctionRegistry) {
    for op in CompareOp::ALL {
        let installed = registry.register(op.symbol(), Arity::Fixed(2), move |args: &[Value]| {
            compare(op, args)
        });
        debug_assert!(installed.is_ok(), "builtin '{op}' registered twice");
    }
    for &(name, arity, f) in FUNCTIONS {
        let installed = registry.register(name, arity, f);
        debug_assert!(installed.is_ok(), "builtin '{name}' registered twice");
    }
}

fn arg(args: &[Value], index: usize) -> Result<&Value, FunctionError> {
    args.get(index)
        .ok_or_else(|| FunctionError::new(format!("missing argument {}", index + 1)))
}

fn compare(op: CompareOp, args: &[Value]) -> Result<Value, FunctionError> {
    let [a, b] = args else {
        return Err(FunctionError::new(format!(
            "'{op}' takes 2 arguments, got {}",
            args.len()
        )));
    };
    a.compare(op, b).map(Value::Bool).ok_or_else(|| {
        FunctionError::new(format!(
            "cannot compare {} with {} using '{op}'",
            a.type_name(),
            b.type_name()
        ))
    })
}

// A single list argument is spread, so both `all?([a, b])` and `all?(a, b)` work.
fn spread(args: &[Value]) -> &[Value] {
    match args {
        [Value::List(items)] => items,
        _ => args,
    }
}

fn all(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Bool(spread(args).iter().all(Value::is_truthy)))
}

fn any(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Bool(spread(args).iter().any(Value::is_truthy)))
}

fn not(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::Bool(!args.first().is_some_and(Value::is_truthy)))
}

enum Number {
    Int(i64),
    Float(f64),
}

fn number(v: &Value) -> Result<Number, FunctionError> {
    match v {
        Value::Int(i) => Ok(Number::Int(*i)),
        Value::Float(f) => Ok(Number::Float(*f)),
        other => Err(FunctionError::new(format!(
            "expected a number, got {}",
            other.type_name()
        ))),
    }
}

#[allow(clippy::cast_precision_loss)]
fn fold_numeric(
    args: &[Value],
    start: i64,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, FunctionError> {
    let mut acc = Number::Int(start);
    for arg in spread(args) {
        acc = match (acc, number(arg)?) {
            (Number::Int(a), Number::Int(b)) => Number::Int(
                int_op(a, b).ok_or_else(|| FunctionError::new("integer overflow"))?,
            ),
            (Number::Int(a), Number::Float(b)) => Number::Float(float_op(a as f64, b)),
            (Number::Float(a), Number::Int(b)) => Number::Float(float_op(a, b as f64)),
            (Number::Float(a), Number::Float(b)) => Number::Float(float_op(a, b)),
        };
    }
    Ok(match acc {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) => Value::Float(f),
    })
}

fn add(args: &[Value]) -> Result<Value, FunctionError> {
    fold_numeric(args, 0, i64::checked_add, |a, b| a + b)
}

fn multiply(args: &[Value]) -> Result<Value, FunctionError> {
    fold_numeric(args, 1, i64::checked_mul, |a, b| a * b)
}

#[allow(clippy::cast_precision_loss)]
fn subtract(args: &[Value]) -> Result<Value, FunctionError> {
    match (number(arg(args, 0)?)?, number(arg(args, 1)?)?) {
        (Number::Int(a), Number::Int(b)) => a
            .checked_sub(b)
            .map(Value::Int)
            .ok_or_else(|| FunctionError::new("integer overflow")),
        (Number::Int(a), Number::Float(b)) => Ok(Value::Float(a as f64 - b)),
        (Number::Float(a), Number::Int(b)) => Ok(Value::Float(a - b as f64)),
        (Number::Float(a), Number::Float(b)) => Ok(Value::Float(a - b)),
    }
}

#[allow(clippy::cast_precision_loss)]
fn divide(args: &[Value]) -> Result<Value, FunctionError> {
    match (number(arg(args, 0)?)?, number(arg(args, 1)?)?) {
        (_, Number::Int(0)) => Err(FunctionError::new("division by zero")),
        (Number::Int(a), Number::Int(b)) => a
            .checked_div(b)
            .map(Value::Int)
            .ok_or_else(|| FunctionError::new("integer overflow")),
        (Number::Int(a), Number::Float(b)) => Ok(Value::Float(a as f64 / b)),
        (Number::Float(a), Number::Int(b)) => Ok(Value::Float(a / b as f64)),
        (Number::Float(a), Number::Float(b)) => Ok(Value::Float(a / b)),
    }
}

// Strings render without quotes; everything else uses its display form.
fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn concatenate(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(spread(args).iter().map(text).collect()))
}

fn upcase(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(text(arg(args, 0)?).to_uppercase()))
}

fn downcase(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(text(arg(args, 0)?).to_lowercase()))
}

fn remove_spaces(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(Value::String(text(arg(args, 0)?).replace(' ', "")))
}

fn length(args: &[Value]) -> Result<Value, FunctionError> {
    let len = match arg(args, 0)? {
        Value::List(items) => items.len(),
        Value::Map(entries) => entries.len(),
        other => text(other).chars().count(),
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| FunctionError::new("length does not fit in an integer"))
}

fn truncate(args: &[Value]) -> Result<Value, FunctionError> {
    let raw = arg(args, 1)?;
    let limit = raw
        .as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            FunctionError::new(format!(
                "truncate length must be a non-negative int, got {}",
                raw
            ))
        })?;
    Ok(Value::String(text(arg(args, 0)?).chars().take(limit).collect()))
}

fn conditional(args: &[Value]) -> Result<Value, FunctionError> {
    let picked = if arg(args, 0)?.is_truthy() { 1 } else { 2 };
    arg(args, picked).cloned()
}
