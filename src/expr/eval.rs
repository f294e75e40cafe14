//! Tree-walking interpreter
//!
//! Values are `serde_json::Value`. Paths into the bound document are resolved by
//! reference and only cloned when a result leaves the interpreter.

use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

use super::ast::{Accessor, Assignment, BinaryOp, Expr, LogicalOp, Root, Segment, UnaryOp};
use super::functions;
use crate::domain::errors::ExpressionError;

/// Values an expression can read
#[derive(Debug, Clone, Copy)]
pub struct Scope<'s> {
    pub document: &'s Value,
    pub element: &'s Value,
    /// The output record; unbound while evaluating conditions
    pub target: Option<&'s Value>,
}

impl<'s> Scope<'s> {
    /// Scope for a rule condition: document and element only
    pub fn condition(document: &'s Value, element: &'s Value) -> Self {
        Self {
            document,
            element,
            target: None,
        }
    }

    /// Scope for a field mapping statement
    pub fn mapping(document: &'s Value, element: &'s Value, target: &'s Value) -> Self {
        Self {
            document,
            element,
            target: Some(target),
        }
    }
}

/// Result of a lookup into a value: a reference into it or a computed value
pub(crate) enum Lookup<'v> {
    Found(&'v Value),
    Derived(Value),
}

impl<'v> Lookup<'v> {
    fn missing() -> Self {
        Lookup::Derived(Value::Null)
    }
}

/// Evaluates an expression
pub fn evaluate<'s>(expr: &Expr, scope: &Scope<'s>) -> Result<Cow<'s, Value>, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(Cow::Owned(value.clone())),
        Expr::Root(root) => resolve_root(*root, scope).map(Cow::Borrowed),
        Expr::Path { base, segments } => evaluate_path(base, segments, scope),
        Expr::Call { function, args } => {
            let args = evaluate_args(args, scope)?;
            functions::call(function, &args).map(Cow::Owned)
        }
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, scope)?;
            Ok(Cow::Owned(match op {
                UnaryOp::Not => Value::Bool(!truthy(&value)),
                UnaryOp::Neg => number_to_value(-to_number(&value)),
                UnaryOp::Plus => number_to_value(to_number(&value)),
            }))
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            Ok(Cow::Owned(binary(*op, &left, &right)))
        }
        Expr::Logical { op, left, right } => {
            let left = evaluate(left, scope)?;
            let take_left = match op {
                LogicalOp::And => !truthy(&left),
                LogicalOp::Or => truthy(&left),
                LogicalOp::Coalesce => !left.is_null(),
            };
            if take_left {
                Ok(left)
            } else {
                evaluate(right, scope)
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if truthy(evaluate(test, scope)?.as_ref()) {
                evaluate(consequent, scope)
            } else {
                evaluate(alternate, scope)
            }
        }
    }
}

/// Applies a statement to the target record
pub fn execute(
    statement: &Assignment,
    document: &Value,
    element: &Value,
    target: &mut Value,
) -> Result<(), ExpressionError> {
    let value = {
        let scope = Scope::mapping(document, element, target);
        evaluate(&statement.value, &scope)?.into_owned()
    };
    assign(target, &statement.path, value)
}

/// Writes `value` at `path` below `target`, creating intermediate objects
pub fn assign(target: &mut Value, path: &[String], value: Value) -> Result<(), ExpressionError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(ExpressionError::Type("assignment without a field".to_string()));
    };

    let mut current = target;
    for key in parents {
        current = match current {
            Value::Object(map) => map
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            other => {
                return Err(ExpressionError::Type(format!(
                    "cannot set '{key}' on {}",
                    type_name(other)
                )))
            }
        };
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        other => Err(ExpressionError::Type(format!(
            "cannot set '{last}' on {}",
            type_name(other)
        ))),
    }
}

fn resolve_root<'s>(root: Root, scope: &Scope<'s>) -> Result<&'s Value, ExpressionError> {
    match root {
        Root::Document => Ok(scope.document),
        Root::Element => Ok(scope.element),
        Root::Target => scope.target.ok_or(ExpressionError::TargetUnavailable),
    }
}

fn evaluate_args(args: &[Expr], scope: &Scope<'_>) -> Result<Vec<Value>, ExpressionError> {
    args.iter()
        .map(|arg| evaluate(arg, scope).map(Cow::into_owned))
        .collect()
}

enum Step<'a> {
    Field(&'a str),
    Index(Value),
    Method(&'a str, Vec<Value>),
}

fn evaluate_path<'s>(
    base: &Expr,
    segments: &[Segment],
    scope: &Scope<'s>,
) -> Result<Cow<'s, Value>, ExpressionError> {
    let mut current = evaluate(base, scope)?;

    for segment in segments {
        if current.is_null() {
            if segment.optional {
                return Ok(Cow::Owned(Value::Null));
            }
            return Err(ExpressionError::NullAccess {
                property: describe(&segment.accessor),
            });
        }

        let step = match &segment.accessor {
            Accessor::Field(name) => Step::Field(name),
            Accessor::Index(index) => Step::Index(evaluate(index, scope)?.into_owned()),
            Accessor::Method { name, args } => Step::Method(name, evaluate_args(args, scope)?),
        };

        current = match current {
            Cow::Borrowed(value) => match apply_step(value, &step)? {
                Lookup::Found(found) => Cow::Borrowed(found),
                Lookup::Derived(derived) => Cow::Owned(derived),
            },
            Cow::Owned(value) => Cow::Owned(match apply_step(&value, &step)? {
                Lookup::Found(found) => found.clone(),
                Lookup::Derived(derived) => derived,
            }),
        };
    }

    Ok(current)
}

fn apply_step<'v>(value: &'v Value, step: &Step<'_>) -> Result<Lookup<'v>, ExpressionError> {
    match step {
        Step::Field(name) => Ok(member(value, name)),
        Step::Index(index) => Ok(index_into(value, index)),
        Step::Method(name, args) => functions::call_method(name, value, args),
    }
}

fn describe(accessor: &Accessor) -> String {
    match accessor {
        Accessor::Field(name) => name.clone(),
        Accessor::Index(_) => "[index]".to_string(),
        Accessor::Method { name, .. } => format!("{name}()"),
    }
}

fn member<'v>(value: &'v Value, name: &str) -> Lookup<'v> {
    match value {
        Value::Object(map) => map.get(name).map_or_else(Lookup::missing, Lookup::Found),
        Value::Array(items) if name == "length" => Lookup::Derived(Value::from(items.len())),
        Value::String(s) if name == "length" => Lookup::Derived(Value::from(s.chars().count())),
        _ => Lookup::missing(),
    }
}

fn index_into<'v>(value: &'v Value, index: &Value) -> Lookup<'v> {
    match (value, index) {
        (Value::Array(items), _) => match as_index(index) {
            Some(i) => items.get(i).map_or_else(Lookup::missing, Lookup::Found),
            None => match index.as_str() {
                Some(name) => member(value, name),
                None => Lookup::missing(),
            },
        },
        (Value::String(s), _) => match as_index(index) {
            Some(i) => s
                .chars()
                .nth(i)
                .map_or_else(Lookup::missing, |c| Lookup::Derived(Value::String(c.to_string()))),
            None => match index.as_str() {
                Some(name) => member(value, name),
                None => Lookup::missing(),
            },
        },
        (Value::Object(_), _) => match crate::domain::ids::canonical_key(index) {
            Some(key) => member(value, &key),
            None => Lookup::missing(),
        },
        _ => Lookup::missing(),
    }
}

fn as_index(index: &Value) -> Option<usize> {
    match index {
        Value::Number(n) => {
            let f = n.as_f64()?;
            (f >= 0.0 && f.fract() == 0.0).then_some(f as usize)
        }
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if is_textual(left) || is_textual(right) {
                Value::String(format!("{}{}", to_text(left), to_text(right)))
            } else {
                number_to_value(to_number(left) + to_number(right))
            }
        }
        BinaryOp::Sub => number_to_value(to_number(left) - to_number(right)),
        BinaryOp::Mul => number_to_value(to_number(left) * to_number(right)),
        BinaryOp::Div => number_to_value(to_number(left) / to_number(right)),
        BinaryOp::Rem => number_to_value(to_number(left) % to_number(right)),
        BinaryOp::LooseEq => Value::Bool(loose_eq(left, right)),
        BinaryOp::LooseNe => Value::Bool(!loose_eq(left, right)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(left, right)),
        BinaryOp::StrictNe => Value::Bool(!strict_eq(left, right)),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
    }
}

fn is_textual(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => to_number(left).partial_cmp(&to_number(right)),
    }
}

/// JS-style truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Equality with numeric coercion between numbers, numeric strings and booleans
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            left == right
        }
        _ => to_number(left) == to_number(right),
    }
}

/// Equality without coercion; `1` and `1.0` are the same number
pub fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Numeric coercion; non-numeric values become NaN
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// String coercion used by `+` and the string functions
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// JSON form of a computed number; integral values become integers, NaN and infinities null
pub fn number_to_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
