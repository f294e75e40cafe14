//! Built-in functions and collection helpers
//!
//! Only the names listed here can be called from an expression; anything else is
//! rejected when the expression is compiled.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::fmt::Write;

use super::eval::{number_to_value, to_number, to_text, type_name, Lookup};
use crate::domain::document::{find_by_id, find_by_id_and_state, CONFIRMED_STATE};
use crate::domain::errors::ExpressionError;

const FUNCTIONS: &[&str] = &[
    "concat", "upper", "lower", "trim", "substr", "len", "number", "string", "coalesce", "to_date",
];

const METHODS: &[&str] = &["id", "findById", "idDato", "findByIdAndState"];

/// Default output format of `to_date`
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn is_function(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

pub fn is_method(name: &str) -> bool {
    METHODS.contains(&name)
}

/// Calls a free function
pub fn call(name: &str, args: &[Value]) -> Result<Value, ExpressionError> {
    match name {
        "concat" => Ok(Value::String(
            args.iter()
                .filter(|arg| !arg.is_null())
                .map(to_text)
                .collect(),
        )),
        "upper" => {
            arity(name, args, 1, 1)?;
            Ok(map_text(&args[0], |s| s.to_uppercase()))
        }
        "lower" => {
            arity(name, args, 1, 1)?;
            Ok(map_text(&args[0], |s| s.to_lowercase()))
        }
        "trim" => {
            arity(name, args, 1, 1)?;
            Ok(map_text(&args[0], |s| s.trim().to_string()))
        }
        "substr" => {
            arity(name, args, 2, 3)?;
            Ok(substr(&args[0], &args[1], args.get(2)))
        }
        "len" => {
            arity(name, args, 1, 1)?;
            let len = match &args[0] {
                Value::Null => 0,
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                other => to_text(other).chars().count(),
            };
            Ok(Value::from(len))
        }
        "number" => {
            arity(name, args, 1, 1)?;
            Ok(number_to_value(to_number(&args[0])))
        }
        "string" => {
            arity(name, args, 1, 1)?;
            Ok(Value::String(to_text(&args[0])))
        }
        "coalesce" => Ok(args
            .iter()
            .find(|arg| !arg.is_null())
            .cloned()
            .unwrap_or(Value::Null)),
        "to_date" => {
            arity(name, args, 2, 3)?;
            to_date(&args[0], &args[1], args.get(2))
        }
        other => Err(ExpressionError::UnknownFunction(other.to_string())),
    }
}

/// Calls a collection helper on `receiver`; a non-array receiver yields null
pub(crate) fn call_method<'v>(
    name: &str,
    receiver: &'v Value,
    args: &[Value],
) -> Result<Lookup<'v>, ExpressionError> {
    let expected = match name {
        "findByIdAndState" => 2,
        _ if is_method(name) => 1,
        other => return Err(ExpressionError::UnknownFunction(other.to_string())),
    };
    arity(name, args, expected, expected)?;

    let Value::Array(items) = receiver else {
        return Ok(Lookup::Derived(Value::Null));
    };

    let found = match name {
        "idDato" => find_by_id_and_state(items, &args[0], CONFIRMED_STATE),
        "findByIdAndState" => match args[1].as_str() {
            Some(state) => find_by_id_and_state(items, &args[0], state),
            None => find_by_id_and_state(items, &args[0], &to_text(&args[1])),
        },
        _ => find_by_id(items, &args[0]),
    };

    Ok(found.map_or(Lookup::Derived(Value::Null), Lookup::Found))
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), ExpressionError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min} or {max}")
    };
    Err(ExpressionError::Arity {
        function: name.to_string(),
        expected,
        actual: args.len(),
    })
}

fn map_text(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Null => Value::Null,
        other => Value::String(f(&to_text(other))),
    }
}

/// Substring by character position; a negative start counts from the end
fn substr(value: &Value, start: &Value, len: Option<&Value>) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    let chars: Vec<char> = to_text(value).chars().collect();
    let total = chars.len() as i64;

    let start = to_number(start);
    let start = if start.is_nan() { 0 } else { start as i64 };
    let start = if start < 0 {
        (total + start).max(0)
    } else {
        start.min(total)
    };

    let remaining = total - start;
    let take = match len.map(to_number) {
        Some(n) if n.is_nan() => 0,
        Some(n) => (n as i64).clamp(0, remaining),
        None => remaining,
    };

    Value::String(
        chars[start as usize..(start + take) as usize]
            .iter()
            .collect(),
    )
}

/// Reformats a date string from one strftime pattern into another
fn to_date(value: &Value, from: &Value, to: Option<&Value>) -> Result<Value, ExpressionError> {
    let text = match value {
        Value::Null => return Ok(Value::Null),
        Value::String(s) if s.trim().is_empty() => return Ok(Value::Null),
        other => to_text(other),
    };
    let Some(from) = from.as_str() else {
        return Err(ExpressionError::Type(format!(
            "to_date format must be a string, got {}",
            type_name(from)
        )));
    };
    let to = match to {
        None | Some(Value::Null) => DEFAULT_DATE_FORMAT,
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(ExpressionError::Type(format!(
                "to_date output format must be a string, got {}",
                type_name(other)
            )))
        }
    };

    let text = text.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, from) {
        return render_date(datetime.format(to), to);
    }
    match NaiveDate::parse_from_str(text, from) {
        Ok(date) => render_date(date.format(to), to),
        Err(e) => Err(ExpressionError::Type(format!(
            "cannot parse '{text}' as a date with format '{from}': {e}"
        ))),
    }
}

/// Renders a formatted date; an invalid specifier in `to` is a type error
fn render_date(formatted: impl std::fmt::Display, to: &str) -> Result<Value, ExpressionError> {
    let mut out = String::new();
    write!(out, "{formatted}")
        .map_err(|_| ExpressionError::Type(format!("invalid to_date output format '{to}'")))?;
    Ok(Value::String(out))
}
