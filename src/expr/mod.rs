//! Sandboxed expression language for rule conditions and field mappings.
//!
//! Expressions are compiled once, when the rule set that holds them is loaded,
//! into an AST that is interpreted against three bindings:
//!
//! - `d` / `document`: the whole document being processed
//! - `e` / `element`: the node the rule is applied to
//! - `t` / `target`: the output record being built (field mappings only)
//!
//! Nothing outside the whitelisted functions in [`functions`] can be called, and
//! expressions cannot reach host state.
//!
//! ```rust
//! use ehr2row::expr::{Expression, FieldMapping};
//! use serde_json::json;
//!
//! let document = json!({"id": 1, "content": [{"id": "A", "ESTADO": "C", "VALOR": 7}]});
//! let element = json!({"VALOR": "7"});
//!
//! let condition = Expression::compile("d.content.idDato('A').VALOR == e.VALOR");
//! assert!(condition.test(&document, &element).unwrap());
//!
//! let mut record = json!({});
//! FieldMapping::compile("t.VALUE_AS_NUMBER = number(e.VALOR)")
//!     .apply(&document, &element, &mut record)
//!     .unwrap();
//! assert_eq!(record, json!({"VALUE_AS_NUMBER": 7}));
//! ```

pub mod ast;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::errors::ExpressionError;
use ast::{Assignment, Expr};
use eval::Scope;

/// A compiled rule condition
///
/// Compilation never fails outright: an invalid source is kept together with its
/// error, which is returned every time the expression is evaluated.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "String")]
pub struct Expression {
    source: String,
    compiled: Result<Expr, ExpressionError>,
}

impl Expression {
    pub fn compile(source: &str) -> Self {
        Self {
            source: source.to_string(),
            compiled: parser::parse_expression(source),
        }
    }

    /// An expression that always yields `value`
    pub fn constant(value: Value) -> Self {
        Self {
            source: value.to_string(),
            compiled: Ok(Expr::Literal(value)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn compile_error(&self) -> Option<&ExpressionError> {
        self.compiled.as_ref().err()
    }

    /// Evaluates against a document and element; the target record is not bound
    pub fn evaluate(&self, document: &Value, element: &Value) -> Result<Value, ExpressionError> {
        let expr = self.compiled.as_ref().map_err(Clone::clone)?;
        let scope = Scope::condition(document, element);
        eval::evaluate(expr, &scope).map(|value| value.into_owned())
    }

    /// Evaluates as a condition using JS truthiness
    pub fn test(&self, document: &Value, element: &Value) -> Result<bool, ExpressionError> {
        let expr = self.compiled.as_ref().map_err(Clone::clone)?;
        let scope = Scope::condition(document, element);
        eval::evaluate(expr, &scope).map(|value| eval::truthy(&value))
    }
}

impl From<String> for Expression {
    fn from(source: String) -> Self {
        Self::compile(&source)
    }
}

/// A compiled field mapping: one or more assignments into the output record
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "String")]
pub struct FieldMapping {
    source: String,
    compiled: Result<Vec<Assignment>, ExpressionError>,
}

impl FieldMapping {
    pub fn compile(source: &str) -> Self {
        Self {
            source: source.to_string(),
            compiled: parser::parse_assignments(source),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn compile_error(&self) -> Option<&ExpressionError> {
        self.compiled.as_ref().err()
    }

    /// Applies the assignments in order
    ///
    /// Stops at the first failing statement; fields written by earlier statements
    /// are kept.
    pub fn apply(
        &self,
        document: &Value,
        element: &Value,
        target: &mut Value,
    ) -> Result<(), ExpressionError> {
        let statements = self.compiled.as_ref().map_err(Clone::clone)?;
        for statement in statements {
            eval::execute(statement, document, element, target)?;
        }
        Ok(())
    }
}

impl From<String> for FieldMapping {
    fn from(source: String) -> Self {
        Self::compile(&source)
    }
}
