//! Recursive descent parser
//!
//! Precedence, lowest first: `?:`, `??`, `||`, `&&`, equality, relational,
//! additive, multiplicative, unary, member access.

use super::ast::{Accessor, Assignment, BinaryOp, Expr, LogicalOp, Root, Segment, UnaryOp};
use super::eval::number_to_value;
use super::functions;
use super::lexer::{tokenize, Spanned, Token};
use crate::domain::errors::ExpressionError;
use serde_json::Value;

/// Deepest nesting of sub-expressions and unary operators accepted
pub const MAX_NESTING: usize = 128;

/// Parses a single expression, as used by rule conditions
pub fn parse_expression(source: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens, source.len());

    if parser.at_end() {
        return Err(parser.error("empty expression"));
    }
    let expr = parser.conditional()?;
    parser.eat(&Token::Semicolon);
    parser.expect_end()?;
    Ok(expr)
}

/// Parses a field mapping: one or more `;`-separated assignments into the target
pub fn parse_assignments(source: &str) -> Result<Vec<Assignment>, ExpressionError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens, source.len());
    let mut statements = Vec::new();

    loop {
        while parser.eat(&Token::Semicolon) {}
        if parser.at_end() {
            break;
        }
        statements.push(parser.assignment()?);
        if !parser.at_end() && !parser.eat(&Token::Semicolon) {
            return Err(parser.error("expected ';' between statements"));
        }
    }

    if statements.is_empty() {
        return Err(parser.error("empty field mapping"));
    }
    Ok(statements)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    source_len: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            source_len,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ExpressionError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn expect_end(&self) -> Result<(), ExpressionError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    /// Runs `parse` one nesting level deeper, failing past [`MAX_NESTING`]
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ExpressionError>,
    ) -> Result<T, ExpressionError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(&format!("expression nested deeper than {MAX_NESTING} levels")));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn error(&self, message: &str) -> ExpressionError {
        let offset = self
            .tokens
            .get(self.pos)
            .map_or(self.source_len, |(_, span)| span.start);
        let found = match self.peek() {
            Some(token) => format!("{token:?}"),
            None => "end of input".to_string(),
        };
        ExpressionError::Syntax {
            offset,
            message: format!("{message}, found {found}"),
        }
    }

    fn assignment(&mut self) -> Result<Assignment, ExpressionError> {
        let start = self.pos;
        let target = self.conditional()?;
        if !self.eat(&Token::Assign) {
            self.pos = start;
            return Err(self.error("field mapping must assign to the target record"));
        }
        let path = match assignment_path(&target) {
            Some(path) => path,
            None => {
                self.pos = start;
                return Err(self.error("left side of '=' must be a field of t"));
            }
        };
        let value = self.conditional()?;
        Ok(Assignment { path, value })
    }

    fn conditional(&mut self) -> Result<Expr, ExpressionError> {
        self.nested(Self::conditional_inner)
    }

    fn conditional_inner(&mut self) -> Result<Expr, ExpressionError> {
        let test = self.coalesce()?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.conditional()?;
        self.expect(&Token::Colon, "':' in conditional expression")?;
        let alternate = self.conditional()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn coalesce(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.or()?;
        while self.eat(&Token::Coalesce) {
            let right = self.or()?;
            left = logical(LogicalOp::Coalesce, left, right);
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            let right = self.and()?;
            left = logical(LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.equality()?;
        while self.eat(&Token::And) {
            let right = self.equality()?;
            left = logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::LooseEq) => BinaryOp::LooseEq,
                Some(Token::LooseNe) => BinaryOp::LooseNe,
                Some(Token::StrictEq) => BinaryOp::StrictEq,
                Some(Token::StrictNe) => BinaryOp::StrictNe,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.relational()?;
            left = binary(op, left, right);
        }
    }

    fn relational(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive()?;
            left = binary(op, left, right);
        }
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        self.nested(Self::unary_inner)
    }

    fn unary_inner(&mut self) -> Result<Expr, ExpressionError> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.primary()?;
        let mut segments = Vec::new();

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    segments.push(self.member(false)?);
                }
                Some(Token::OptionalDot) => {
                    self.pos += 1;
                    if self.eat(&Token::LBracket) {
                        segments.push(self.index(true)?);
                    } else {
                        segments.push(self.member(true)?);
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    segments.push(self.index(false)?);
                }
                _ => break,
            }
        }

        if segments.is_empty() {
            Ok(base)
        } else {
            Ok(Expr::Path {
                base: Box::new(base),
                segments,
            })
        }
    }

    /// `name` or `name(args)` after a dot
    fn member(&mut self, optional: bool) -> Result<Segment, ExpressionError> {
        let name = match self.peek() {
            Some(Token::Ident(name)) => name.clone(),
            _ => return Err(self.error("expected property name")),
        };
        self.pos += 1;

        let accessor = if self.eat(&Token::LParen) {
            if !functions::is_method(&name) {
                return Err(ExpressionError::UnknownFunction(name));
            }
            Accessor::Method {
                name,
                args: self.arguments()?,
            }
        } else {
            Accessor::Field(name)
        };

        Ok(Segment { accessor, optional })
    }

    /// `[expr]` after the opening bracket
    fn index(&mut self, optional: bool) -> Result<Segment, ExpressionError> {
        let index = self.conditional()?;
        self.expect(&Token::RBracket, "']'")?;
        Ok(Segment {
            accessor: Accessor::Index(Box::new(index)),
            optional,
        })
    }

    /// Comma separated arguments after the opening parenthesis
    fn arguments(&mut self) -> Result<Vec<Expr>, ExpressionError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.conditional()?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(&Token::Comma, "',' or ')'")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = match self.advance() {
            Some(token) => token,
            None => return Err(self.error("expected an expression")),
        };

        match token {
            Token::Number(n) => Ok(Expr::Literal(number_to_value(*n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s.clone()))),
            Token::LParen => {
                let inner = self.conditional()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                "d" | "document" => Ok(Expr::Root(Root::Document)),
                "e" | "element" => Ok(Expr::Root(Root::Element)),
                "t" | "target" => Ok(Expr::Root(Root::Target)),
                _ if self.peek() == Some(&Token::LParen) => {
                    self.pos += 1;
                    if !functions::is_function(name) {
                        return Err(ExpressionError::UnknownFunction(name.clone()));
                    }
                    Ok(Expr::Call {
                        function: name.clone(),
                        args: self.arguments()?,
                    })
                }
                _ => {
                    self.pos -= 1;
                    Err(self.error(&format!("unknown identifier '{name}'")))
                }
            },
            _ => {
                self.pos -= 1;
                Err(self.error("expected an expression"))
            }
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Field path of an assignable `t.a["b"].c` chain
fn assignment_path(target: &Expr) -> Option<Vec<String>> {
    let Expr::Path { base, segments } = target else {
        return None;
    };
    if **base != Expr::Root(Root::Target) {
        return None;
    }

    segments
        .iter()
        .map(|segment| {
            if segment.optional {
                return None;
            }
            match &segment.accessor {
                Accessor::Field(name) => Some(name.clone()),
                Accessor::Index(index) => match index.as_ref() {
                    Expr::Literal(Value::String(s)) => Some(s.clone()),
                    Expr::Literal(Value::Number(n)) => Some(n.to_string()),
                    _ => None,
                },
                Accessor::Method { .. } => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3 == 7 && !false").unwrap();
        let Expr::Logical { op, left, .. } = expr else {
            panic!("expected logical");
        };
        assert_eq!(op, LogicalOp::And);
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::LooseEq, .. }));
    }

    #[test]
    fn test_member_chain() {
        let expr = parse_expression("e.content.idDato('X')?.VALOR").unwrap();
        let Expr::Path { base, segments } = expr else {
            panic!("expected path");
        };
        assert_eq!(*base, Expr::Root(Root::Element));
        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[1].accessor, Accessor::Method { ref name, .. } if name == "idDato"));
        assert!(segments[2].optional);
    }

    #[test]
    fn test_literals_and_roots() {
        assert_eq!(parse_expression("null").unwrap(), Expr::Literal(Value::Null));
        assert_eq!(parse_expression("42").unwrap(), Expr::Literal(json!(42)));
        assert_eq!(parse_expression("document").unwrap(), Expr::Root(Root::Document));
        assert_eq!(parse_expression("'x';").unwrap(), Expr::Literal(json!("x")));
    }

    #[test]
    fn test_assignments() {
        let statements = parse_assignments("t.A = 1; t[\"B\"] = e.VALOR; t.c.d = 'x';").unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].path, vec!["A"]);
        assert_eq!(statements[1].path, vec!["B"]);
        assert_eq!(statements[2].path, vec!["c", "d"]);
    }

    #[test]
    fn test_assignment_requires_target() {
        assert!(parse_assignments("e.A = 1").is_err());
        assert!(parse_assignments("t = 1").is_err());
        assert!(parse_assignments("t.A").is_err());
        assert!(parse_assignments("  ").is_err());
    }

    #[test]
    fn test_unknown_function_rejected_at_compile() {
        assert_eq!(
            parse_expression("system('ls')").unwrap_err(),
            ExpressionError::UnknownFunction("system".to_string())
        );
        assert_eq!(
            parse_expression("e.content.map(1)").unwrap_err(),
            ExpressionError::UnknownFunction("map".to_string())
        );
    }

    #[test]
    fn test_nesting_limit() {
        let bangs = format!("{}true", "!".repeat(10_000));
        assert!(matches!(parse_expression(&bangs), Err(ExpressionError::Syntax { .. })));

        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(parse_expression(&parens), Err(ExpressionError::Syntax { .. })));

        let mapping = format!("t.A = {}e.V{}", "upper(".repeat(5_000), ")".repeat(5_000));
        assert!(matches!(parse_assignments(&mapping), Err(ExpressionError::Syntax { .. })));

        let shallow = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert!(parse_expression(&shallow).is_ok());
        assert!(parse_expression("!!!!true").is_ok());
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse_expression("e.A =="), Err(ExpressionError::Syntax { .. })));
        assert!(matches!(parse_expression("(1 + 2"), Err(ExpressionError::Syntax { .. })));
        assert!(matches!(parse_expression("a ? 1"), Err(ExpressionError::Syntax { .. })));
        assert!(matches!(parse_expression("foo"), Err(ExpressionError::Syntax { .. })));
        assert!(matches!(parse_expression("1 2"), Err(ExpressionError::Syntax { .. })));
    }
}
