//! Token definitions for the mapping expression language
//!
//! The lexer is generated with the logos derive macro. Keywords (`true`, `false`,
//! `null`, `undefined`) are lexed as identifiers and resolved by the parser.

use logos::Logos;
use std::ops::Range;

use crate::domain::errors::ExpressionError;

/// All tokens of the expression language
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    Str(String),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Access
    #[token(".")]
    Dot,
    #[token("?.")]
    OptionalDot,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    // Conditional and assignment
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("=")]
    Assign,

    // Comparison
    #[token("==")]
    LooseEq,
    #[token("!=")]
    LooseNe,
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNe,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,

    // Logical
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("??")]
    Coalesce,
    #[token("!")]
    Not,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
}

/// A token with its byte span in the source
pub type Spanned = (Token, Range<usize>);

/// Tokenizes an expression, failing on the first unrecognised character
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(ExpressionError::Syntax {
                    offset: span.start,
                    message: format!("unexpected input '{}'", lexer.slice()),
                })
            }
        }
    }

    Ok(tokens)
}

/// Strips the quotes of a string literal and resolves escapes
fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}
