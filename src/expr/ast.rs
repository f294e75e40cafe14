//! Expression syntax tree

use serde_json::Value;

/// Context bindings an expression can start from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// `d` / `document`: the whole document
    Document,
    /// `e` / `element`: the node being mapped
    Element,
    /// `t` / `target`: the output record under construction
    Target,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Field(String),
    Index(Box<Expr>),
    Method { name: String, args: Vec<Expr> },
}

/// One step of a member chain
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub accessor: Accessor,
    /// `?.` step: a null receiver short-circuits the rest of the chain to null
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path {
        base: Box<Expr>,
        segments: Vec<Segment>,
    },
    Root(Root),
    Call {
        function: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

/// `t.a.b = value`: a write into the output record
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Field path below the target root, outermost first
    pub path: Vec<String>,
    pub value: Expr,
}
