//! Abstract Syntax Tree Types for the Observed Scripting Language
//!
//! This module defines the AST for the Lua-shaped language this crate
//! targets (`local function … end`, `if … then … end`, `--` comments,
//! `[[ … ]]` long strings). It covers exactly the surface the code-map
//! builder needs to find every construct relevant to coverage — not a full
//! language implementation. Constructs this AST has no node for (metatables,
//! coroutines, goto/label targets) simply never appear; the scanner and the
//! heuristic line-classification fallback cover any line the AST doesn't
//! explain.

use std::fmt;

// =============================================================================
// BASE TYPES
// =============================================================================

/// Byte offset + line/column, 1-indexed line, 0-indexed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn start_line(&self) -> usize {
        self.start.line
    }

    pub fn end_line(&self) -> usize {
        self.end.line
    }
}

// =============================================================================
// SCRIPT & STATEMENTS
// =============================================================================

/// Root node: a complete parsed file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptNode {
    pub statements: Vec<StatNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<StatNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatNode {
    pub kind: StatKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatKind {
    /// `local function NAME(params) … end`
    LocalFunction(FunctionDefNode),
    /// `NAME = function(params) … end` or `T.a.b = function(params) … end`
    /// or `T:name(params) … end`-assignment form.
    FunctionDecl(FunctionDefNode),
    /// `local a, b = expr, expr`
    Local {
        names: Vec<String>,
        exprs: Vec<ExprNode>,
    },
    /// `a.b, c[1] = expr, expr`
    Assign {
        targets: Vec<ExprNode>,
        exprs: Vec<ExprNode>,
    },
    /// A call used as a statement: `print(x)`.
    ExprStat(ExprNode),
    Return(Vec<ExprNode>),
    Break,
    Goto(String),
    Label(String),
    If(IfNode),
    While(WhileNode),
    Repeat(RepeatNode),
    ForNumeric(ForNumericNode),
    ForIn(ForInNode),
    Do(Block),
}

/// Shared shape for named, anonymous, method, and module-field functions.
/// `target` disambiguates how the function is bound; the code-map builder's
/// naming-resolution order reads `target` to derive `FunctionKind`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefNode {
    pub target: FunctionTarget,
    pub params: Vec<String>,
    pub has_varargs: bool,
    pub body: Block,
    /// Line of the `function`/`local function` keyword.
    pub header_line: usize,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionTarget {
    /// `local function NAME`
    Local(String),
    /// `NAME = function …` (top-level name, not dotted)
    Global(String),
    /// `T.a.b = function …`
    Field(Vec<String>),
    /// `T:name(...) … end` (colon syntax; implicit `self` parameter)
    Method(Vec<String>, String),
    /// Anonymous function expression, e.g. passed as a callback argument.
    Anonymous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub cond: ExprNode,
    pub body: Block,
    /// Line of the `if`/`elseif` keyword that introduces this clause.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub clauses: Vec<IfClause>,
    pub else_body: Option<Block>,
    pub else_line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileNode {
    pub cond: ExprNode,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatNode {
    pub body: Block,
    pub cond: ExprNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForNumericNode {
    pub var: String,
    pub start: ExprNode,
    pub stop: ExprNode,
    pub step: Option<ExprNode>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForInNode {
    pub vars: Vec<String>,
    pub exprs: Vec<ExprNode>,
    pub body: Block,
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Nil,
    True,
    False,
    Vararg,
    Number(f64),
    Str(String),
    Ident(String),
    Index(Box<ExprNode>, Box<ExprNode>),
    Field(Box<ExprNode>, String),
    Call {
        callee: Box<ExprNode>,
        args: Vec<ExprNode>,
    },
    MethodCall {
        receiver: Box<ExprNode>,
        method: String,
        args: Vec<ExprNode>,
    },
    Function(FunctionDefNode),
    Table(Vec<TableField>),
    BinOp {
        op: BinOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    UnOp {
        op: UnOp,
        expr: Box<ExprNode>,
    },
    Paren(Box<ExprNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableField {
    Positional(ExprNode),
    Named(String, ExprNode),
    Indexed(ExprNode, ExprNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Eq => "==",
            BinOp::Ne => "~=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
            BinOp::Concat => "..",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
    Len,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl ScriptNode {
    pub fn empty() -> Self {
        ScriptNode {
            statements: Vec::new(),
            span: Span::default(),
        }
    }
}
