//! Recursive Descent Parser for the Observed Scripting Language
//!
//! Consumes tokens from the lexer and produces an AST covering exactly the
//! surface the code-map builder needs: function definitions (local,
//! global, field, method, anonymous), `if/elseif/else`, `while`, `repeat …
//! until`, numeric and generic `for`, `do … end` blocks, assignment/local/
//! call/return/break statements, and a full expression grammar so condition
//! sub-trees (`and`/`or`/`not`/compare/call/literal/identifier) can be
//! extracted.
//!
//! Grammar (simplified):
//!   block      ::= stat*
//!   stat       ::= local | assign | exprstat | if | while | repeat
//!                | for | do | return | break | funcdecl
//!   expr       ::= or_expr
//!   or_expr    ::= and_expr ('or' and_expr)*
//!   and_expr   ::= cmp_expr ('and' cmp_expr)*
//!   cmp_expr   ::= concat_expr (('==' | '~=' | '<' | '<=' | '>' | '>=') concat_expr)*
//!   concat_expr::= add_expr ('..' add_expr)*
//!   add_expr   ::= mul_expr (('+' | '-') mul_expr)*
//!   mul_expr   ::= unary_expr (('*' | '/' | '%') unary_expr)*
//!   unary_expr ::= ('not' | '-' | '#') unary_expr | pow_expr
//!   pow_expr   ::= postfix_expr ('^' unary_expr)?
//!   postfix    ::= primary (call | index | field | method)*

use crate::ast::types::*;
use crate::error::ParseError;
use crate::parser::lexer::{Lexer, Token, TokenKind};
use crate::parser::types::{check_bracket_nesting, Deadline, ParserLimits};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    limits: ParserLimits,
    deadline: Option<Deadline>,
    depth: usize,
    node_count: usize,
}

impl Parser {
    pub fn new(limits: ParserLimits) -> Self {
        Parser {
            tokens: Vec::new(),
            pos: 0,
            limits,
            deadline: None,
            depth: 0,
            node_count: 0,
        }
    }

    /// Entry point: parses `source` into a `ScriptNode` or a `ParseError`.
    pub fn parse(&mut self, source: &str) -> Result<ScriptNode, ParseError> {
        if source.len() > self.limits.max_file_bytes {
            return Err(ParseError::FileTooLarge {
                size: source.len(),
                max: self.limits.max_file_bytes,
            });
        }
        check_bracket_nesting(source, self.limits.max_nesting_depth)?;

        self.deadline = Some(Deadline::new(self.limits.max_parse_seconds));
        self.tokens = Lexer::new(source).tokenize()?;
        self.pos = 0;
        self.depth = 0;
        self.node_count = 0;

        let block = self.parse_block(&[TokenKind::Eof])?;
        let span = Span {
            start: pos0(),
            end: self.current_pos(),
        };
        Ok(ScriptNode {
            statements: block.statements,
            span,
        })
    }

    // -- token stream helpers ------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(ParseError::syntax(
                format!("expected {}, found '{}'", what, tok.text),
                tok.line,
                tok.column,
            ))
        }
    }

    fn current_pos(&self) -> Position {
        let t = self.peek();
        Position {
            line: t.line,
            column: t.column,
            offset: t.offset,
        }
    }

    fn check_budget(&mut self) -> Result<(), ParseError> {
        self.node_count += 1;
        if self.node_count > self.limits.max_ast_nodes {
            return Err(ParseError::TooDeeplyNested {
                depth: self.node_count,
                max: self.limits.max_ast_nodes,
            });
        }
        if let Some(dl) = &self.deadline {
            if dl.exceeded() {
                return Err(ParseError::Timeout);
            }
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.limits.max_nesting_depth {
            return Err(ParseError::TooDeeplyNested {
                depth: self.depth,
                max: self.limits.max_nesting_depth,
            });
        }
        self.check_budget()
    }

    fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -- blocks & statements --------------------------------------------------

    const BLOCK_ENDERS: &'static [TokenKind] = &[
        TokenKind::Eof,
        TokenKind::End,
        TokenKind::Else,
        TokenKind::Elseif,
        TokenKind::Until,
    ];

    fn at_block_end(&self, terminators: &[TokenKind]) -> bool {
        terminators.contains(&self.peek_kind()) || Self::BLOCK_ENDERS.contains(&self.peek_kind())
    }

    fn parse_block(&mut self, terminators: &[TokenKind]) -> Result<Block, ParseError> {
        self.enter()?;
        let start = self.current_pos();
        let mut statements = Vec::new();
        while !self.at_block_end(terminators) {
            self.accept(TokenKind::Semi);
            if self.at_block_end(terminators) {
                break;
            }
            let stat = self.parse_statement()?;
            let is_return = matches!(stat.kind, StatKind::Return(_));
            statements.push(stat);
            if is_return {
                // `return` must be the last statement of a block.
                self.accept(TokenKind::Semi);
                break;
            }
        }
        let end = self.current_pos();
        self.exit();
        Ok(Block {
            statements,
            span: Span { start, end },
        })
    }

    fn parse_statement(&mut self) -> Result<StatNode, ParseError> {
        self.check_budget()?;
        let start = self.current_pos();
        let kind = match self.peek_kind() {
            TokenKind::Local => self.parse_local()?,
            TokenKind::If => StatKind::If(self.parse_if()?),
            TokenKind::While => StatKind::While(self.parse_while()?),
            TokenKind::Repeat => StatKind::Repeat(self.parse_repeat()?),
            TokenKind::For => self.parse_for()?,
            TokenKind::Do => {
                self.advance();
                let body = self.parse_block(&[TokenKind::End])?;
                self.expect(TokenKind::End, "'end' to close 'do'")?;
                StatKind::Do(body)
            }
            TokenKind::Function => {
                let f = self.parse_function_decl()?;
                StatKind::FunctionDecl(f)
            }
            TokenKind::Return => {
                self.advance();
                let mut exprs = Vec::new();
                if !self.at_block_end(&[]) && !self.check(TokenKind::Semi) {
                    exprs.push(self.parse_expr()?);
                    while self.accept(TokenKind::Comma).is_some() {
                        exprs.push(self.parse_expr()?);
                    }
                }
                StatKind::Return(exprs)
            }
            TokenKind::Break => {
                self.advance();
                StatKind::Break
            }
            TokenKind::Goto => {
                self.advance();
                let name = self.expect(TokenKind::Name, "label name")?.text;
                StatKind::Goto(name)
            }
            TokenKind::DColon => {
                self.advance();
                let name = self.expect(TokenKind::Name, "label name")?.text;
                self.expect(TokenKind::DColon, "'::' to close label")?;
                StatKind::Label(name)
            }
            _ => self.parse_assign_or_exprstat()?,
        };
        let end = self.current_pos();
        Ok(StatNode {
            kind,
            span: Span { start, end },
        })
    }

    fn parse_local(&mut self) -> Result<StatKind, ParseError> {
        self.advance(); // 'local'
        if self.check(TokenKind::Function) {
            self.advance();
            let header_line = self.peek().line;
            let name = self.expect(TokenKind::Name, "function name")?.text;
            let (params, has_varargs, body, span) = self.parse_function_body()?;
            return Ok(StatKind::LocalFunction(FunctionDefNode {
                target: FunctionTarget::Local(name),
                params,
                has_varargs,
                body,
                header_line,
                span,
            }));
        }
        let mut names = vec![self.expect(TokenKind::Name, "variable name")?.text];
        while self.accept(TokenKind::Comma).is_some() {
            names.push(self.expect(TokenKind::Name, "variable name")?.text);
        }
        let mut exprs = Vec::new();
        if self.accept(TokenKind::Assign).is_some() {
            exprs.push(self.parse_expr()?);
            while self.accept(TokenKind::Comma).is_some() {
                exprs.push(self.parse_expr()?);
            }
        }
        Ok(StatKind::Local { names, exprs })
    }

    fn parse_if(&mut self) -> Result<IfNode, ParseError> {
        let mut clauses = Vec::new();
        let if_line = self.peek().line;
        self.advance(); // 'if'
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Then, "'then'")?;
        let body = self.parse_block(&[TokenKind::Elseif, TokenKind::Else, TokenKind::End])?;
        clauses.push(IfClause {
            cond,
            body,
            line: if_line,
        });
        while self.check(TokenKind::Elseif) {
            let line = self.peek().line;
            self.advance();
            let cond = self.parse_expr()?;
            self.expect(TokenKind::Then, "'then'")?;
            let body = self.parse_block(&[TokenKind::Elseif, TokenKind::Else, TokenKind::End])?;
            clauses.push(IfClause { cond, body, line });
        }
        let mut else_body = None;
        let mut else_line = None;
        if self.check(TokenKind::Else) {
            else_line = Some(self.peek().line);
            self.advance();
            else_body = Some(self.parse_block(&[TokenKind::End])?);
        }
        self.expect(TokenKind::End, "'end' to close 'if'")?;
        Ok(IfNode {
            clauses,
            else_body,
            else_line,
        })
    }

    fn parse_while(&mut self) -> Result<WhileNode, ParseError> {
        self.advance(); // 'while'
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Do, "'do'")?;
        let body = self.parse_block(&[TokenKind::End])?;
        self.expect(TokenKind::End, "'end' to close 'while'")?;
        Ok(WhileNode { cond, body })
    }

    fn parse_repeat(&mut self) -> Result<RepeatNode, ParseError> {
        self.advance(); // 'repeat'
        let body = self.parse_block(&[TokenKind::Until])?;
        self.expect(TokenKind::Until, "'until'")?;
        let cond = self.parse_expr()?;
        Ok(RepeatNode { body, cond })
    }

    fn parse_for(&mut self) -> Result<StatKind, ParseError> {
        self.advance(); // 'for'
        let first = self.expect(TokenKind::Name, "loop variable")?.text;
        if self.check(TokenKind::Assign) {
            self.advance();
            let start = self.parse_expr()?;
            self.expect(TokenKind::Comma, "','")?;
            let stop = self.parse_expr()?;
            let step = if self.accept(TokenKind::Comma).is_some() {
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.expect(TokenKind::Do, "'do'")?;
            let body = self.parse_block(&[TokenKind::End])?;
            self.expect(TokenKind::End, "'end' to close 'for'")?;
            return Ok(StatKind::ForNumeric(ForNumericNode {
                var: first,
                start,
                stop,
                step,
                body,
            }));
        }
        let mut vars = vec![first];
        while self.accept(TokenKind::Comma).is_some() {
            vars.push(self.expect(TokenKind::Name, "loop variable")?.text);
        }
        self.expect(TokenKind::In, "'in'")?;
        let mut exprs = vec![self.parse_expr()?];
        while self.accept(TokenKind::Comma).is_some() {
            exprs.push(self.parse_expr()?);
        }
        self.expect(TokenKind::Do, "'do'")?;
        let body = self.parse_block(&[TokenKind::End])?;
        self.expect(TokenKind::End, "'end' to close 'for'")?;
        Ok(StatKind::ForIn(ForInNode { vars, exprs, body }))
    }

    /// Parses `(params) block end`, shared by `local function`, `function`,
    /// and anonymous function expressions.
    fn parse_function_body(&mut self) -> Result<(Vec<String>, bool, Block, Span), ParseError> {
        let start = self.current_pos();
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        let mut has_varargs = false;
        if !self.check(TokenKind::RParen) {
            loop {
                if self.accept(TokenKind::Ellipsis).is_some() {
                    has_varargs = true;
                    break;
                }
                params.push(self.expect(TokenKind::Name, "parameter name")?.text);
                if self.accept(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block(&[TokenKind::End])?;
        self.expect(TokenKind::End, "'end' to close function")?;
        let end = self.current_pos();
        Ok((params, has_varargs, body, Span { start, end }))
    }

    fn parse_function_decl(&mut self) -> Result<FunctionDefNode, ParseError> {
        let header_line = self.peek().line;
        self.advance(); // 'function'
        let mut path = vec![self.expect(TokenKind::Name, "function name")?.text];
        let mut is_method = false;
        let mut method_name = None;
        loop {
            if self.accept(TokenKind::Dot).is_some() {
                path.push(self.expect(TokenKind::Name, "field name")?.text);
            } else if self.accept(TokenKind::Colon).is_some() {
                method_name = Some(self.expect(TokenKind::Name, "method name")?.text);
                is_method = true;
                break;
            } else {
                break;
            }
        }
        let target = if is_method {
            FunctionTarget::Method(path, method_name.unwrap())
        } else if path.len() > 1 {
            FunctionTarget::Field(path)
        } else {
            FunctionTarget::Global(path.into_iter().next().unwrap())
        };
        let (mut params, has_varargs, body, span) = self.parse_function_body()?;
        if is_method {
            params.insert(0, "self".to_string());
        }
        Ok(FunctionDefNode {
            target,
            params,
            has_varargs,
            body,
            header_line,
            span,
        })
    }

    fn parse_assign_or_exprstat(&mut self) -> Result<StatKind, ParseError> {
        let first = self.parse_suffixed_expr()?;
        if self.check(TokenKind::Assign) || self.check(TokenKind::Comma) {
            let mut targets = vec![first];
            while self.accept(TokenKind::Comma).is_some() {
                targets.push(self.parse_suffixed_expr()?);
            }
            self.expect(TokenKind::Assign, "'='")?;
            let mut exprs = vec![self.parse_expr()?];
            while self.accept(TokenKind::Comma).is_some() {
                exprs.push(self.parse_expr()?);
            }
            return Ok(StatKind::Assign { targets, exprs });
        }
        Ok(StatKind::ExprStat(first))
    }

    // -- expressions ------------------------------------------------------

    pub fn parse_expr(&mut self) -> Result<ExprNode, ParseError> {
        self.check_budget()?;
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<ExprNode, ParseError> {
        let mut lhs = self.parse_and_expr()?;
        while self.check(TokenKind::Or) {
            let start = lhs.span.start;
            self.advance();
            let rhs = self.parse_and_expr()?;
            let end = rhs.span.end;
            lhs = ExprNode {
                kind: ExprKind::BinOp {
                    op: BinOp::Or,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: Span { start, end },
            };
        }
        Ok(lhs)
    }

    fn parse_and_expr(&mut self) -> Result<ExprNode, ParseError> {
        let mut lhs = self.parse_cmp_expr()?;
        while self.check(TokenKind::And) {
            let start = lhs.span.start;
            self.advance();
            let rhs = self.parse_cmp_expr()?;
            let end = rhs.span.end;
            lhs = ExprNode {
                kind: ExprKind::BinOp {
                    op: BinOp::And,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: Span { start, end },
            };
        }
        Ok(lhs)
    }

    fn parse_cmp_expr(&mut self) -> Result<ExprNode, ParseError> {
        let mut lhs = self.parse_concat_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            let start = lhs.span.start;
            self.advance();
            let rhs = self.parse_concat_expr()?;
            let end = rhs.span.end;
            lhs = ExprNode {
                kind: ExprKind::BinOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: Span { start, end },
            };
        }
        Ok(lhs)
    }

    fn parse_concat_expr(&mut self) -> Result<ExprNode, ParseError> {
        let lhs = self.parse_add_expr()?;
        if self.check(TokenKind::Concat) {
            let start = lhs.span.start;
            self.advance();
            // right-associative
            let rhs = self.parse_concat_expr()?;
            let end = rhs.span.end;
            return Ok(ExprNode {
                kind: ExprKind::BinOp {
                    op: BinOp::Concat,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: Span { start, end },
            });
        }
        Ok(lhs)
    }

    fn parse_add_expr(&mut self) -> Result<ExprNode, ParseError> {
        let mut lhs = self.parse_mul_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let start = lhs.span.start;
            self.advance();
            let rhs = self.parse_mul_expr()?;
            let end = rhs.span.end;
            lhs = ExprNode {
                kind: ExprKind::BinOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: Span { start, end },
            };
        }
        Ok(lhs)
    }

    fn parse_mul_expr(&mut self) -> Result<ExprNode, ParseError> {
        let mut lhs = self.parse_unary_expr()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let start = lhs.span.start;
            self.advance();
            let rhs = self.parse_unary_expr()?;
            let end = rhs.span.end;
            lhs = ExprNode {
                kind: ExprKind::BinOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: Span { start, end },
            };
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> Result<ExprNode, ParseError> {
        self.check_budget()?;
        let op = match self.peek_kind() {
            TokenKind::Not => Some(UnOp::Not),
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Hash => Some(UnOp::Len),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.current_pos();
            self.advance();
            let expr = self.parse_unary_expr()?;
            let end = expr.span.end;
            return Ok(ExprNode {
                kind: ExprKind::UnOp {
                    op,
                    expr: Box::new(expr),
                },
                span: Span { start, end },
            });
        }
        self.parse_pow_expr()
    }

    fn parse_pow_expr(&mut self) -> Result<ExprNode, ParseError> {
        let lhs = self.parse_suffixed_expr()?;
        if self.check(TokenKind::Caret) {
            let start = lhs.span.start;
            self.advance();
            // right-associative, binds tighter than unary on the right
            let rhs = self.parse_unary_expr()?;
            let end = rhs.span.end;
            return Ok(ExprNode {
                kind: ExprKind::BinOp {
                    op: BinOp::Pow,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span: Span { start, end },
            });
        }
        Ok(lhs)
    }

    fn parse_suffixed_expr(&mut self) -> Result<ExprNode, ParseError> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect(TokenKind::Name, "field name")?.text;
                    let end = self.current_pos();
                    let start = expr.span.start;
                    expr = ExprNode {
                        kind: ExprKind::Field(Box::new(expr), field),
                        span: Span { start, end },
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    let end = self.current_pos();
                    let start = expr.span.start;
                    expr = ExprNode {
                        kind: ExprKind::Index(Box::new(expr), Box::new(index)),
                        span: Span { start, end },
                    };
                }
                TokenKind::Colon => {
                    self.advance();
                    let method = self.expect(TokenKind::Name, "method name")?.text;
                    let args = self.parse_call_args()?;
                    let end = self.current_pos();
                    let start = expr.span.start;
                    expr = ExprNode {
                        kind: ExprKind::MethodCall {
                            receiver: Box::new(expr),
                            method,
                            args,
                        },
                        span: Span { start, end },
                    };
                }
                TokenKind::LParen | TokenKind::Str | TokenKind::LBrace => {
                    let args = self.parse_call_args()?;
                    let end = self.current_pos();
                    let start = expr.span.start;
                    expr = ExprNode {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span: Span { start, end },
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<ExprNode>, ParseError> {
        match self.peek_kind() {
            TokenKind::LParen => {
                self.advance();
                let mut args = Vec::new();
                if !self.check(TokenKind::RParen) {
                    args.push(self.parse_expr()?);
                    while self.accept(TokenKind::Comma).is_some() {
                        args.push(self.parse_expr()?);
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                Ok(args)
            }
            TokenKind::Str => {
                let tok = self.advance();
                Ok(vec![ExprNode {
                    kind: ExprKind::Str(tok.text),
                    span: Span {
                        start: Position {
                            line: tok.line,
                            column: tok.column,
                            offset: tok.offset,
                        },
                        end: self.current_pos(),
                    },
                }])
            }
            TokenKind::LBrace => {
                let table = self.parse_table()?;
                Ok(vec![table])
            }
            _ => {
                let tok = self.peek();
                Err(ParseError::syntax("expected call arguments", tok.line, tok.column))
            }
        }
    }

    fn parse_table(&mut self) -> Result<ExprNode, ParseError> {
        let start = self.current_pos();
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::LBracket) {
                self.advance();
                let key = self.parse_expr()?;
                self.expect(TokenKind::RBracket, "']'")?;
                self.expect(TokenKind::Assign, "'='")?;
                let value = self.parse_expr()?;
                fields.push(TableField::Indexed(key, value));
            } else if self.check(TokenKind::Name) && self.tokens[self.pos + 1].kind == TokenKind::Assign {
                let name = self.advance().text;
                self.advance(); // '='
                let value = self.parse_expr()?;
                fields.push(TableField::Named(name, value));
            } else {
                fields.push(TableField::Positional(self.parse_expr()?));
            }
            if self.accept(TokenKind::Comma).is_none() && self.accept(TokenKind::Semi).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}' to close table")?;
        let end = self.current_pos();
        Ok(ExprNode {
            kind: ExprKind::Table(fields),
            span: Span { start, end },
        })
    }

    fn parse_primary_expr(&mut self) -> Result<ExprNode, ParseError> {
        self.check_budget()?;
        let start = self.current_pos();
        match self.peek_kind() {
            TokenKind::Nil => {
                self.advance();
                Ok(ExprNode {
                    kind: ExprKind::Nil,
                    span: Span { start, end: self.current_pos() },
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(ExprNode {
                    kind: ExprKind::True,
                    span: Span { start, end: self.current_pos() },
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(ExprNode {
                    kind: ExprKind::False,
                    span: Span { start, end: self.current_pos() },
                })
            }
            TokenKind::Ellipsis => {
                self.advance();
                Ok(ExprNode {
                    kind: ExprKind::Vararg,
                    span: Span { start, end: self.current_pos() },
                })
            }
            TokenKind::Number => {
                let tok = self.advance();
                let value = parse_number_literal(&tok.text);
                Ok(ExprNode {
                    kind: ExprKind::Number(value),
                    span: Span { start, end: self.current_pos() },
                })
            }
            TokenKind::Str => {
                let tok = self.advance();
                Ok(ExprNode {
                    kind: ExprKind::Str(tok.text),
                    span: Span { start, end: self.current_pos() },
                })
            }
            TokenKind::Name => {
                let tok = self.advance();
                Ok(ExprNode {
                    kind: ExprKind::Ident(tok.text),
                    span: Span { start, end: self.current_pos() },
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(ExprNode {
                    kind: ExprKind::Paren(Box::new(inner)),
                    span: Span { start, end: self.current_pos() },
                })
            }
            TokenKind::LBrace => self.parse_table(),
            TokenKind::Function => {
                self.advance();
                let (params, has_varargs, body, span) = self.parse_function_body()?;
                Ok(ExprNode {
                    kind: ExprKind::Function(FunctionDefNode {
                        target: FunctionTarget::Anonymous,
                        params,
                        has_varargs,
                        body,
                        header_line: start.line,
                        span,
                    }),
                    span: Span { start, end: self.current_pos() },
                })
            }
            _ => {
                let tok = self.peek();
                Err(ParseError::syntax(
                    format!("unexpected token '{}'", tok.text),
                    tok.line,
                    tok.column,
                ))
            }
        }
    }
}

fn pos0() -> Position {
    Position {
        line: 1,
        column: 0,
        offset: 0,
    }
}

fn parse_number_literal(text: &str) -> f64 {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).unwrap_or(0) as f64;
    }
    text.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ScriptNode {
        Parser::new(ParserLimits::default()).parse(src).unwrap()
    }

    #[test]
    fn parses_empty_script() {
        let script = parse("");
        assert_eq!(script.statements.len(), 0);
    }

    #[test]
    fn parses_local_function_and_if() {
        let script = parse(
            "local function f(x)\n  if x > 0 then\n    return x\n  else\n    return -x\n  end\nend\nreturn f(5)\n",
        );
        assert_eq!(script.statements.len(), 2);
        match &script.statements[0].kind {
            StatKind::LocalFunction(f) => {
                assert_eq!(f.params, vec!["x".to_string()]);
                match &f.target {
                    FunctionTarget::Local(name) => assert_eq!(name, "f"),
                    _ => panic!("expected local target"),
                }
            }
            _ => panic!("expected local function"),
        }
    }

    #[test]
    fn parses_method_function_decl() {
        let script = parse("function lib:add(a, b)\n  return a + b\nend\n");
        match &script.statements[0].kind {
            StatKind::FunctionDecl(f) => {
                assert_eq!(f.params, vec!["self".to_string(), "a".to_string(), "b".to_string()]);
                match &f.target {
                    FunctionTarget::Method(path, name) => {
                        assert_eq!(path, &vec!["lib".to_string()]);
                        assert_eq!(name, "add");
                    }
                    _ => panic!("expected method target"),
                }
            }
            _ => panic!("expected function decl"),
        }
    }

    #[test]
    fn parses_module_field_function() {
        let script = parse("function lib.add(a, b)\n  return a + b\nend\n");
        match &script.statements[0].kind {
            StatKind::FunctionDecl(f) => match &f.target {
                FunctionTarget::Field(path) => assert_eq!(path, &vec!["lib".to_string(), "add".to_string()]),
                _ => panic!("expected field target"),
            },
            _ => panic!("expected function decl"),
        }
    }

    #[test]
    fn parses_for_loops() {
        let script = parse("for i = 1, 10 do\n  print(i)\nend\nfor k, v in pairs(t) do\n  print(k)\nend\n");
        assert!(matches!(script.statements[0].kind, StatKind::ForNumeric(_)));
        assert!(matches!(script.statements[1].kind, StatKind::ForIn(_)));
    }

    #[test]
    fn parses_and_or_condition_tree() {
        let script = parse("if a and b or not c then\n  return 1\nend\n");
        match &script.statements[0].kind {
            StatKind::If(ifnode) => {
                assert!(matches!(ifnode.clauses[0].cond.kind, ExprKind::BinOp { op: BinOp::Or, .. }));
            }
            _ => panic!("expected if"),
        }
    }

    #[test]
    fn rejects_oversized_input() {
        let mut limits = ParserLimits::default();
        limits.max_file_bytes = 4;
        let mut p = Parser::new(limits);
        let err = p.parse("return 1").unwrap_err();
        assert!(matches!(err, ParseError::FileTooLarge { .. }));
    }

    #[test]
    fn rejects_too_deeply_nested_input() {
        let mut limits = ParserLimits::default();
        limits.max_nesting_depth = 3;
        let mut p = Parser::new(limits);
        let src = "(".repeat(10) + &")".repeat(10);
        let err = p.parse(&src).unwrap_err();
        assert!(matches!(err, ParseError::TooDeeplyNested { .. }));
    }
}
