//! Code-Map Builder
//!
//! `build(ast, source, scanner_map) -> CodeMap`, the static-analysis
//! product the reconciler merges with runtime tracking data. Bounded by
//! `max_codemap_seconds` and `max_ast_nodes`; on budget overrun returns the
//! best partial map rather than panicking or erroring.

use crate::ast::types::*;
use crate::codemap::types::*;
use crate::config::Config;
use crate::parser::types::Deadline;
use crate::scanner::LineScan;
use lazy_static::lazy_static;
use regex_lite::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref FUNCTION_KEYWORD: Regex = Regex::new(r"\bfunction\b").unwrap();
    static ref EXEC_GLYPH: Regex = Regex::new(r"(=[^=]|\w+\s*\(|:\w+\s*\()").unwrap();
}

const TERMINATOR_EXACT: &[&str] = &["end", "end,", "end)", "else", "]", "}", "then", "do", "repeat", "elseif"];
const BRANCH_KEYWORDS: &[&str] = &["if", "elseif", "while", "for", "repeat"];

fn first_word(trimmed: &str) -> &str {
    let end = trimmed
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

struct Budget {
    max_nodes: usize,
    visited: usize,
    deadline: Deadline,
    exceeded: bool,
}

impl Budget {
    fn new(max_nodes: usize, max_seconds: u64) -> Self {
        Budget {
            max_nodes,
            visited: 0,
            deadline: Deadline::new(max_seconds),
            exceeded: false,
        }
    }

    fn tick(&mut self) -> bool {
        self.visited += 1;
        if self.visited > self.max_nodes || self.deadline.exceeded() {
            self.exceeded = true;
        }
        !self.exceeded
    }
}

struct Builder {
    budget: Budget,
    functions: Vec<FunctionInfo>,
    blocks: Vec<BlockInfo>,
    conditions: Vec<ConditionInfo>,
    exec_lines: HashSet<usize>,
    fn_seq: usize,
    block_seq: usize,
    cond_seq: usize,
    anon_seq: usize,
}

impl Builder {
    fn next_fn_id(&mut self) -> String {
        self.fn_seq += 1;
        format!("fn{}", self.fn_seq)
    }
    fn next_block_id(&mut self) -> String {
        self.block_seq += 1;
        format!("blk{}", self.block_seq)
    }
    fn next_cond_id(&mut self) -> String {
        self.cond_seq += 1;
        format!("cond{}", self.cond_seq)
    }

    fn register_block(
        &mut self,
        kind: BlockKind,
        start_line: usize,
        end_line: usize,
        parent_id: Option<String>,
    ) -> Option<String> {
        if start_line > end_line {
            return None; // degenerate zero-span constructs are skipped
        }
        let id = self.next_block_id();
        if let Some(p) = &parent_id {
            if let Some(parent) = self.blocks.iter_mut().find(|b| &b.id == p) {
                parent.children.push(id.clone());
            }
        }
        self.blocks.push(BlockInfo {
            id: id.clone(),
            kind,
            start_line,
            end_line,
            parent_id,
            children: Vec::new(),
            branches: Vec::new(),
        });
        Some(id)
    }

    fn add_branch(&mut self, owner_id: &str, branch_id: &str) {
        if let Some(owner) = self.blocks.iter_mut().find(|b| b.id == owner_id) {
            owner.branches.push(branch_id.to_string());
        }
    }

    fn register_function(
        &mut self,
        name: String,
        kind: FunctionKind,
        params: Vec<String>,
        def: &FunctionDefNode,
    ) -> String {
        let id = self.next_fn_id();
        self.functions.push(FunctionInfo {
            id: id.clone(),
            name,
            kind,
            params,
            has_varargs: def.has_varargs,
            start_line: def.header_line,
            end_line: def.body.span.end_line(),
        });
        id
    }

    fn walk_function_def(&mut self, def: &FunctionDefNode, name: String, kind: FunctionKind, parent_block: &str) {
        self.walk_function_def_with_params(def, name, kind, def.params.clone(), parent_block);
    }

    fn walk_function_def_with_params(
        &mut self,
        def: &FunctionDefNode,
        name: String,
        kind: FunctionKind,
        params: Vec<String>,
        parent_block: &str,
    ) {
        if !self.budget.tick() {
            return;
        }
        self.register_function(name, kind, params, def);
        let block_id = self.register_block(
            BlockKind::Function,
            def.body.span.start_line().max(def.header_line),
            def.body.span.end_line(),
            Some(parent_block.to_string()),
        );
        let owner = block_id.unwrap_or_else(|| parent_block.to_string());
        self.walk_block(&def.body, &owner);
    }

    fn flatten_field_path(expr: &ExprNode) -> Option<Vec<String>> {
        match &expr.kind {
            ExprKind::Ident(name) => Some(vec![name.clone()]),
            ExprKind::Field(base, field) => {
                let mut path = Self::flatten_field_path(base)?;
                path.push(field.clone());
                Some(path)
            }
            _ => None,
        }
    }

    /// Marks lines where an executable-tagged simple statement starts.
    fn mark_exec_stmt(&mut self, stat: &StatNode) {
        self.exec_lines.insert(stat.span.start_line());
    }

    fn walk_block(&mut self, block: &Block, parent_block: &str) {
        if !self.budget.tick() {
            return;
        }
        for stat in &block.statements {
            if !self.budget.tick() {
                return;
            }
            match &stat.kind {
                StatKind::LocalFunction(def) => {
                    let name = match &def.target {
                        FunctionTarget::Local(n) => n.clone(),
                        _ => format!("anonymous_{}", self.next_anon()),
                    };
                    self.walk_function_def(def, name, FunctionKind::Local, parent_block);
                }
                StatKind::FunctionDecl(def) => {
                    let (name, kind) = match &def.target {
                        FunctionTarget::Global(n) => (n.clone(), FunctionKind::Global),
                        FunctionTarget::Field(path) => (path.join("."), FunctionKind::ModuleField),
                        FunctionTarget::Method(path, m) => (format!("{}:{}", path.join("."), m), FunctionKind::Method),
                        FunctionTarget::Local(n) => (n.clone(), FunctionKind::Local),
                        FunctionTarget::Anonymous => (format!("anonymous_{}", self.next_anon()), FunctionKind::Anonymous),
                    };
                    self.walk_function_def(def, name, kind, parent_block);
                }
                StatKind::Local { names, exprs } => {
                    self.mark_exec_stmt(stat);
                    if names.len() == 1 && exprs.len() == 1 {
                        if let ExprKind::Function(def) = &exprs[0].kind {
                            self.walk_function_def(def, names[0].clone(), FunctionKind::Local, parent_block);
                            continue;
                        }
                    }
                    for e in exprs {
                        self.walk_expr(e, parent_block);
                    }
                }
                StatKind::Assign { targets, exprs } => {
                    self.mark_exec_stmt(stat);
                    if targets.len() == 1 && exprs.len() == 1 {
                        if let ExprKind::Function(def) = &exprs[0].kind {
                            if let Some(path) = Self::flatten_field_path(&targets[0]) {
                                let is_self_method = def.params.first().map(String::as_str) == Some("self");
                                let (name, kind, params) = if is_self_method {
                                    let name = if path.len() > 1 {
                                        format!("{}:{}", path[..path.len() - 1].join("."), path[path.len() - 1])
                                    } else {
                                        path[0].clone()
                                    };
                                    (name, FunctionKind::Method, def.params[1..].to_vec())
                                } else if path.len() == 1 {
                                    (path[0].clone(), FunctionKind::Global, def.params.clone())
                                } else {
                                    (path.join("."), FunctionKind::ModuleField, def.params.clone())
                                };
                                self.walk_function_def_with_params(def, name, kind, params, parent_block);
                                continue;
                            }
                        }
                    }
                    for t in targets {
                        self.walk_expr(t, parent_block);
                    }
                    for e in exprs {
                        self.walk_expr(e, parent_block);
                    }
                }
                StatKind::ExprStat(e) => {
                    self.mark_exec_stmt(stat);
                    self.walk_expr(e, parent_block);
                }
                StatKind::Return(exprs) => {
                    self.mark_exec_stmt(stat);
                    for e in exprs {
                        self.walk_expr(e, parent_block);
                    }
                }
                StatKind::Break => {
                    self.mark_exec_stmt(stat);
                }
                StatKind::Goto(_) => {
                    self.mark_exec_stmt(stat);
                }
                StatKind::Label(_) => {}
                StatKind::If(ifnode) => self.walk_if(stat, ifnode, parent_block),
                StatKind::While(w) => self.walk_while(stat, w, parent_block),
                StatKind::Repeat(r) => self.walk_repeat(stat, r, parent_block),
                StatKind::ForNumeric(f) => self.walk_for_numeric(stat, f, parent_block),
                StatKind::ForIn(f) => self.walk_for_in(stat, f, parent_block),
                StatKind::Do(body) => {
                    let id = self.register_block(
                        BlockKind::Do,
                        stat.span.start_line(),
                        body.span.end_line(),
                        Some(parent_block.to_string()),
                    );
                    self.walk_block(body, &id.unwrap_or_else(|| parent_block.to_string()));
                }
            }
        }
    }

    fn next_anon(&mut self) -> usize {
        self.anon_seq += 1;
        self.anon_seq
    }

    fn walk_if(&mut self, stat: &StatNode, ifnode: &IfNode, parent_block: &str) {
        let last_body_end = ifnode
            .else_body
            .as_ref()
            .map(|b| b.span.end_line())
            .unwrap_or_else(|| ifnode.clauses.last().map(|c| c.body.span.end_line()).unwrap_or(stat.span.start_line()));
        let if_id = self.register_block(BlockKind::If, stat.span.start_line(), last_body_end, Some(parent_block.to_string()));
        let owner = if_id.clone().unwrap_or_else(|| parent_block.to_string());

        for clause in &ifnode.clauses {
            if !self.budget.tick() {
                return;
            }
            let cond_block = self.register_block(
                BlockKind::IfCondition,
                clause.cond.span.start_line(),
                clause.cond.span.end_line(),
                if_id.clone(),
            );
            if let (Some(owner_id), Some(cb)) = (&if_id, &cond_block) {
                self.add_branch(owner_id, cb);
            }
            self.extract_condition(&clause.cond, None);

            let then_block = self.register_block(
                BlockKind::Then,
                clause.body.span.start_line(),
                clause.body.span.end_line(),
                if_id.clone(),
            );
            if let (Some(owner_id), Some(tb)) = (&if_id, &then_block) {
                self.add_branch(owner_id, tb);
            }
            self.walk_block(&clause.body, then_block.as_deref().unwrap_or(&owner));
        }

        if let Some(else_body) = &ifnode.else_body {
            let else_block = self.register_block(
                BlockKind::Else,
                else_body.span.start_line(),
                else_body.span.end_line(),
                if_id.clone(),
            );
            if let (Some(owner_id), Some(eb)) = (&if_id, &else_block) {
                self.add_branch(owner_id, eb);
            }
            self.walk_block(else_body, else_block.as_deref().unwrap_or(&owner));
        }
    }

    fn walk_while(&mut self, stat: &StatNode, w: &WhileNode, parent_block: &str) {
        let while_id = self.register_block(
            BlockKind::While,
            stat.span.start_line(),
            w.body.span.end_line(),
            Some(parent_block.to_string()),
        );
        let owner = while_id.clone().unwrap_or_else(|| parent_block.to_string());
        let cond_block = self.register_block(
            BlockKind::WhileCondition,
            w.cond.span.start_line(),
            w.cond.span.end_line(),
            while_id.clone(),
        );
        if let (Some(o), Some(cb)) = (&while_id, &cond_block) {
            self.add_branch(o, cb);
        }
        self.extract_condition(&w.cond, None);

        let body_block = self.register_block(BlockKind::WhileBody, w.body.span.start_line(), w.body.span.end_line(), while_id.clone());
        if let (Some(o), Some(bb)) = (&while_id, &body_block) {
            self.add_branch(o, bb);
        }
        self.walk_block(&w.body, body_block.as_deref().unwrap_or(&owner));
    }

    fn walk_repeat(&mut self, stat: &StatNode, r: &RepeatNode, parent_block: &str) {
        let repeat_id = self.register_block(
            BlockKind::Repeat,
            stat.span.start_line(),
            r.cond.span.end_line(),
            Some(parent_block.to_string()),
        );
        let owner = repeat_id.clone().unwrap_or_else(|| parent_block.to_string());
        let body_block = self.register_block(BlockKind::RepeatBody, r.body.span.start_line(), r.body.span.end_line(), repeat_id.clone());
        if let (Some(o), Some(bb)) = (&repeat_id, &body_block) {
            self.add_branch(o, bb);
        }
        self.walk_block(&r.body, body_block.as_deref().unwrap_or(&owner));
        // Trailing until-condition: extracted into the condition forest;
        // not a block, referenced by line range only.
        self.extract_condition(&r.cond, None);
    }

    fn walk_for_numeric(&mut self, stat: &StatNode, f: &ForNumericNode, parent_block: &str) {
        let for_id = self.register_block(
            BlockKind::ForNumeric,
            stat.span.start_line(),
            f.body.span.end_line(),
            Some(parent_block.to_string()),
        );
        let owner = for_id.clone().unwrap_or_else(|| parent_block.to_string());
        let range_end = f.body.span.start_line().max(stat.span.start_line());
        let range_block = self.register_block(BlockKind::ForRange, stat.span.start_line(), range_end, for_id.clone());
        if let (Some(o), Some(rb)) = (&for_id, &range_block) {
            self.add_branch(o, rb);
        }
        self.walk_expr(&f.start, &owner);
        self.walk_expr(&f.stop, &owner);
        if let Some(step) = &f.step {
            self.walk_expr(step, &owner);
        }
        let body_block = self.register_block(BlockKind::ForBody, f.body.span.start_line(), f.body.span.end_line(), for_id.clone());
        if let (Some(o), Some(bb)) = (&for_id, &body_block) {
            self.add_branch(o, bb);
        }
        self.walk_block(&f.body, body_block.as_deref().unwrap_or(&owner));
    }

    fn walk_for_in(&mut self, stat: &StatNode, f: &ForInNode, parent_block: &str) {
        let for_id = self.register_block(
            BlockKind::ForIn,
            stat.span.start_line(),
            f.body.span.end_line(),
            Some(parent_block.to_string()),
        );
        let owner = for_id.clone().unwrap_or_else(|| parent_block.to_string());
        let range_end = f.body.span.start_line().max(stat.span.start_line());
        let range_block = self.register_block(BlockKind::ForRange, stat.span.start_line(), range_end, for_id.clone());
        if let (Some(o), Some(rb)) = (&for_id, &range_block) {
            self.add_branch(o, rb);
        }
        for e in &f.exprs {
            self.walk_expr(e, &owner);
        }
        let body_block = self.register_block(BlockKind::ForBody, f.body.span.start_line(), f.body.span.end_line(), for_id.clone());
        if let (Some(o), Some(bb)) = (&for_id, &body_block) {
            self.add_branch(o, bb);
        }
        self.walk_block(&f.body, body_block.as_deref().unwrap_or(&owner));
    }

    /// Walks an arbitrary expression looking only for nested anonymous
    /// function literals (callback arguments, table field values, …).
    fn walk_expr(&mut self, expr: &ExprNode, parent_block: &str) {
        if !self.budget.tick() {
            return;
        }
        match &expr.kind {
            ExprKind::Function(def) => {
                let name = format!("anonymous_{}", self.next_anon());
                self.walk_function_def(def, name, FunctionKind::Anonymous, parent_block);
            }
            ExprKind::Call { callee, args } => {
                self.walk_expr(callee, parent_block);
                for a in args {
                    self.walk_expr(a, parent_block);
                }
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                self.walk_expr(receiver, parent_block);
                for a in args {
                    self.walk_expr(a, parent_block);
                }
            }
            ExprKind::Index(base, idx) => {
                self.walk_expr(base, parent_block);
                self.walk_expr(idx, parent_block);
            }
            ExprKind::Field(base, _) => self.walk_expr(base, parent_block),
            ExprKind::BinOp { lhs, rhs, .. } => {
                self.walk_expr(lhs, parent_block);
                self.walk_expr(rhs, parent_block);
            }
            ExprKind::UnOp { expr, .. } => self.walk_expr(expr, parent_block),
            ExprKind::Paren(inner) => self.walk_expr(inner, parent_block),
            ExprKind::Table(fields) => {
                for field in fields {
                    match field {
                        TableField::Positional(e) => self.walk_expr(e, parent_block),
                        TableField::Named(_, e) => self.walk_expr(e, parent_block),
                        TableField::Indexed(k, v) => {
                            self.walk_expr(k, parent_block);
                            self.walk_expr(v, parent_block);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Recursive descent over a condition expression subtree. Returns the
    /// id of the node created for `expr`.
    fn extract_condition(&mut self, expr: &ExprNode, parent_id: Option<&str>) -> String {
        let id = self.next_cond_id();
        let (kind, op, components) = match &expr.kind {
            ExprKind::BinOp { op: BinOp::And, lhs, rhs } => {
                let a = self.extract_condition(lhs, Some(&id));
                let b = self.extract_condition(rhs, Some(&id));
                (ConditionKind::And, Some("and".to_string()), vec![a, b])
            }
            ExprKind::BinOp { op: BinOp::Or, lhs, rhs } => {
                let a = self.extract_condition(lhs, Some(&id));
                let b = self.extract_condition(rhs, Some(&id));
                (ConditionKind::Or, Some("or".to_string()), vec![a, b])
            }
            ExprKind::BinOp { op, .. } if op.is_comparison() => (ConditionKind::Compare, Some(op.symbol().to_string()), vec![]),
            ExprKind::UnOp { op: UnOp::Not, expr } => {
                let a = self.extract_condition(expr, Some(&id));
                (ConditionKind::Not, None, vec![a])
            }
            ExprKind::Paren(inner) => {
                let a = self.extract_condition(inner, Some(&id));
                (ConditionKind::Paren, None, vec![a])
            }
            ExprKind::Call { .. } | ExprKind::MethodCall { .. } => (ConditionKind::Call, None, vec![]),
            ExprKind::True => (ConditionKind::LiteralTrue, None, vec![]),
            ExprKind::False => (ConditionKind::LiteralFalse, None, vec![]),
            ExprKind::Nil => (ConditionKind::LiteralNil, None, vec![]),
            _ => (ConditionKind::Identifier, None, vec![]),
        };
        self.conditions.push(ConditionInfo {
            id: id.clone(),
            kind,
            op,
            start_line: expr.span.start_line(),
            end_line: expr.span.end_line().max(expr.span.start_line()),
            parent_id: parent_id.map(|s| s.to_string()),
            components,
        });
        id
    }
}

/// Classifies every physical line by precedence order: scanner-observed
/// non-executable spans, comments and blanks, terminator keywords, branch
/// keywords, function headers, then AST-executable lines or a glyph
/// heuristic, given the scanner's output and the set of lines an
/// AST-executable statement starts on.
fn classify_lines(
    source_lines: &[&str],
    scanner_map: &[LineScan],
    exec_lines: &HashSet<usize>,
    treat_block_terminators_as_executable: bool,
) -> (Vec<LineKind>, Vec<bool>) {
    let line_count = source_lines.len();
    let mut lines = vec![LineKind::NonExecutable; line_count + 1];
    let mut executable = vec![false; line_count + 1];

    for i in 1..=line_count {
        let raw = source_lines[i - 1];
        let trimmed = raw.trim();
        let scan = scanner_map.get(i - 1).copied().unwrap_or(LineScan { non_executable: true });

        let kind = if scan.non_executable {
            LineKind::NonExecutable
        } else if trimmed.is_empty() || trimmed.starts_with("--") {
            LineKind::NonExecutable
        } else if TERMINATOR_EXACT.contains(&trimmed) || first_word(trimmed) == "until" {
            LineKind::BlockEnd
        } else if BRANCH_KEYWORDS.contains(&first_word(trimmed)) {
            LineKind::Branch
        } else if FUNCTION_KEYWORD.is_match(trimmed) {
            LineKind::FunctionHeader
        } else if exec_lines.contains(&i) || EXEC_GLYPH.is_match(trimmed) {
            LineKind::Executable
        } else {
            LineKind::NonExecutable
        };
        lines[i] = kind;
        executable[i] = matches!(kind, LineKind::Executable | LineKind::FunctionHeader | LineKind::Branch)
            || (kind == LineKind::BlockEnd && treat_block_terminators_as_executable);
    }
    (lines, executable)
}

/// Builds a degraded `CodeMap` from the line scanner alone, with no
/// functions, blocks, or conditions — used when the parser fails so a
/// source file can still report line-level coverage instead of vanishing
/// from the report entirely. Always `partial: true`.
pub fn build_from_scan(source: &str, scanner_map: &[LineScan], config: &Config) -> CodeMap {
    let source_lines: Vec<&str> = source.lines().collect();
    let line_count = source_lines.len();
    let (lines, executable_lookup) = classify_lines(
        &source_lines,
        scanner_map,
        &HashSet::new(),
        config.treat_block_terminators_as_executable,
    );
    CodeMap {
        line_count,
        lines,
        executable_lookup,
        functions: Vec::new(),
        blocks: Vec::new(),
        conditions: Vec::new(),
        partial: true,
    }
}

pub fn build(ast: &ScriptNode, source: &str, scanner_map: &[LineScan], config: &Config) -> CodeMap {
    let source_lines: Vec<&str> = source.lines().collect();
    let line_count = source_lines.len();

    let mut builder = Builder {
        budget: Budget::new(config.max_ast_nodes, config.max_codemap_seconds),
        functions: Vec::new(),
        blocks: Vec::new(),
        conditions: Vec::new(),
        exec_lines: HashSet::new(),
        fn_seq: 0,
        block_seq: 0,
        cond_seq: 0,
        anon_seq: 0,
    };

    let root_id = builder.next_block_id();
    builder.blocks.push(BlockInfo {
        id: root_id.clone(),
        kind: BlockKind::Do,
        start_line: 1,
        end_line: line_count.max(1),
        parent_id: None,
        children: Vec::new(),
        branches: Vec::new(),
    });

    let root_block = Block {
        statements: ast.statements.clone(),
        span: ast.span,
    };
    builder.walk_block(&root_block, &root_id);

    let (lines, executable_lookup) = classify_lines(
        &source_lines,
        scanner_map,
        &builder.exec_lines,
        config.treat_block_terminators_as_executable,
    );

    builder.functions.sort_by_key(|f| f.start_line);
    let partial = builder.budget.exceeded;

    CodeMap {
        line_count,
        lines,
        executable_lookup,
        functions: builder.functions,
        blocks: builder.blocks,
        conditions: builder.conditions,
        partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::parser::ParserLimits;
    use crate::scanner::scan_lines;

    #[test]
    fn scan_only_fallback_marks_executable_lines_without_functions() {
        let src = "print(\"a\")\n-- comment\nprint(\"b\")\n";
        let scans = scan_lines(src);
        let map = build_from_scan(src, &scans, &Config::default());
        assert!(map.partial);
        assert!(map.functions.is_empty());
        assert_eq!(map.line_kind(1), LineKind::Executable);
        assert_eq!(map.line_kind(2), LineKind::NonExecutable);
        assert_eq!(map.line_kind(3), LineKind::Executable);
    }

    fn build_for(source: &str) -> CodeMap {
        let ast = Parser::new(ParserLimits::default()).parse(source).unwrap();
        let scans = scan_lines(source);
        build(&ast, source, &scans, &Config::default())
    }

    #[test]
    fn classifies_if_else_scenario() {
        let src = "local function f(x)\n  if x > 0 then\n    return x\n  else\n    return -x\n  end\nend\nreturn f(5)\n";
        let map = build_for(src);
        assert_eq!(map.line_kind(1), LineKind::FunctionHeader);
        assert_eq!(map.line_kind(2), LineKind::Branch);
        assert_eq!(map.line_kind(3), LineKind::Executable);
        assert_eq!(map.line_kind(4), LineKind::BlockEnd); // else
        assert_eq!(map.line_kind(5), LineKind::Executable);
        assert_eq!(map.line_kind(6), LineKind::BlockEnd); // end (if)
        assert_eq!(map.line_kind(7), LineKind::BlockEnd); // end (function)
        assert_eq!(map.line_kind(8), LineKind::Executable);
        assert_eq!(map.functions.len(), 1);
        assert_eq!(map.functions[0].name, "f");
        assert_eq!(map.functions[0].start_line, 1);
        assert_eq!(map.functions[0].end_line, 7);

        let if_block = map.blocks.iter().find(|b| b.kind == BlockKind::If).unwrap();
        assert_eq!(if_block.branches.len(), 3); // IfCondition, Then, Else
        let then_block = map.blocks.iter().find(|b| b.kind == BlockKind::Then).unwrap();
        assert_eq!(then_block.start_line, 3);
        let else_block = map.blocks.iter().find(|b| b.kind == BlockKind::Else).unwrap();
        assert_eq!(else_block.start_line, 5);
    }

    #[test]
    fn comment_only_file_has_no_executable_lines() {
        let src = (0..10).map(|i| format!("-- line {}", i)).collect::<Vec<_>>().join("\n");
        let map = build_for(&src);
        assert!(map.lines[1..].iter().all(|l| *l == LineKind::NonExecutable));
        assert_eq!(map.executable_lookup.iter().filter(|b| **b).count(), 0);
    }

    #[test]
    fn long_comment_with_trailing_active_code() {
        let src = "--[[\nprint(\"noise\")\n]]\nprint(\"real\")\n";
        let map = build_for(src);
        assert_eq!(map.line_kind(1), LineKind::NonExecutable);
        assert_eq!(map.line_kind(2), LineKind::NonExecutable);
        assert_eq!(map.line_kind(3), LineKind::NonExecutable);
        assert_eq!(map.line_kind(4), LineKind::Executable);
    }

    #[test]
    fn and_or_condition_tree_has_components() {
        let src = "if a and b or not c then\n  return 1\nend\n";
        let map = build_for(src);
        let root = map.conditions.iter().find(|c| c.parent_id.is_none()).unwrap();
        assert_eq!(root.kind, ConditionKind::Or);
        let lhs_id = &root.components[0];
        let lhs = map.conditions.iter().find(|c| &c.id == lhs_id).unwrap();
        assert_eq!(lhs.kind, ConditionKind::And);
    }

    #[test]
    fn method_function_is_tracked_as_method_kind() {
        let src = "function lib:add(a, b)\n  return a + b\nend\n";
        let map = build_for(src);
        assert_eq!(map.functions[0].kind, FunctionKind::Method);
        assert_eq!(map.functions[0].params, vec!["self".to_string(), "a".to_string(), "b".to_string()]);
    }

    #[test]
    fn self_first_param_assignment_is_tracked_as_method_kind() {
        let src = "lib.add = function(self, a, b)\n  return a + b\nend\n";
        let map = build_for(src);
        assert_eq!(map.functions[0].kind, FunctionKind::Method);
        assert_eq!(map.functions[0].name, "lib:add");
        assert_eq!(map.functions[0].params, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn self_first_param_single_name_assignment_drops_leading_self() {
        let src = "add = function(self, a)\n  return a\nend\n";
        let map = build_for(src);
        assert_eq!(map.functions[0].kind, FunctionKind::Method);
        assert_eq!(map.functions[0].name, "add");
        assert_eq!(map.functions[0].params, vec!["a".to_string()]);
    }
}
