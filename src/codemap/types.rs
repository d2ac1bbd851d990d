//! Code-Map Types
//!
//! The static-analysis product for one file: per-line classification,
//! functions, the block forest, and the condition forest.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    Executable,
    NonExecutable,
    FunctionHeader,
    Branch,
    BlockEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKind {
    Global,
    Local,
    Method,
    ModuleField,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub id: String,
    pub name: String,
    pub kind: FunctionKind,
    pub params: Vec<String>,
    pub has_varargs: bool,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    If,
    Then,
    Else,
    While,
    Repeat,
    ForNumeric,
    ForIn,
    Function,
    Do,
    ForRange,
    ForBody,
    WhileBody,
    WhileCondition,
    RepeatBody,
    IfCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub id: String,
    pub kind: BlockKind,
    pub start_line: usize,
    pub end_line: usize,
    pub parent_id: Option<String>,
    pub children: Vec<String>,
    /// Ids of directly dominated sub-blocks, e.g. a `Then`/`Else` pair
    /// under an `If` block.
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionKind {
    And,
    Or,
    Not,
    Call,
    Compare,
    LiteralTrue,
    LiteralFalse,
    LiteralNil,
    Identifier,
    Paren,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionInfo {
    pub id: String,
    pub kind: ConditionKind,
    pub op: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub parent_id: Option<String>,
    pub components: Vec<String>,
}

/// The per-file static-analysis product. `lines` and `executable_lookup`
/// are 1-indexed via a leading sentinel at index 0 (never read).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeMap {
    pub line_count: usize,
    pub lines: Vec<LineKind>,
    pub executable_lookup: Vec<bool>,
    pub functions: Vec<FunctionInfo>,
    pub blocks: Vec<BlockInfo>,
    pub conditions: Vec<ConditionInfo>,
    /// Set when the builder exceeded its node/time budget and returned a
    /// best-effort partial map.
    pub partial: bool,
}

impl CodeMap {
    pub fn line_kind(&self, line: usize) -> LineKind {
        self.lines.get(line).copied().unwrap_or(LineKind::NonExecutable)
    }

    pub fn is_executable(&self, line: usize) -> bool {
        self.executable_lookup.get(line).copied().unwrap_or(false)
    }

    pub fn function_by_id(&self, id: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.id == id)
    }

    pub fn blocks_containing(&self, line: usize) -> Vec<&BlockInfo> {
        self.blocks
            .iter()
            .filter(|b| b.start_line <= line && line <= b.end_line)
            .collect()
    }

    /// Functions whose `[start_line, end_line]` contains `line`.
    pub fn functions_containing(&self, line: usize) -> Vec<&FunctionInfo> {
        self.functions
            .iter()
            .filter(|f| f.start_line <= line && line <= f.end_line)
            .collect()
    }

    pub fn block_index(&self) -> IndexMap<String, &BlockInfo> {
        self.blocks.iter().map(|b| (b.id.clone(), b)).collect()
    }
}
