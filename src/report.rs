//! Report data model.
//!
//! Rendering (HTML/LCOV/text output) is an external collaborator's job —
//! this crate only emits the finished `ReportData`, serializable so any
//! renderer can consume it without depending on this crate's internal
//! types.

use crate::codemap::{BlockInfo, ConditionInfo, FunctionInfo, LineKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineState {
    pub line: usize,
    pub kind: LineKind,
    pub executed: bool,
    pub covered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionState {
    pub info: FunctionInfo,
    pub executed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockState {
    pub info: BlockInfo,
    pub executed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionState {
    pub info: ConditionInfo,
    pub took_true: bool,
    pub took_false: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub source: String,
    pub lines: Vec<LineState>,
    pub functions: Vec<FunctionState>,
    pub blocks: Vec<BlockState>,
    pub conditions: Vec<ConditionState>,
    pub line_percentage: f64,
    pub function_percentage: f64,
    pub block_percentage: f64,
    /// Weighted per-file percentage using the same formula as `Summary`.
    pub percentage: f64,
    /// Set when this file's code-map is partial (parse failure, timeout,
    /// or budget overrun) — renderers should flag the row as unreliable.
    pub analysis_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub files: usize,
    pub line_percentage: f64,
    pub function_percentage: f64,
    pub block_percentage: f64,
    pub percentage: f64,
    pub threshold: u8,
    pub passes_threshold: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub files: Vec<FileReport>,
    pub summary: Summary,
}
