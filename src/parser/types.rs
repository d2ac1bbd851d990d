//! Parser Types, Limits, and Shared Helpers
//!
//! Shared types and resource-limit plumbing used across the lexer and
//! parser. Limits are struct fields (`ParserLimits`), not hardcoded
//! constants, so a host can configure them
//! (`max_file_bytes`, `max_parse_seconds`, `max_nesting_depth`, …).

use crate::config::Config;
use crate::error::ParseError;
use std::time::{Duration, Instant};

/// Precomputed line-starts table: maps a byte offset to a 1-indexed line
/// number via binary search. Built once per source buffer so every token
/// and AST node can cheaply resolve its line/column.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the first character of each line, in order.
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0usize];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        LineIndex { starts }
    }

    /// 1-indexed line number containing `offset`.
    pub fn line_for_offset(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx, // idx-1 is the containing line (0-indexed) => idx is 1-indexed line
        }
    }

    /// 0-indexed column of `offset` within its line.
    pub fn column_for_offset(&self, offset: usize) -> usize {
        let line = self.line_for_offset(offset);
        offset - self.starts[line - 1]
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

/// Resource limits threaded through the lexer, parser, and code-map
/// builder. Constructed from `Config` so every budget is configurable
/// without hardcoding.
#[derive(Debug, Clone, Copy)]
pub struct ParserLimits {
    pub max_file_bytes: usize,
    pub max_parse_seconds: u64,
    pub max_ast_nodes: usize,
    pub max_nesting_depth: usize,
}

impl From<&Config> for ParserLimits {
    fn from(cfg: &Config) -> Self {
        ParserLimits {
            max_file_bytes: cfg.max_file_bytes,
            max_parse_seconds: cfg.max_parse_seconds,
            max_ast_nodes: cfg.max_ast_nodes,
            max_nesting_depth: cfg.max_nesting_depth,
        }
    }
}

impl Default for ParserLimits {
    fn default() -> Self {
        ParserLimits::from(&Config::default())
    }
}

/// Wall-clock budget tracker. Cheap to query; checked periodically rather
/// than on every token to keep the hot loop fast.
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(budget_seconds: u64) -> Self {
        Deadline {
            start: Instant::now(),
            budget: Duration::from_secs(budget_seconds),
        }
    }

    pub fn exceeded(&self) -> bool {
        self.start.elapsed() > self.budget
    }
}

/// Pre-scan the raw bracket nesting depth of `()`, `{}`, `[]` before
/// tokenizing, so pathological inputs are rejected cheaply.
/// Long-string/long-comment brackets (`[[`, `]]`) are not counted here —
/// they are handled by the lexer's own long-bracket state machine, mirrored
/// from the line scanner.
pub fn check_bracket_nesting(source: &str, max_depth: usize) -> Result<(), ParseError> {
    let mut depth = 0usize;
    for c in source.chars() {
        match c {
            '(' | '{' | '[' => {
                depth += 1;
                if depth > max_depth {
                    return Err(ParseError::TooDeeplyNested {
                        depth,
                        max: max_depth,
                    });
                }
            }
            ')' | '}' | ']' => {
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_maps_offsets() {
        let src = "a\nbb\nccc";
        let idx = LineIndex::new(src);
        assert_eq!(idx.line_for_offset(0), 1);
        assert_eq!(idx.line_for_offset(2), 2);
        assert_eq!(idx.line_for_offset(5), 3);
        assert_eq!(idx.line_count(), 3);
    }

    #[test]
    fn bracket_nesting_rejects_deep_input() {
        let deep = "(".repeat(5);
        assert!(check_bracket_nesting(&deep, 3).is_err());
        assert!(check_bracket_nesting(&deep, 10).is_ok());
    }
}
