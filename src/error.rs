//! Error Taxonomy
//!
//! One enum per semantic error kind from the engine's failure model.
//! Nothing in this crate panics across the library boundary outside tests;
//! every fallible public entry point returns `CovResult<T>`.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used at the engine boundary.
pub type CovResult<T> = Result<T, EngineError>;

/// Errors surfaced by the parser. Carried separately from `EngineError` so
/// callers that only care about parsing (e.g. the code-map builder falling
/// back to the scanner) can match on it directly.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("parse error at {line}:{column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("input too large: {size} bytes exceeds max_file_bytes ({max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("nesting depth {depth} exceeds max_nesting_depth ({max})")]
    TooDeeplyNested { depth: usize, max: usize },

    #[error("parse exceeded max_parse_seconds budget")]
    Timeout,
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError::Syntax {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Top-level error taxonomy for the engine's public API.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("io error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("code-map builder exceeded its budget; partial map retained")]
    PartialMap,

    #[error("internal invariant violation: {0}")]
    RuntimeBug(String),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}
