//! Code-Map Builder
//!
//! Walks the parsed AST (falling back to the scanner's line map when the
//! AST is partial or missing) and produces the static-analysis product
//! the reconciler merges with runtime tracking data.

pub mod builder;
pub mod types;

pub use builder::{build, build_from_scan};
pub use types::{BlockInfo, BlockKind, CodeMap, ConditionInfo, ConditionKind, FunctionInfo, FunctionKind, LineKind};
