//! Engine configuration.
//!
//! Plain data, `Default` carrying every documented default. Loading a
//! `Config` from a file, environment, or CLI flags is an external
//! collaborator's job — this crate only consumes the finished struct.

use serde::{Deserialize, Serialize};

/// Default glob patterns excluded from discovery and classified
/// `FrameworkExcluded` regardless of `include`.
pub fn default_exclude() -> Vec<String> {
    vec![
        "**/vendor/**".to_string(),
        "**/deps/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/*_test.*".to_string(),
        "**/*_spec.*".to_string(),
        "**/test_*.*".to_string(),
        "**/test/**".to_string(),
        "**/tests/**".to_string(),
        "**/spec/**".to_string(),
        "**/specs/**".to_string(),
    ]
}

pub fn default_include() -> Vec<String> {
    vec!["**/*.lua".to_string()]
}

pub fn default_source_dirs() -> Vec<String> {
    vec![".".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
    pub source_dirs: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub discover_uncovered: bool,
    pub threshold: u8,
    pub use_static_analysis: bool,
    pub treat_block_terminators_as_executable: bool,
    pub track_blocks: bool,
    pub track_functions: bool,
    pub pre_analyze_files: bool,
    pub cache_parsed_files: bool,
    pub max_file_bytes: usize,
    pub max_parse_seconds: u64,
    pub max_codemap_seconds: u64,
    pub max_ast_nodes: usize,
    pub max_nesting_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            enabled: false,
            source_dirs: default_source_dirs(),
            include: default_include(),
            exclude: default_exclude(),
            discover_uncovered: true,
            threshold: 90,
            use_static_analysis: true,
            treat_block_terminators_as_executable: true,
            track_blocks: true,
            track_functions: true,
            pre_analyze_files: false,
            cache_parsed_files: true,
            max_file_bytes: 1_048_576,
            max_parse_seconds: 60,
            max_codemap_seconds: 120,
            max_ast_nodes: 50_000,
            max_nesting_depth: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.threshold, 90);
        assert_eq!(cfg.max_file_bytes, 1_048_576);
        assert_eq!(cfg.max_parse_seconds, 60);
        assert_eq!(cfg.max_codemap_seconds, 120);
        assert_eq!(cfg.max_nesting_depth, 100);
        assert!(cfg.treat_block_terminators_as_executable);
        assert!(cfg.discover_uncovered);
    }
}
