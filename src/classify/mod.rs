//! File Classifier
//!
//! Decides whether a discovered source path is tracked for coverage,
//! treated as a test file (excluded from the tracked set but still worth
//! naming in diagnostics), excluded by a framework-reserved pattern, or
//! simply irrelevant. Matching is glob-based against `Config::include` /
//! `Config::exclude`, backstopped by a fixed set of test-path and
//! test-content fingerprints so common test layouts are recognized even
//! when a project's globs don't mention them.

use crate::config::Config;
use glob::Pattern;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Source,
    Test,
    FrameworkExcluded,
    Other,
}

/// Path fragments that mark a file as a test file regardless of `include`.
const TEST_PATH_FRAGMENTS: &[&str] = &["/test/", "/tests/", "/spec/", "/specs/"];

/// Content fingerprints that mark a file as a test file when its path
/// alone doesn't give it away (e.g. a test colocated with its subject).
const TEST_CONTENT_FINGERPRINTS: &[&str] = &[
    "describe(",
    "it(",
    "expect(",
    "assert.",
    "before_each(",
    "after_each(",
];

fn matches_any(patterns: &[String], candidate: &str) -> bool {
    patterns.iter().any(|p| Pattern::new(p).map(|pat| pat.matches(candidate)).unwrap_or(false))
}

fn is_test_path(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    if name.contains("_test.") || name.contains("_spec.") || name.starts_with("test_") {
        return true;
    }
    let normalized = format!("/{}/", path.trim_matches('/'));
    TEST_PATH_FRAGMENTS.iter().any(|f| normalized.contains(f))
}

fn has_test_fingerprint(content: &str) -> bool {
    TEST_CONTENT_FINGERPRINTS.iter().any(|f| content.contains(f))
}

/// Memoizing classifier: discovery walks the same tree repeatedly across
/// start/stop cycles, so re-classifying every path is wasted work.
pub struct Classifier {
    config: Config,
    cache: HashMap<PathBuf, Classification>,
}

impl Classifier {
    pub fn new(config: Config) -> Self {
        Classifier {
            config,
            cache: HashMap::new(),
        }
    }

    pub fn classify(&mut self, path: &Path, content: Option<&str>) -> Classification {
        if let Some(c) = self.cache.get(path) {
            return *c;
        }
        let candidate = path.to_string_lossy().replace('\\', "/");

        let classification = if matches_any(&self.config.exclude, &candidate) {
            Classification::FrameworkExcluded
        } else if is_test_path(&candidate) {
            Classification::Test
        } else if content.map(has_test_fingerprint).unwrap_or(false) {
            Classification::Test
        } else if matches_any(&self.config.include, &candidate) {
            Classification::Source
        } else {
            Classification::Other
        };

        self.cache.insert(path.to_path_buf(), classification);
        classification
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(Config::default())
    }

    #[test]
    fn lua_source_file_is_classified_source() {
        let mut c = classifier();
        assert_eq!(c.classify(Path::new("src/widgets.lua"), None), Classification::Source);
    }

    #[test]
    fn path_under_tests_dir_is_classified_test() {
        let mut c = classifier();
        assert_eq!(c.classify(Path::new("tests/widgets_test.lua"), None), Classification::Test);
    }

    #[test]
    fn vendor_path_is_framework_excluded() {
        let mut c = classifier();
        assert_eq!(c.classify(Path::new("vendor/lib/foo.lua"), None), Classification::FrameworkExcluded);
    }

    #[test]
    fn colocated_file_with_test_fingerprint_is_classified_test() {
        let mut c = classifier();
        let content = "describe(\"widgets\", function()\n  it(\"works\", function() end)\nend)\n";
        assert_eq!(c.classify(Path::new("src/widgets_check.lua"), Some(content)), Classification::Test);
    }

    #[test]
    fn non_matching_extension_is_other() {
        let mut c = classifier();
        assert_eq!(c.classify(Path::new("README.md"), None), Classification::Other);
    }

    #[test]
    fn classification_is_memoized() {
        let mut c = classifier();
        let path = Path::new("src/a.lua");
        assert_eq!(c.classify(path, None), Classification::Source);
        assert_eq!(c.cache.len(), 1);
        c.classify(path, None);
        assert_eq!(c.cache.len(), 1);
    }
}
