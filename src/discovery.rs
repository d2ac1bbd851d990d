//! File discovery (named only at its interface — walking the filesystem
//! is explicitly out of scope for this crate; `GlobWalker` is a minimal
//! default so the engine is runnable standalone, but a host embedding is
//! expected to supply its own `DiscoveryCollaborator` wired to its
//! existing project-file index).

use crate::error::EngineError;
use glob::Pattern;
use std::path::{Path, PathBuf};

pub trait DiscoveryCollaborator: Send + Sync {
    fn discover(&self, source_dirs: &[String], include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>, EngineError>;
}

/// Default discovery: recursively walks each `source_dir`, keeping paths
/// that match at least one `include` glob and no `exclude` glob.
pub struct GlobWalker;

impl GlobWalker {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), EngineError> {
        let entries = std::fs::read_dir(dir).map_err(|e| EngineError::io(dir.to_path_buf(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::io(dir.to_path_buf(), e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| EngineError::io(path.clone(), e))?;
            if file_type.is_dir() {
                Self::walk(&path, out)?;
            } else if file_type.is_file() {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl DiscoveryCollaborator for GlobWalker {
    fn discover(&self, source_dirs: &[String], include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>, EngineError> {
        let include_patterns: Vec<Pattern> = include.iter().filter_map(|p| Pattern::new(p).ok()).collect();
        let exclude_patterns: Vec<Pattern> = exclude.iter().filter_map(|p| Pattern::new(p).ok()).collect();

        let mut all = Vec::new();
        for dir in source_dirs {
            let root = Path::new(dir);
            if root.is_dir() {
                Self::walk(root, &mut all)?;
            } else if root.is_file() {
                all.push(root.to_path_buf());
            }
        }

        let filtered = all
            .into_iter()
            .filter(|p| {
                let candidate = p.to_string_lossy().replace('\\', "/");
                let included = include_patterns.is_empty() || include_patterns.iter().any(|pat| pat.matches(&candidate));
                let excluded = exclude_patterns.iter().any(|pat| pat.matches(&candidate));
                included && !excluded
            })
            .collect();
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walker_respects_include_and_exclude() {
        let dir = std::env::temp_dir().join(format!("scriptcov-discovery-test-{}", std::process::id()));
        fs::create_dir_all(dir.join("vendor")).unwrap();
        fs::write(dir.join("a.lua"), "return 1\n").unwrap();
        fs::write(dir.join("vendor").join("b.lua"), "return 2\n").unwrap();
        fs::write(dir.join("c.txt"), "not lua\n").unwrap();

        let walker = GlobWalker;
        let found = walker
            .discover(
                &[dir.to_string_lossy().to_string()],
                &["**/*.lua".to_string()],
                &["**/vendor/**".to_string()],
            )
            .unwrap();

        let names: Vec<String> = found.iter().map(|p| p.file_name().unwrap().to_string_lossy().to_string()).collect();
        assert!(names.contains(&"a.lua".to_string()));
        assert!(!names.contains(&"b.lua".to_string()));
        assert!(!names.contains(&"c.txt".to_string()));

        fs::remove_dir_all(&dir).ok();
    }
}
