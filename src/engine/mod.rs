//! Controller / Lifecycle
//!
//! `Engine` is the crate's single public entry point: it owns the
//! discovered files' code-maps, the per-thread tracking state, and the
//! guarded state machine (`NotInitialized -> Idle -> Running -> Idle`)
//! that every other module's output ultimately depends on having been
//! called in the right order.

use crate::assertion::{self, Attribution, StackFrame};
use crate::classify::{Classification, Classifier};
use crate::codemap::{self, CodeMap};
use crate::config::Config;
use crate::discovery::DiscoveryCollaborator;
use crate::error::{CovResult, EngineError};
use crate::parser::{Parser, ParserLimits};
use crate::reconcile::{reconcile, TrackedFile};
use crate::report::ReportData;
use crate::scanner::scan_lines;
use crate::tracker::{self, TrackingState};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotInitialized,
    Idle,
    Running,
}

struct FileEntry {
    source: String,
    codemap: Option<CodeMap>,
    analysis_error: Option<String>,
}

thread_local! {
    /// Per-thread tracking buffer. Kept thread-local so the
    /// hot line-event path never takes a lock; a thread must call
    /// `Engine::merge_thread_state` before its state counts toward a report.
    static LOCAL_STATE: RefCell<IndexMap<PathBuf, TrackingState>> = RefCell::new(IndexMap::new());
}

pub struct Engine {
    config: Config,
    discovery: Box<dyn DiscoveryCollaborator>,
    classifier: Mutex<Classifier>,
    files: Mutex<IndexMap<PathBuf, FileEntry>>,
    global_state: Mutex<IndexMap<PathBuf, TrackingState>>,
    state: Mutex<EngineState>,
}

impl Engine {
    pub fn new(config: Config, discovery: Box<dyn DiscoveryCollaborator>) -> Self {
        Engine {
            classifier: Mutex::new(Classifier::new(config.clone())),
            config,
            discovery,
            files: Mutex::new(IndexMap::new()),
            global_state: Mutex::new(IndexMap::new()),
            state: Mutex::new(EngineState::NotInitialized),
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock().unwrap()
    }

    /// `NotInitialized -> Idle`. Runs discovery once so `discover_uncovered`
    /// files show up in reports even before anything executes.
    pub fn init(&self) -> CovResult<()> {
        let mut state = self.state.lock().unwrap();
        if *state != EngineState::NotInitialized {
            return Err(EngineError::Validation("init called outside NotInitialized state".to_string()));
        }
        if self.config.discover_uncovered {
            let discovered = self
                .discovery
                .discover(&self.config.source_dirs, &self.config.include, &self.config.exclude)?;
            for path in discovered {
                self.register_discovered_path(&path);
            }
        }
        *state = EngineState::Idle;
        debug!(files = self.files.lock().unwrap().len(), "engine initialized");
        Ok(())
    }

    fn register_discovered_path(&self, path: &Path) {
        let content = std::fs::read_to_string(path).ok();
        let classification = self.classifier.lock().unwrap().classify(path, content.as_deref());
        if classification != Classification::Source {
            return;
        }
        let Some(source) = content else {
            warn!(path = %path.display(), "discovered source file could not be read");
            return;
        };
        self.ensure_file_entry(path, source);
    }

    fn ensure_file_entry(&self, path: &Path, source: String) {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) {
            return;
        }
        let (codemap, analysis_error) = Self::build_codemap(&source, &self.config);
        files.insert(
            path.to_path_buf(),
            FileEntry {
                source,
                codemap,
                analysis_error,
            },
        );
    }

    fn build_codemap(source: &str, config: &Config) -> (Option<CodeMap>, Option<String>) {
        if !config.use_static_analysis {
            // Static analysis disabled: classify straight off the scanner,
            // the same degraded map a parse failure falls back to below.
            let scans = scan_lines(source);
            return (Some(codemap::build_from_scan(source, &scans, config)), None);
        }
        let limits = ParserLimits::from(config);
        match Parser::new(limits).parse(source) {
            Ok(ast) => {
                let scans = scan_lines(source);
                (Some(codemap::build(&ast, source, &scans, config)), None)
            }
            Err(err) => {
                // Scanner-only degradation: the AST-derived map is
                // unavailable, but line-level coverage still works and the
                // file still appears in the report.
                let scans = scan_lines(source);
                (Some(codemap::build_from_scan(source, &scans, config)), Some(err.to_string()))
            }
        }
    }

    /// `Idle -> Running`.
    pub fn start(&self) -> CovResult<()> {
        let mut state = self.state.lock().unwrap();
        if *state == EngineState::NotInitialized {
            return Err(EngineError::Validation("start called before init".to_string()));
        }
        *state = EngineState::Running;
        Ok(())
    }

    /// `Running -> Idle`. Tracking calls that arrive before the next
    /// `start()` are silently dropped.
    pub fn stop(&self) -> CovResult<()> {
        let mut state = self.state.lock().unwrap();
        if *state == EngineState::NotInitialized {
            return Err(EngineError::Validation("stop called before init".to_string()));
        }
        self.merge_thread_state();
        *state = EngineState::Idle;
        Ok(())
    }

    /// Clears all tracking marks but keeps discovered files and code-maps.
    pub fn reset(&self) -> CovResult<()> {
        if self.state() == EngineState::NotInitialized {
            return Err(EngineError::Validation("reset called before init".to_string()));
        }
        LOCAL_STATE.with(|s| s.borrow_mut().clear());
        for tracking in self.global_state.lock().unwrap().values_mut() {
            tracking.clear();
        }
        Ok(())
    }

    /// Drops all tracking state *and* every cached code-map, as if the
    /// engine had just been constructed, short of re-running discovery.
    pub fn full_reset(&self) -> CovResult<()> {
        self.reset()?;
        self.global_state.lock().unwrap().clear();
        self.files.lock().unwrap().clear();
        Ok(())
    }

    /// Registers (or re-registers) a file's source text, building its
    /// code-map if static analysis is enabled. Safe to call repeatedly;
    /// subsequent calls with the same path are no-ops for the code-map
    /// (it's parsed once and cached) but do not touch tracking state.
    ///
    /// A file that classifies as anything other than `Source` (a test file,
    /// a framework-excluded path, or an irrelevant file) is not registered
    /// and never appears in the report — the caller can still track
    /// assertions or lines against it (e.g. to resolve a test frame's own
    /// classification during stack-walk attribution), those calls are just
    /// no-ops since no `FileEntry` exists to hold the state.
    pub fn track_file(&self, path: impl AsRef<Path>, source: impl Into<String>) -> CovResult<()> {
        let path = path.as_ref();
        let source = source.into();
        let classification = self.classifier.lock().unwrap().classify(path, Some(&source));
        if classification != Classification::Source {
            return Ok(());
        }
        self.ensure_file_entry(path, source);
        Ok(())
    }

    fn with_local_state(&self, path: &Path, f: impl FnOnce(&mut TrackingState, Option<&CodeMap>)) -> bool {
        if self.state() != EngineState::Running {
            return false;
        }
        let files = self.files.lock().unwrap();
        let Some(entry) = files.get(path) else {
            return false;
        };
        let line_count = entry.codemap.as_ref().map(|m| m.line_count).unwrap_or(0);
        let codemap = entry.codemap.as_ref();
        LOCAL_STATE.with(|local| {
            let mut local = local.borrow_mut();
            let tracking = local.entry(path.to_path_buf()).or_insert_with(|| TrackingState::new(line_count));
            f(tracking, codemap);
        });
        true
    }

    pub fn track_line(&self, path: impl AsRef<Path>, line: usize) {
        let path = path.as_ref();
        self.with_local_state(path, |state, codemap| tracker::on_line_event(state, codemap, line));
    }

    pub fn track_function(&self, path: impl AsRef<Path>, line: usize) {
        let path = path.as_ref();
        self.with_local_state(path, |state, codemap| tracker::on_call_event(state, codemap, line));
    }

    pub fn track_block(&self, path: impl AsRef<Path>, block_id: &str) {
        let path = path.as_ref();
        self.with_local_state(path, |state, _codemap| state.mark_block_executed(block_id));
    }

    /// Records assertion-driven coverage: walks `stack` to find the test
    /// frame and the subject source frame beneath it, and marks the
    /// subject line `covered`, not merely `executed`. Returns the
    /// resolved attribution, or `None` if the stack never reaches a
    /// `Source` frame beneath a `Test` frame.
    pub fn track_assertion(&self, stack: &[StackFrame]) -> Option<Attribution> {
        let attribution = assertion::attribute(stack, |p| {
            self.classifier.lock().unwrap().classify(Path::new(p), None)
        })?;
        let subject = attribution.subject_frame.clone();
        self.with_local_state(Path::new(&subject.path), |state, _codemap| state.mark_line_covered(subject.line));
        Some(attribution)
    }

    /// Flushes the calling thread's tracking buffer into the engine's
    /// global state. Must be called by every worker thread before a final
    /// `get_report_data()` sees that thread's marks.
    pub fn merge_thread_state(&self) {
        LOCAL_STATE.with(|local| {
            let mut local = local.borrow_mut();
            let mut global = self.global_state.lock().unwrap();
            for (path, tracking) in local.drain(..) {
                global.entry(path).or_insert_with(|| TrackingState::new(tracking.executed.len().saturating_sub(1))).merge(&tracking);
            }
        });
    }

    pub fn was_line_executed(&self, path: impl AsRef<Path>, line: usize) -> bool {
        self.merge_thread_state();
        self.global_state
            .lock()
            .unwrap()
            .get(path.as_ref())
            .map(|s| s.was_executed(line))
            .unwrap_or(false)
    }

    pub fn was_line_covered(&self, path: impl AsRef<Path>, line: usize) -> bool {
        self.merge_thread_state();
        self.global_state
            .lock()
            .unwrap()
            .get(path.as_ref())
            .map(|s| s.was_covered(line))
            .unwrap_or(false)
    }

    /// Runs the reconciler over every tracked file and returns the report.
    pub fn get_report_data(&self) -> CovResult<ReportData> {
        self.merge_thread_state();
        let files = self.files.lock().unwrap();
        let mut global = self.global_state.lock().unwrap();

        let mut tracked = Vec::with_capacity(files.len());
        for (path, entry) in files.iter() {
            let codemap = match &entry.codemap {
                Some(m) => m,
                // `build_codemap` always produces a map, scan-only at worst;
                // unreachable in practice, kept so a future caller that
                // constructs a `FileEntry` without a map still degrades
                // gracefully instead of panicking.
                None => continue,
            };
            let state = global.entry(path.clone()).or_insert_with(|| TrackingState::new(codemap.line_count)).clone();
            tracked.push(TrackedFile {
                path: path.to_string_lossy().to_string(),
                source: entry.source.clone(),
                codemap,
                state,
                analysis_error: entry.analysis_error.clone(),
            });
        }
        Ok(reconcile(tracked, &self.config))
    }

    /// Raw, unreconciled per-line executed/covered bitmaps for `path` —
    /// the escape hatch for a caller that wants facts without the
    /// reconciler's derivation or patching applied.
    pub fn get_raw_data(&self, path: impl AsRef<Path>) -> Option<TrackingState> {
        self.merge_thread_state();
        self.global_state.lock().unwrap().get(path.as_ref()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::GlobWalker;

    fn engine() -> Engine {
        let mut config = Config::default();
        config.discover_uncovered = false;
        Engine::new(config, Box::new(GlobWalker))
    }

    #[test]
    fn lifecycle_guards_start_before_init() {
        let engine = engine();
        assert!(engine.start().is_err());
    }

    #[test]
    fn single_line_literal_is_covered_end_to_end() {
        let engine = engine();
        engine.init().unwrap();
        engine.start().unwrap();
        let path = PathBuf::from("sample.lua");
        engine.track_file(&path, "return 1\n").unwrap();
        engine.track_line(&path, 1);
        engine.stop().unwrap();
        assert!(engine.was_line_executed(&path, 1));
        let report = engine.get_report_data().unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].line_percentage, 100.0);
    }

    #[test]
    fn reset_clears_marks_but_keeps_codemap() {
        let engine = engine();
        engine.init().unwrap();
        engine.start().unwrap();
        let path = PathBuf::from("sample.lua");
        engine.track_file(&path, "return 1\n").unwrap();
        engine.track_line(&path, 1);
        engine.reset().unwrap();
        assert!(!engine.was_line_executed(&path, 1));
        assert_eq!(engine.files.lock().unwrap().len(), 1);
    }

    #[test]
    fn full_reset_drops_cached_codemap() {
        let engine = engine();
        engine.init().unwrap();
        engine.start().unwrap();
        let path = PathBuf::from("sample.lua");
        engine.track_file(&path, "return 1\n").unwrap();
        engine.full_reset().unwrap();
        assert_eq!(engine.files.lock().unwrap().len(), 0);
    }

    #[test]
    fn start_stop_start_stop_is_equivalent_to_one_cycle() {
        let engine = engine();
        engine.init().unwrap();
        let path = PathBuf::from("sample.lua");
        engine.track_file(&path, "return 1\nreturn 2\n").unwrap();

        engine.start().unwrap();
        engine.track_line(&path, 1);
        engine.stop().unwrap();
        engine.start().unwrap();
        engine.track_line(&path, 2);
        engine.stop().unwrap();

        assert!(engine.was_line_executed(&path, 1));
        assert!(engine.was_line_executed(&path, 2));
    }

    #[test]
    fn assertion_attribution_excludes_test_file_and_covers_subject_line() {
        // Default `exclude` globs also match `*_test.*` paths, which would
        // shadow the `Test` classification `assertion::attribute` needs to
        // find the test frame; clear it so the path resolves via
        // `is_test_path` instead.
        let mut config = Config::default();
        config.discover_uncovered = false;
        config.exclude = Vec::new();
        let engine = Engine::new(config, Box::new(GlobWalker));
        engine.init().unwrap();
        engine.start().unwrap();
        let lib_path = PathBuf::from("lib.lua");
        let test_path = PathBuf::from("foo_test.lua");
        engine.track_file(&lib_path, "function lib_add(a, b)\n  return a + b\nend\n").unwrap();
        engine.track_file(&test_path, "expect(lib_add(2, 3)).to_equal(5)\n").unwrap();

        let stack = vec![
            StackFrame { path: "assert.lua".to_string(), line: 1 },
            StackFrame { path: test_path.to_string_lossy().to_string(), line: 1 },
            StackFrame { path: lib_path.to_string_lossy().to_string(), line: 2 },
        ];
        let attribution = engine.track_assertion(&stack).unwrap();
        assert_eq!(attribution.subject_frame.line, 2);
        engine.stop().unwrap();

        assert!(engine.was_line_covered(&lib_path, 2));
        let report = engine.get_report_data().unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].path, "lib.lua");
    }

    #[test]
    fn parse_failure_falls_back_to_scanner_and_still_tracks_lines() {
        let engine = engine();
        engine.init().unwrap();
        engine.start().unwrap();
        let path = PathBuf::from("deep.lua");
        // deeply nested parens exceed the default max_nesting_depth
        let source = format!("return {}1{}\n", "(".repeat(200), ")".repeat(200));
        engine.track_file(&path, source).unwrap();
        engine.track_line(&path, 1);
        engine.stop().unwrap();

        let report = engine.get_report_data().unwrap();
        assert_eq!(report.files.len(), 1);
        assert!(report.files[0].analysis_error.is_some());
        assert!(report.files[0].functions.is_empty());
        assert!(report.files[0].lines.iter().find(|l| l.line == 1).unwrap().executed);
    }
}
