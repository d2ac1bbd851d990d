//! Cross-module scenarios exercised through the public `Engine` API,
//! one per concrete end-to-end case the reconciler/engine pairing has
//! to get right.

use scriptcov::assertion::StackFrame;
use scriptcov::discovery::GlobWalker;
use scriptcov::{Config, Engine};
use std::path::PathBuf;

fn engine_with(config: Config) -> Engine {
    Engine::new(config, Box::new(GlobWalker))
}

fn bare_engine() -> Engine {
    let mut config = Config::default();
    config.discover_uncovered = false;
    engine_with(config)
}

#[test]
fn single_line_literal_reports_full_coverage() {
    let engine = bare_engine();
    engine.init().unwrap();
    engine.start().unwrap();
    let path = PathBuf::from("literal.lua");
    engine.track_file(&path, "return 1 + 2\n").unwrap();
    engine.track_line(&path, 1);
    engine.stop().unwrap();

    let report = engine.get_report_data().unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].line_percentage, 100.0);
    assert_eq!(report.files[0].percentage, 100.0);
}

#[test]
fn comment_only_file_reports_zero_percent_but_is_discovered() {
    let engine = bare_engine();
    engine.init().unwrap();
    engine.start().unwrap();
    let path = PathBuf::from("comments.lua");
    let source = "-- one\n-- two\n-- three\n-- four\n-- five\n-- six\n-- seven\n-- eight\n-- nine\n-- ten\n";
    engine.track_file(&path, source).unwrap();
    engine.stop().unwrap();

    let report = engine.get_report_data().unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].line_percentage, 0.0);
    assert_eq!(report.files[0].percentage, 0.0);
    assert!(report.files[0].analysis_error.is_none());
}

#[test]
fn if_else_without_else_branch_reports_partial_block_coverage() {
    let engine = bare_engine();
    engine.init().unwrap();
    engine.start().unwrap();
    let path = PathBuf::from("branch.lua");
    let source = "local function choose(x)\n  if x > 0 then\n    return 1\n  else\n    return -1\n  end\nend\nreturn choose(5)\n";
    engine.track_file(&path, source).unwrap();
    for line in [1, 2, 3, 7, 8] {
        engine.track_line(&path, line);
    }
    engine.stop().unwrap();

    let report = engine.get_report_data().unwrap();
    let file = &report.files[0];
    assert!(file.line_percentage > 0.0 && file.line_percentage < 100.0);
    let then_block = file.blocks.iter().find(|b| matches!(b.info.kind, scriptcov::codemap::BlockKind::Then)).unwrap();
    let else_block = file.blocks.iter().find(|b| matches!(b.info.kind, scriptcov::codemap::BlockKind::Else)).unwrap();
    assert!(then_block.executed);
    assert!(!else_block.executed);
}

#[test]
fn long_comment_with_trailing_active_code_is_fully_covered() {
    let engine = bare_engine();
    engine.init().unwrap();
    engine.start().unwrap();
    let path = PathBuf::from("longcomment.lua");
    let source = "--[[\nthis is a long comment\nspanning several lines\n]]\nreturn 42\n";
    engine.track_file(&path, source).unwrap();
    engine.track_line(&path, 5);
    engine.stop().unwrap();

    let report = engine.get_report_data().unwrap();
    let file = &report.files[0];
    assert_eq!(file.line_percentage, 100.0);
    for line in 1..=4 {
        let state = file.lines.iter().find(|l| l.line == line).unwrap();
        assert!(!matches!(state.kind, scriptcov::codemap::LineKind::Executable));
    }
}

#[test]
fn assertion_on_subject_file_marks_covered_and_excludes_test_file() {
    // Default `exclude` globs also match `*_test.*` paths, which would
    // shadow the `Test` classification the stack walk needs.
    let mut config = Config::default();
    config.discover_uncovered = false;
    config.exclude = Vec::new();
    let engine = engine_with(config);
    engine.init().unwrap();
    engine.start().unwrap();
    let lib_path = PathBuf::from("math_utils.lua");
    let test_path = PathBuf::from("math_utils_test.lua");
    engine.track_file(&lib_path, "function add(a, b)\n  return a + b\nend\n").unwrap();
    engine.track_file(&test_path, "expect(add(2, 2)).to_equal(4)\n").unwrap();

    let stack = vec![
        StackFrame { path: test_path.to_string_lossy().to_string(), line: 1 },
        StackFrame { path: lib_path.to_string_lossy().to_string(), line: 2 },
    ];
    let attribution = engine.track_assertion(&stack).unwrap();
    assert_eq!(attribution.subject_frame.path, "math_utils.lua");
    engine.stop().unwrap();

    assert!(engine.was_line_covered(&lib_path, 2));
    let report = engine.get_report_data().unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].path, "math_utils.lua");
}

#[test]
fn deeply_nested_file_falls_back_to_scanner_and_stays_in_the_report() {
    let engine = bare_engine();
    engine.init().unwrap();
    engine.start().unwrap();
    let path = PathBuf::from("pathological.lua");
    let source = format!("return {}1{}\n", "(".repeat(10_000), ")".repeat(10_000));
    engine.track_file(&path, source).unwrap();
    engine.track_line(&path, 1);
    engine.stop().unwrap();

    let report = engine.get_report_data().unwrap();
    assert_eq!(report.files.len(), 1);
    let file = &report.files[0];
    assert!(file.analysis_error.is_some());
    assert!(file.functions.is_empty());
    assert!(file.blocks.is_empty());
    assert!(file.lines.iter().find(|l| l.line == 1).unwrap().executed);
}
