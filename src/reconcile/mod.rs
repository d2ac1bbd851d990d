//! Reconciler
//!
//! The phase that turns (`CodeMap`, `TrackingState`) pairs, one per
//! tracked file, into the `ReportData` a renderer consumes. Runs, in
//! order: the patcher's defensive cleanup, function/block execution
//! derivation for hosts that only report line events, per-file and
//! aggregate statistics, and finally report emission. Each phase only
//! ever adds information or removes marks the patcher already decided
//! were invalid — it never invents new executed/covered state.

pub mod patcher;

use crate::codemap::CodeMap;
use crate::config::Config;
use crate::report::{BlockState, ConditionState, FileReport, FunctionState, LineState, ReportData, Summary};
use crate::tracker::TrackingState;

pub struct TrackedFile<'a> {
    pub path: String,
    pub source: String,
    pub codemap: &'a CodeMap,
    pub state: TrackingState,
    pub analysis_error: Option<String>,
}

/// A zero-denominator percentage (no executable lines, no functions, no
/// blocks) is emitted as 0, not 100 — "nothing to cover" is not the same
/// as "fully covered".
fn percentage(hit: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (hit as f64 / total as f64) * 100.0
    }
}

/// Derives function- and block-execution flags from the lines already
/// marked executed, for hosts whose hook only reports line events.
fn derive_structural_execution(codemap: &CodeMap, state: &mut TrackingState) {
    for func in &codemap.functions {
        if state.functions_executed.contains(&func.id) {
            continue;
        }
        if (func.start_line..=func.end_line).any(|l| state.was_executed(l)) {
            state.mark_function_executed(&func.id);
        }
    }
    for block in &codemap.blocks {
        if state.blocks_executed.contains(&block.id) {
            continue;
        }
        if (block.start_line..=block.end_line).any(|l| state.was_executed(l)) {
            state.mark_block_executed(&block.id);
        }
    }
}

fn weighted_percentage(config: &Config, line_pct: f64, function_pct: f64, block_pct: f64, has_blocks: bool) -> f64 {
    if config.track_blocks && has_blocks {
        0.35 * line_pct + 0.15 * function_pct + 0.50 * block_pct
    } else {
        0.8 * line_pct + 0.2 * function_pct
    }
}

pub fn reconcile(mut files: Vec<TrackedFile<'_>>, config: &Config) -> ReportData {
    let mut reports = Vec::with_capacity(files.len());

    let mut total_exec_hit = 0usize;
    let mut total_exec_lines = 0usize;
    let mut total_fn_hit = 0usize;
    let mut total_fn_count = 0usize;
    let mut total_block_hit = 0usize;
    let mut total_block_count = 0usize;

    for file in files.iter_mut() {
        patcher::patch(file.codemap, &mut file.state, config);
        derive_structural_execution(file.codemap, &mut file.state);

        let mut lines = Vec::with_capacity(file.codemap.line_count);
        let mut exec_hit = 0usize;
        let mut exec_total = 0usize;
        for line in 1..=file.codemap.line_count {
            let kind = file.codemap.line_kind(line);
            let executable = file.codemap.is_executable(line);
            let executed = file.state.was_executed(line);
            let covered = file.state.was_covered(line);
            if executable {
                exec_total += 1;
                if executed || covered {
                    exec_hit += 1;
                }
            }
            lines.push(LineState { line, kind, executed, covered });
        }

        let functions: Vec<FunctionState> = file
            .codemap
            .functions
            .iter()
            .map(|f| FunctionState {
                info: f.clone(),
                executed: file.state.functions_executed.contains(&f.id),
            })
            .collect();
        let fn_hit = functions.iter().filter(|f| f.executed).count();

        let blocks: Vec<BlockState> = file
            .codemap
            .blocks
            .iter()
            .map(|b| BlockState {
                info: b.clone(),
                executed: file.state.blocks_executed.contains(&b.id),
            })
            .collect();
        let block_hit = blocks.iter().filter(|b| b.executed).count();

        let conditions: Vec<ConditionState> = file
            .codemap
            .conditions
            .iter()
            .map(|c| ConditionState {
                info: c.clone(),
                took_true: file.state.conditions_true.contains(&c.id),
                took_false: file.state.conditions_false.contains(&c.id),
            })
            .collect();

        let line_pct = percentage(exec_hit, exec_total);
        let function_pct = percentage(fn_hit, functions.len());
        let block_pct = percentage(block_hit, blocks.len());
        let pct = weighted_percentage(config, line_pct, function_pct, block_pct, !blocks.is_empty());

        total_exec_hit += exec_hit;
        total_exec_lines += exec_total;
        total_fn_hit += fn_hit;
        total_fn_count += functions.len();
        total_block_hit += block_hit;
        total_block_count += blocks.len();

        reports.push(FileReport {
            path: file.path.clone(),
            source: file.source.clone(),
            lines,
            functions,
            blocks,
            conditions,
            line_percentage: line_pct,
            function_percentage: function_pct,
            block_percentage: block_pct,
            percentage: pct,
            analysis_error: file.analysis_error.clone(),
        });
    }

    let agg_line_pct = percentage(total_exec_hit, total_exec_lines);
    let agg_fn_pct = percentage(total_fn_hit, total_fn_count);
    let agg_block_pct = percentage(total_block_hit, total_block_count);
    let agg_pct = weighted_percentage(config, agg_line_pct, agg_fn_pct, agg_block_pct, total_block_count > 0);

    let summary = Summary {
        files: reports.len(),
        line_percentage: agg_line_pct,
        function_percentage: agg_fn_pct,
        block_percentage: agg_block_pct,
        percentage: agg_pct,
        threshold: config.threshold,
        passes_threshold: agg_pct >= config.threshold as f64,
    };

    ReportData { files: reports, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, ParserLimits};
    use crate::scanner::scan_lines;

    fn build_map(source: &str, config: &Config) -> CodeMap {
        let ast = Parser::new(ParserLimits::default()).parse(source).unwrap();
        let scans = scan_lines(source);
        crate::codemap::build(&ast, source, &scans, config)
    }

    #[test]
    fn if_else_branch_partially_covered_reports_partial_percentage() {
        let config = Config::default();
        let source = "local function f(x)\n  if x > 0 then\n    return 1\n  else\n    return -1\n  end\nend\nreturn f(5)\n";
        let map = build_map(source, &config);
        let mut state = TrackingState::new(map.line_count);
        for line in [1, 2, 3, 7, 8] {
            state.mark_line_executed(line);
        }
        let file = TrackedFile {
            path: "sample.lua".to_string(),
            source: source.to_string(),
            codemap: &map,
            state,
            analysis_error: None,
        };
        let report = reconcile(vec![file], &config);
        assert_eq!(report.files.len(), 1);
        assert!(report.files[0].line_percentage > 0.0 && report.files[0].line_percentage < 100.0);
        // else branch never taken
        assert!(!report.files[0].lines.iter().find(|l| l.line == 5).unwrap().executed);
    }

    #[test]
    fn comment_only_file_with_no_executable_lines_is_zero_percent() {
        let config = Config::default();
        let source = "-- nothing but comments\n-- still nothing\n";
        let map = build_map(source, &config);
        let state = TrackingState::new(map.line_count);
        let file = TrackedFile {
            path: "empty.lua".to_string(),
            source: source.to_string(),
            codemap: &map,
            state,
            analysis_error: None,
        };
        let report = reconcile(vec![file], &config);
        assert_eq!(report.files[0].line_percentage, 0.0);
        assert_eq!(report.files[0].percentage, 0.0);
    }
}
