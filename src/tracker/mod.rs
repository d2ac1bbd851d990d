//! Runtime Tracker
//!
//! Consumes line/call events from the host interpreter (real, via
//! `HostHookInstaller`, or synthesized by the instrumentation fallback) and
//! folds them into a file's `TrackingState`. Kept free of any global
//! storage itself — the engine owns the per-thread state map and calls
//! into these functions with the right `TrackingState` already in hand, so
//! event handling here is O(1) per call with no locking of its own.

pub mod hook;
pub mod instrument;
pub mod state;

pub use hook::{CallHookFn, HostHookInstaller, LineHookFn, NullHost};
pub use instrument::{instrument_source, TRACK_BLOCK, TRACK_CALL};
pub use state::TrackingState;

use crate::codemap::CodeMap;

/// Records a line execution event against `state`, and if `line` is a
/// function header in `codemap`, also marks that function executed.
pub fn on_line_event(state: &mut TrackingState, codemap: Option<&CodeMap>, line: usize) {
    state.mark_line_executed(line);
    if let Some(map) = codemap {
        for func in map.functions_containing(line) {
            if func.start_line == line {
                state.mark_function_executed(&func.id);
            }
        }
        for block in map.blocks_containing(line) {
            if block.start_line == line {
                state.mark_block_executed(&block.id);
            }
        }
    }
}

/// Records a call event: a function whose header starts at `line` was
/// invoked. Distinct from `on_line_event` because a host interpreter may
/// expose call entry without a matching line-execution event (e.g. a
/// function assigned but never textually re-entered through its header
/// line during tail calls).
pub fn on_call_event(state: &mut TrackingState, codemap: Option<&CodeMap>, line: usize) {
    state.mark_line_executed(line);
    if let Some(map) = codemap {
        for func in map.functions_containing(line) {
            if func.start_line == line {
                state.mark_function_executed(&func.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parser::Parser;
    use crate::parser::ParserLimits;
    use crate::scanner::scan_lines;

    fn build_map(source: &str) -> CodeMap {
        let ast = Parser::new(ParserLimits::default()).parse(source).unwrap();
        let scans = scan_lines(source);
        crate::codemap::build(&ast, source, &scans, &Config::default())
    }

    #[test]
    fn line_event_on_function_header_marks_function_executed() {
        let source = "local function f()\n  return 1\nend\n";
        let map = build_map(source);
        let mut state = TrackingState::new(map.line_count);
        on_line_event(&mut state, Some(&map), 1);
        assert!(state.functions_executed.contains(&map.functions[0].id));
    }

    #[test]
    fn line_event_on_plain_line_only_marks_executed() {
        let source = "local x = 1\nreturn x\n";
        let map = build_map(source);
        let mut state = TrackingState::new(map.line_count);
        on_line_event(&mut state, Some(&map), 1);
        assert!(state.was_executed(1));
        assert!(state.functions_executed.is_empty());
    }
}
