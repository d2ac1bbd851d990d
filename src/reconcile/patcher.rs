//! Patcher
//!
//! A defensive cleanup pass: clears any execution/coverage mark on a line
//! the code-map does not consider executable. This can only happen when a
//! host's instrumentation mis-fires (e.g. a line hook callback registered
//! against stale line numbers after a file changed on disk) — the clean
//! path never marks a non-executable line in the first place. Applying the
//! patch is idempotent: a line already clear stays clear, so running it
//! twice over the same `(codemap, state)` pair is indistinguishable from
//! running it once.

use crate::codemap::CodeMap;
use crate::config::Config;
use crate::tracker::TrackingState;

pub fn patch(codemap: &CodeMap, state: &mut TrackingState, config: &Config) {
    for line in 1..=codemap.line_count {
        let executable = codemap.is_executable(line)
            && (config.treat_block_terminators_as_executable || codemap.line_kind(line) != crate::codemap::LineKind::BlockEnd);
        if !executable {
            if let Some(v) = state.executed.get_mut(line) {
                *v = false;
            }
            if let Some(v) = state.covered.get_mut(line) {
                *v = false;
            }
        }
    }
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
    fn clears_marks_on_non_executable_lines() {
        let config = Config::default();
        let source = "-- comment\nreturn 1\n";
        let map = build_map(source, &config);
        let mut state = TrackingState::new(map.line_count);
        state.mark_line_covered(1); // wrongly marked a comment line
        state.mark_line_covered(2);
        patch(&map, &mut state, &config);
        assert!(!state.was_executed(1));
        assert!(state.was_covered(2));
    }

    #[test]
    fn patch_is_idempotent() {
        let config = Config::default();
        let source = "-- comment\nreturn 1\n";
        let map = build_map(source, &config);
        let mut state = TrackingState::new(map.line_count);
        state.mark_line_covered(1);
        state.mark_line_covered(2);
        patch(&map, &mut state, &config);
        let after_first = state.clone();
        patch(&map, &mut state, &config);
        assert_eq!(after_first.executed, state.executed);
        assert_eq!(after_first.covered, state.covered);
    }
}
