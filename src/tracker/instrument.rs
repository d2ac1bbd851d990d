//! Instrumentation fallback.
//!
//! When a host interpreter offers no line/call hook API, coverage can
//! still be collected by rewriting the source to call back into the
//! tracker explicitly. The rewrite only ever prepends text to an existing
//! line — it never inserts or removes a newline — so line numbers in the
//! instrumented source stay identical to the original, and the resulting
//! stack traces and `CodeMap` line references remain valid.

use crate::codemap::CodeMap;
use std::collections::HashMap;

/// Name of the global call the instrumented source invokes; the host's
/// embedding registers a function under this name before loading the file.
pub const TRACK_CALL: &str = "__scriptcov_track_line";

/// Name of the global call emitted at block entries, when block tracking
/// is on.
pub const TRACK_BLOCK: &str = "__scriptcov_track_block";

pub fn instrument_source(source: &str, path: &str, codemap: &CodeMap, track_blocks: bool) -> String {
    let escaped_path = path.replace('\\', "\\\\").replace('"', "\\\"");
    let mut out = String::with_capacity(source.len() + codemap.line_count * 32);

    let blocks_by_line: HashMap<usize, &crate::codemap::BlockInfo> = if track_blocks {
        codemap.blocks.iter().map(|b| (b.start_line, b)).collect()
    } else {
        HashMap::new()
    };

    for (idx, line) in source.lines().enumerate() {
        let lineno = idx + 1;
        if codemap.is_executable(lineno) {
            out.push_str(&format!("{}(\"{}\", {}); ", TRACK_CALL, escaped_path, lineno));
        }
        if let Some(block) = blocks_by_line.get(&lineno) {
            out.push_str(&format!(
                "{}(\"{}\", {}, \"{}\", \"{:?}\"); ",
                TRACK_BLOCK, escaped_path, lineno, block.id, block.kind
            ));
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parser::Parser;
    use crate::parser::ParserLimits;
    use crate::scanner::scan_lines;

    #[test]
    fn instrumentation_preserves_line_count() {
        let source = "local x = 1\nif x > 0 then\n  x = x + 1\nend\nreturn x\n";
        let ast = Parser::new(ParserLimits::default()).parse(source).unwrap();
        let scans = scan_lines(source);
        let map = crate::codemap::build(&ast, source, &scans, &Config::default());
        let instrumented = instrument_source(source, "sample.lua", &map, false);
        assert_eq!(instrumented.lines().count(), source.lines().count());
        assert!(instrumented.contains(TRACK_CALL));
    }

    #[test]
    fn block_terminator_line_is_instrumented_as_executable() {
        let source = "if x > 0 then\n  y = 1\nend\n";
        let ast = Parser::new(ParserLimits::default()).parse(source).unwrap();
        let scans = scan_lines(source);
        let config = Config::default();
        assert!(config.treat_block_terminators_as_executable);
        let map = crate::codemap::build(&ast, source, &scans, &config);
        let instrumented = instrument_source(source, "sample.lua", &map, false);
        let end_line = instrumented.lines().nth(2).unwrap();
        assert!(end_line.contains(TRACK_CALL), "block-end line should be instrumented: {end_line}");
    }

    #[test]
    fn track_blocks_emits_block_entry_calls() {
        let source = "if x > 0 then\n  y = 1\nend\n";
        let ast = Parser::new(ParserLimits::default()).parse(source).unwrap();
        let scans = scan_lines(source);
        let map = crate::codemap::build(&ast, source, &scans, &Config::default());
        let instrumented = instrument_source(source, "sample.lua", &map, true);
        assert!(instrumented.contains(TRACK_BLOCK));
        let without = instrument_source(source, "sample.lua", &map, false);
        assert!(!without.contains(TRACK_BLOCK));
    }
}
