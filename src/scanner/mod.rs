//! Comment/String Scanner
//!
//! Independently classifies every physical line of a source buffer as
//! inside or outside a multi-line comment or long string, without building
//! an AST. This exists so a parser failure or timeout never takes line
//! classification down with it — the code-map builder falls back to this
//! scanner's output when the AST is unavailable or partial.
//!
//! Algorithm: a single left-to-right scan maintaining an open-brackets
//! stack for long-bracket delimiters `[[ … ]]` and long-comment delimiters
//! `--[[ … ]]`. The `[[` heuristic is deliberately conservative — it only
//! opens a long string when not preceded on the same line by a quote, `=`,
//! or a `return` keyword token, and prefers to under-count executable lines
//! over over-counting them.

/// Per-line scan result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineScan {
    /// True iff the line's entire non-whitespace span lies inside a
    /// long comment or long string, or its only content is a `--…` suffix.
    pub non_executable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenConstruct {
    LongComment,
    LongString,
}

/// Scans `source` and returns, for every physical line (1-indexed), whether
/// it lies inside a long comment/string or is a pure single-line comment.
pub fn scan_lines(source: &str) -> Vec<LineScan> {
    let lines: Vec<&str> = source.lines().collect();
    let mut results = Vec::with_capacity(lines.len());
    let mut stack: Vec<OpenConstruct> = Vec::new();

    for line in &lines {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0usize;
        // Was any construct open at the start of this line?
        let started_inside = !stack.is_empty();
        // Does non-boundary (i.e. non-long-bracket-marker) content appear
        // outside of any long construct on this line?
        let mut has_outside_content = false;
        let mut only_boundary_or_whitespace = true;

        while i < chars.len() {
            if stack.is_empty() {
                // Not inside any long construct: look for openers.
                if chars[i] == '-' && chars.get(i + 1) == Some(&'-') {
                    // Single-line or long comment starts here.
                    if matches!(chars.get(i + 2), Some('[')) {
                        if let Some((level, consumed)) = long_bracket_open(&chars, i + 2) {
                            stack.push(OpenConstruct::LongComment);
                            i += 2 + consumed;
                            let _ = level;
                            continue;
                        }
                    }
                    // Plain `--` comment: rest of line is non-executable.
                    break;
                }
                if chars[i] == '[' && !preceded_by_quote_eq_or_return(&chars, i) {
                    if let Some((_level, consumed)) = long_bracket_open(&chars, i) {
                        stack.push(OpenConstruct::LongString);
                        i += consumed;
                        continue;
                    }
                }
                has_outside_content = has_outside_content || !chars[i].is_whitespace();
                only_boundary_or_whitespace = false;
                i += 1;
            } else {
                // Inside a long construct: look for the matching closer.
                if chars[i] == ']' {
                    if let Some(consumed) = long_bracket_close(&chars, i) {
                        stack.pop();
                        i += consumed;
                        continue;
                    }
                }
                i += 1;
            }
        }

        let ends_inside = !stack.is_empty();
        let non_executable = if started_inside || ends_inside {
            !has_outside_content
        } else {
            only_boundary_or_whitespace || line.trim().is_empty()
        };
        results.push(LineScan { non_executable });
    }
    results
}

/// Returns `(level, chars_consumed)` if a long-bracket opener `[=*[` starts
/// at `start`.
fn long_bracket_open(chars: &[char], start: usize) -> Option<(usize, usize)> {
    if chars.get(start) != Some(&'[') {
        return None;
    }
    let mut i = start + 1;
    let mut level = 0usize;
    while chars.get(i) == Some(&'=') {
        level += 1;
        i += 1;
    }
    if chars.get(i) == Some(&'[') {
        Some((level, i + 1 - start))
    } else {
        None
    }
}

/// Returns chars consumed if a long-bracket closer `]=*]` starts at `start`.
/// Conservative: closes the innermost construct regardless of level match,
/// whenever the stack is non-empty.
fn long_bracket_close(chars: &[char], start: usize) -> Option<usize> {
    if chars.get(start) != Some(&']') {
        return None;
    }
    let mut i = start + 1;
    while chars.get(i) == Some(&'=') {
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        Some(i + 1 - start)
    } else {
        None
    }
}

fn preceded_by_quote_eq_or_return(chars: &[char], pos: usize) -> bool {
    if pos == 0 {
        return false;
    }
    let mut j = pos;
    while j > 0 && chars[j - 1].is_whitespace() {
        j -= 1;
    }
    if j == 0 {
        return false;
    }
    match chars[j - 1] {
        '"' | '\'' | '=' => return true,
        _ => {}
    }
    // `return [[...]]`
    let word_end = j;
    let mut k = j;
    while k > 0 && (chars[k - 1].is_alphanumeric() || chars[k - 1] == '_') {
        k -= 1;
    }
    let word: String = chars[k..word_end].iter().collect();
    word == "return"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_comment_line_is_non_executable() {
        let scans = scan_lines("-- hello\nreturn 1\n");
        assert!(scans[0].non_executable);
        assert!(!scans[1].non_executable);
    }

    #[test]
    fn long_comment_spans_are_non_executable() {
        let scans = scan_lines("--[[\nprint(\"noise\")\n]]\nprint(\"real\")\n");
        assert!(scans[0].non_executable);
        assert!(scans[1].non_executable);
        assert!(scans[2].non_executable);
        assert!(!scans[3].non_executable);
    }

    #[test]
    fn trailing_comment_does_not_make_line_non_executable() {
        let scans = scan_lines("x = 1 -- set x\n");
        assert!(!scans[0].non_executable);
    }

    #[test]
    fn blank_lines_are_non_executable() {
        let scans = scan_lines("\n   \n");
        assert!(scans[0].non_executable);
        assert!(scans[1].non_executable);
    }

    #[test]
    fn comment_only_file_is_entirely_non_executable() {
        let src = (0..10).map(|i| format!("-- line {}", i)).collect::<Vec<_>>().join("\n");
        let scans = scan_lines(&src);
        assert_eq!(scans.len(), 10);
        assert!(scans.iter().all(|s| s.non_executable));
    }
}
