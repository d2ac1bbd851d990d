//! Per-file runtime tracking state.
//!
//! The counterpart to `CodeMap`: where the code-map is the static product
//! of one parse, `TrackingState` is the running record of what actually
//! executed. Line marks are idempotent booleans, so re-entering the same
//! line or function any number of times is free to record — no
//! deduplication bookkeeping is needed above the bitmap itself.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct TrackingState {
    /// 1-indexed via a leading sentinel, matching `CodeMap::lines`.
    pub executed: Vec<bool>,
    pub covered: Vec<bool>,
    pub functions_executed: HashSet<String>,
    /// Number of call events seen per function id.
    pub function_call_counts: HashMap<String, u64>,
    pub blocks_executed: HashSet<String>,
    /// Number of entry events seen per block id.
    pub block_entry_counts: HashMap<String, u64>,
    pub conditions_true: HashSet<String>,
    pub conditions_false: HashSet<String>,
    /// Number of times each condition was observed, true or false combined.
    pub condition_hit_counts: HashMap<String, u64>,
    /// Set once the file has been seen by discovery but before any line of
    /// it has executed; lets `discover_uncovered` report a zero-coverage
    /// row instead of omitting the file entirely.
    pub discovered: bool,
    /// Set while the engine is in the `Running` state; tracking calls that
    /// arrive while inactive are dropped by the caller before reaching here.
    pub active: bool,
}

impl TrackingState {
    pub fn new(line_count: usize) -> Self {
        TrackingState {
            executed: vec![false; line_count + 1],
            covered: vec![false; line_count + 1],
            functions_executed: HashSet::new(),
            function_call_counts: HashMap::new(),
            blocks_executed: HashSet::new(),
            block_entry_counts: HashMap::new(),
            conditions_true: HashSet::new(),
            conditions_false: HashSet::new(),
            condition_hit_counts: HashMap::new(),
            discovered: true,
            active: true,
        }
    }

    fn ensure_capacity(&mut self, line: usize) {
        if line >= self.executed.len() {
            self.executed.resize(line + 1, false);
            self.covered.resize(line + 1, false);
        }
    }

    pub fn mark_line_executed(&mut self, line: usize) {
        self.ensure_capacity(line);
        self.executed[line] = true;
    }

    /// Covered implies executed (`covered[i] ⇒ executed[i]`), so this
    /// sets both.
    pub fn mark_line_covered(&mut self, line: usize) {
        self.ensure_capacity(line);
        self.executed[line] = true;
        self.covered[line] = true;
    }

    pub fn mark_function_executed(&mut self, function_id: &str) {
        self.functions_executed.insert(function_id.to_string());
        *self.function_call_counts.entry(function_id.to_string()).or_insert(0) += 1;
    }

    pub fn mark_block_executed(&mut self, block_id: &str) {
        self.blocks_executed.insert(block_id.to_string());
        *self.block_entry_counts.entry(block_id.to_string()).or_insert(0) += 1;
    }

    pub fn mark_condition(&mut self, condition_id: &str, outcome: bool) {
        if outcome {
            self.conditions_true.insert(condition_id.to_string());
        } else {
            self.conditions_false.insert(condition_id.to_string());
        }
        *self.condition_hit_counts.entry(condition_id.to_string()).or_insert(0) += 1;
    }

    pub fn was_executed(&self, line: usize) -> bool {
        self.executed.get(line).copied().unwrap_or(false)
    }

    pub fn was_covered(&self, line: usize) -> bool {
        self.covered.get(line).copied().unwrap_or(false)
    }

    /// Clears all execution marks but keeps the file registered
    /// (`Engine::reset`); distinct from dropping the file entirely
    /// (`Engine::full_reset`).
    pub fn clear(&mut self) {
        self.executed.iter_mut().for_each(|b| *b = false);
        self.covered.iter_mut().for_each(|b| *b = false);
        self.functions_executed.clear();
        self.function_call_counts.clear();
        self.blocks_executed.clear();
        self.block_entry_counts.clear();
        self.conditions_true.clear();
        self.conditions_false.clear();
        self.condition_hit_counts.clear();
    }

    /// Merges another thread's tracking state into this one. Merging is a
    /// union: any line, function, block, or condition branch seen by either
    /// thread counts as seen.
    pub fn merge(&mut self, other: &TrackingState) {
        self.ensure_capacity(other.executed.len().saturating_sub(1));
        for (i, &v) in other.executed.iter().enumerate() {
            if v {
                self.executed[i] = true;
            }
        }
        for (i, &v) in other.covered.iter().enumerate() {
            if v {
                self.covered[i] = true;
            }
        }
        self.functions_executed.extend(other.functions_executed.iter().cloned());
        self.blocks_executed.extend(other.blocks_executed.iter().cloned());
        self.conditions_true.extend(other.conditions_true.iter().cloned());
        self.conditions_false.extend(other.conditions_false.iter().cloned());
        for (id, count) in &other.function_call_counts {
            *self.function_call_counts.entry(id.clone()).or_insert(0) += count;
        }
        for (id, count) in &other.block_entry_counts {
            *self.block_entry_counts.entry(id.clone()).or_insert(0) += count;
        }
        for (id, count) in &other.condition_hit_counts {
            *self.condition_hit_counts.entry(id.clone()).or_insert(0) += count;
        }
        self.discovered = self.discovered || other.discovered;
        self.active = self.active || other.active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covered_line_is_also_executed() {
        let mut state = TrackingState::new(10);
        state.mark_line_covered(4);
        assert!(state.was_executed(4));
        assert!(state.was_covered(4));
    }

    #[test]
    fn executed_line_is_not_covered() {
        let mut state = TrackingState::new(10);
        state.mark_line_executed(4);
        assert!(state.was_executed(4));
        assert!(!state.was_covered(4));
    }

    #[test]
    fn merge_unions_executed_lines() {
        let mut a = TrackingState::new(5);
        a.mark_line_executed(2);
        let mut b = TrackingState::new(5);
        b.mark_line_executed(3);
        a.merge(&b);
        assert!(a.was_executed(2));
        assert!(a.was_executed(3));
    }

    #[test]
    fn clear_drops_marks_but_keeps_state_present() {
        let mut state = TrackingState::new(5);
        state.mark_line_executed(2);
        state.mark_function_executed("fn1");
        state.clear();
        assert!(!state.was_executed(2));
        assert!(state.functions_executed.is_empty());
        assert!(state.function_call_counts.is_empty());
    }

    #[test]
    fn repeated_marks_accumulate_call_and_entry_counts() {
        let mut state = TrackingState::new(5);
        state.mark_function_executed("fn1");
        state.mark_function_executed("fn1");
        state.mark_function_executed("fn1");
        state.mark_block_executed("blk1");
        state.mark_condition("cond1", true);
        state.mark_condition("cond1", false);
        assert_eq!(state.function_call_counts["fn1"], 3);
        assert_eq!(state.block_entry_counts["blk1"], 1);
        assert_eq!(state.condition_hit_counts["cond1"], 2);
    }

    #[test]
    fn merge_sums_counts_across_threads() {
        let mut a = TrackingState::new(5);
        a.mark_function_executed("fn1");
        let mut b = TrackingState::new(5);
        b.mark_function_executed("fn1");
        b.mark_function_executed("fn1");
        a.merge(&b);
        assert_eq!(a.function_call_counts["fn1"], 3);
    }
}
