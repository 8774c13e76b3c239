//! Index-addressed operation log for undo/redo.
//!
//! Each op captures enough content to invert itself. Indices are live
//! positions in the chip sequence at apply time, not stable identifiers.

use serde::{Deserialize, Serialize};

use crate::chip::ChipContent;

pub const DEFAULT_HISTORY_CAP: usize = 200;

/// Invertible structural operation over the chip sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOp {
    Add { index: usize, content: ChipContent },
    Remove { index: usize, content: ChipContent },
    Replace {
        index: usize,
        before: ChipContent,
        after: ChipContent,
    },
    Clear { saved: Vec<ChipContent> },
}

/// Bounded op stack with an applied-count pointer. Ops at positions below
/// `applied` have been applied (undoable); positions at or above it form the
/// redo tail.
#[derive(Debug)]
pub struct HistoryLog {
    stack: Vec<HistoryOp>,
    applied: usize,
    max_size: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAP)
    }
}

impl HistoryLog {
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            stack: Vec::new(),
            applied: 0,
            max_size: max_size.max(1),
        }
    }

    /// Records a freshly applied op. Discards any stale redo tail first and
    /// evicts the oldest entry when the cap is exceeded.
    pub fn push(&mut self, op: HistoryOp) {
        self.stack.truncate(self.applied);
        self.stack.push(op);
        self.applied = self.stack.len();
        if self.stack.len() > self.max_size {
            self.stack.remove(0);
            self.applied -= 1;
        }
    }

    /// Steps the pointer back and returns the op to invert, if any.
    pub fn undo(&mut self) -> Option<&HistoryOp> {
        if self.applied == 0 {
            return None;
        }
        self.applied -= 1;
        self.stack.get(self.applied)
    }

    /// Steps the pointer forward and returns the op to re-apply, if any.
    pub fn redo(&mut self) -> Option<&HistoryOp> {
        if self.applied >= self.stack.len() {
            return None;
        }
        let op = self.stack.get(self.applied);
        self.applied += 1;
        op
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.stack.len()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.applied = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(index: usize, label: &str) -> HistoryOp {
        HistoryOp::Add {
            index,
            content: ChipContent::Button(label.to_string()),
        }
    }

    #[test]
    fn undo_and_redo_walk_the_stack() {
        let mut log = HistoryLog::default();
        log.push(add(0, "A"));
        log.push(add(1, "B"));

        assert_eq!(log.undo(), Some(&add(1, "B")));
        assert_eq!(log.undo(), Some(&add(0, "A")));
        assert_eq!(log.undo(), None);

        assert_eq!(log.redo(), Some(&add(0, "A")));
        assert_eq!(log.redo(), Some(&add(1, "B")));
        assert_eq!(log.redo(), None);
    }

    #[test]
    fn push_after_undo_truncates_redo_tail() {
        let mut log = HistoryLog::default();
        log.push(add(0, "A"));
        log.push(add(1, "B"));
        log.undo();
        log.undo();

        log.push(add(0, "C"));
        assert!(!log.can_redo());
        assert_eq!(log.undo(), Some(&add(0, "C")));
        assert_eq!(log.undo(), None);
    }

    #[test]
    fn cap_evicts_the_oldest_entry() {
        let mut log = HistoryLog::with_capacity(2);
        log.push(add(0, "A"));
        log.push(add(1, "B"));
        log.push(add(2, "C"));

        assert_eq!(log.undo(), Some(&add(2, "C")));
        assert_eq!(log.undo(), Some(&add(1, "B")));
        assert_eq!(log.undo(), None);
    }
}
