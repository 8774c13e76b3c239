//! The visible chip sequence, its mutation events, and undo/redo.
//!
//! Every structural mutation that is not itself an undo/redo application
//! pushes an invertible op onto the history log. A suppression flag guards
//! re-entrancy while the log replays ops, so applied inverses never record
//! themselves. Mutations are announced to subscribers as typed [`ChipEvent`]s;
//! undo and redo emit the same events as any other change.

use std::fmt;

use crate::chip::{Chip, ChipContent};
use crate::history::{HistoryLog, HistoryOp, DEFAULT_HISTORY_CAP};

/// Structural change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChipEvent {
    Added { index: usize, chip: Chip },
    Removed { index: usize, chip: Chip },
    Replaced {
        index: usize,
        before: ChipContent,
        after: ChipContent,
    },
    Cleared { saved: Vec<Chip> },
}

/// Handle returned by [`ChipSequence::subscribe`]; pass it back to
/// [`ChipSequence::unsubscribe`] to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ChipEvent)>;

#[derive(Default)]
struct EventBus {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl EventBus {
    fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: &ChipEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

/// Ordered, mutable list of chips plus the op log that makes every mutation
/// reversible.
pub struct ChipSequence {
    chips: Vec<Chip>,
    history: HistoryLog,
    bus: EventBus,
    suppress: bool,
    next_source: u64,
}

impl Default for ChipSequence {
    fn default() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAP)
    }
}

impl ChipSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_capacity(max_ops: usize) -> Self {
        Self {
            chips: Vec::new(),
            history: HistoryLog::with_capacity(max_ops),
            bus: EventBus::default(),
            suppress: false,
            next_source: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    pub fn chips(&self) -> &[Chip] {
        &self.chips
    }

    pub fn get(&self, index: usize) -> Option<&Chip> {
        self.chips.get(index)
    }

    /// Current position of a chip by its stable creation order, if it is
    /// still in the sequence.
    pub fn position_of_source(&self, source_index: u64) -> Option<usize> {
        self.chips.iter().rposition(|c| c.source_index == source_index)
    }

    /// Projects the whole sequence to display text.
    pub fn render(&self, separator: &str) -> String {
        let texts: Vec<String> = self.chips.iter().map(|c| c.content.render()).collect();
        texts.join(&format!(" {separator} "))
    }

    /// Appends a chip and returns its index.
    pub fn push(&mut self, content: ChipContent) -> usize {
        let index = self.chips.len();
        self.insert_at(index, content);
        index
    }

    /// Inserts a chip; indices beyond the end append.
    pub fn insert_at(&mut self, index: usize, content: ChipContent) {
        let index = index.min(self.chips.len());
        let chip = Chip {
            content: content.clone(),
            source_index: self.next_source,
        };
        self.next_source += 1;
        self.chips.insert(index, chip.clone());
        if !self.suppress {
            self.history.push(HistoryOp::Add { index, content });
        }
        tracing::debug!(index, text = %chip.content.render(), "chip added");
        self.bus.emit(&ChipEvent::Added { index, chip });
    }

    /// Removes the chip at `index`. Out-of-bounds indices decline silently.
    pub fn remove_at(&mut self, index: usize) -> Option<Chip> {
        if index >= self.chips.len() {
            return None;
        }
        let chip = self.chips.remove(index);
        if !self.suppress {
            self.history.push(HistoryOp::Remove {
                index,
                content: chip.content.clone(),
            });
        }
        tracing::debug!(index, "chip removed");
        self.bus.emit(&ChipEvent::Removed {
            index,
            chip: chip.clone(),
        });
        Some(chip)
    }

    /// Replaces the content at `index`, keeping the chip's stable identity.
    /// Out-of-bounds indices decline silently.
    pub fn replace_at(&mut self, index: usize, content: ChipContent) -> bool {
        let Some(chip) = self.chips.get_mut(index) else {
            return false;
        };
        let before = std::mem::replace(&mut chip.content, content.clone());
        if !self.suppress {
            self.history.push(HistoryOp::Replace {
                index,
                before: before.clone(),
                after: content.clone(),
            });
        }
        tracing::debug!(index, text = %content.render(), "chip replaced");
        self.bus.emit(&ChipEvent::Replaced {
            index,
            before,
            after: content,
        });
        true
    }

    /// Clears the sequence. A no-op when already empty.
    pub fn clear(&mut self) {
        if self.chips.is_empty() {
            return;
        }
        let saved = std::mem::take(&mut self.chips);
        if !self.suppress {
            self.history.push(HistoryOp::Clear {
                saved: saved.iter().map(|c| c.content.clone()).collect(),
            });
        }
        tracing::debug!(count = saved.len(), "sequence cleared");
        self.bus.emit(&ChipEvent::Cleared { saved });
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Reverts the most recent applied op. Returns false when exhausted.
    pub fn undo(&mut self) -> bool {
        let Some(op) = self.history.undo().cloned() else {
            return false;
        };
        self.suppress = true;
        match op {
            HistoryOp::Add { index, .. } => {
                self.remove_at(index);
            }
            HistoryOp::Remove { index, content } => {
                self.insert_at(index, content);
            }
            HistoryOp::Replace { index, before, .. } => {
                self.replace_at(index, before);
            }
            HistoryOp::Clear { saved } => {
                // Recorded against an empty overlay; decline when the live
                // sequence no longer matches that invariant.
                if self.chips.is_empty() {
                    for (index, content) in saved.into_iter().enumerate() {
                        self.insert_at(index, content);
                    }
                }
            }
        }
        self.suppress = false;
        true
    }

    /// Re-applies the most recently undone op. Returns false when exhausted.
    pub fn redo(&mut self) -> bool {
        let Some(op) = self.history.redo().cloned() else {
            return false;
        };
        self.suppress = true;
        match op {
            HistoryOp::Add { index, content } => self.insert_at(index, content),
            HistoryOp::Remove { index, .. } => {
                self.remove_at(index);
            }
            HistoryOp::Replace { index, after, .. } => {
                self.replace_at(index, after);
            }
            HistoryOp::Clear { .. } => self.clear(),
        }
        self.suppress = false;
        true
    }

    pub fn subscribe(&mut self, listener: Box<dyn FnMut(&ChipEvent)>) -> SubscriptionId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Session reset: drops chips and the op log without emitting events.
    pub fn reset(&mut self) {
        self.chips.clear();
        self.history.clear();
        self.suppress = false;
    }
}

impl fmt::Debug for ChipSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChipSequence")
            .field("chips", &self.chips)
            .field("suppress", &self.suppress)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn button(label: &str) -> ChipContent {
        ChipContent::Button(label.to_string())
    }

    fn seeded(labels: &[&str]) -> ChipSequence {
        let mut seq = ChipSequence::new();
        for label in labels {
            seq.push(button(label));
        }
        seq
    }

    fn texts(seq: &ChipSequence) -> Vec<String> {
        seq.chips().iter().map(|c| c.content.render()).collect()
    }

    #[test]
    fn renders_with_separators() {
        let seq = seeded(&["A", "B", "C"]);
        assert_eq!(seq.render(">"), "A > B > C");
        assert_eq!(ChipSequence::new().render(">"), "");
    }

    #[test]
    fn remove_undo_redo_round_trip() {
        let mut seq = seeded(&["A", "B", "C"]);
        seq.remove_at(1);
        assert_eq!(texts(&seq), ["A", "C"]);

        assert!(seq.undo());
        assert_eq!(texts(&seq), ["A", "B", "C"]);
        assert_eq!(seq.get(1).unwrap().content, button("B"));

        assert!(seq.redo());
        assert_eq!(texts(&seq), ["A", "C"]);
    }

    #[test]
    fn new_op_after_undo_discards_redo_tail() {
        let mut seq = seeded(&["A", "B", "C"]);
        seq.undo();
        seq.undo();
        assert_eq!(texts(&seq), ["A"]);

        seq.push(button("D"));
        assert!(!seq.can_redo());
        assert!(!seq.redo());
        assert_eq!(texts(&seq), ["A", "D"]);
    }

    #[test]
    fn clear_then_undo_restores_original_order() {
        let mut seq = seeded(&["A", "B", "C"]);
        seq.clear();
        assert!(seq.is_empty());

        assert!(seq.undo());
        assert_eq!(texts(&seq), ["A", "B", "C"]);

        assert!(seq.redo());
        assert!(seq.is_empty());
    }

    #[test]
    fn out_of_bounds_mutations_decline_without_events() {
        let mut seq = seeded(&["A"]);
        let hits = Rc::new(RefCell::new(0usize));
        let sink = hits.clone();
        seq.subscribe(Box::new(move |_| *sink.borrow_mut() += 1));

        assert!(seq.remove_at(5).is_none());
        assert!(!seq.replace_at(5, button("X")));
        assert_eq!(*hits.borrow(), 0);
        assert!(!seq.can_redo());
    }

    #[test]
    fn undo_on_empty_history_is_a_no_op() {
        let mut seq = ChipSequence::new();
        assert!(!seq.undo());
        assert!(!seq.redo());
        assert!(!seq.can_undo());
    }

    #[test]
    fn subscribers_observe_undo_like_any_change() {
        let mut seq = seeded(&["A"]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let id = seq.subscribe(Box::new(move |event| {
            let tag = match event {
                ChipEvent::Added { .. } => "added",
                ChipEvent::Removed { .. } => "removed",
                ChipEvent::Replaced { .. } => "replaced",
                ChipEvent::Cleared { .. } => "cleared",
            };
            sink.borrow_mut().push(tag);
        }));

        seq.push(button("B"));
        seq.undo();
        assert_eq!(*log.borrow(), vec!["added", "removed"]);

        assert!(seq.unsubscribe(id));
        assert!(!seq.unsubscribe(id));
        seq.push(button("C"));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn replace_keeps_stable_identity() {
        let mut seq = seeded(&["A", "B"]);
        let source = seq.get(1).unwrap().source_index;
        seq.replace_at(1, button("B2"));
        assert_eq!(seq.get(1).unwrap().source_index, source);
        assert_eq!(seq.position_of_source(source), Some(1));

        seq.undo();
        assert_eq!(seq.get(1).unwrap().content, button("B"));
    }
}
