//! Chord batching.
//!
//! Button presses arriving close together become one chord chip. The window
//! re-arms on every member press, so two presses arbitrarily close always
//! chord while an unrelated later press finds the group already closed.

use crate::engine::TimerTask;
use crate::timeline::{TimerQueue, TimerToken};

/// One press waiting inside the pending group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPress {
    pub button: usize,
    pub at_ms: u64,
}

/// Collects near-simultaneous presses until the finalize timer fires.
#[derive(Debug, Default)]
pub struct ChordManager {
    pending: Vec<PendingPress>,
    timer: Option<TimerToken>,
}

impl ChordManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a press to the pending group and re-arms the finalize timer.
    /// A button already pending is ignored; entries stay sorted by press time.
    pub fn add(
        &mut self,
        button: usize,
        at_ms: u64,
        window_ms: u64,
        timers: &mut TimerQueue<TimerTask>,
    ) {
        if self.pending.iter().all(|p| p.button != button) {
            let position = self
                .pending
                .iter()
                .position(|p| p.at_ms > at_ms)
                .unwrap_or(self.pending.len());
            self.pending.insert(position, PendingPress { button, at_ms });
        }
        if let Some(token) = self.timer.take() {
            timers.cancel(token);
        }
        let window_ms = window_ms.clamp(40, 600);
        self.timer = Some(timers.schedule_at(at_ms + window_ms, TimerTask::FinalizeChord));
    }

    /// Snapshots and clears the pending group. Called when the finalize timer
    /// fires, or directly to force an early close.
    pub fn finalize(&mut self) -> Vec<PendingPress> {
        self.timer = None;
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self, button: usize) -> bool {
        self.pending.iter().any(|p| p.button == button)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Clears pending state and cancels the timer.
    pub fn reset(&mut self, timers: &mut TimerQueue<TimerTask>) {
        if let Some(token) = self.timer.take() {
            timers.cancel(token);
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presses_accumulate_in_time_order() {
        let mut timers = TimerQueue::new();
        let mut chords = ChordManager::new();
        chords.add(5, 1_050, 120, &mut timers);
        chords.add(3, 1_000, 120, &mut timers);
        chords.add(3, 1_060, 120, &mut timers);

        let group = chords.finalize();
        assert_eq!(
            group,
            vec![
                PendingPress { button: 3, at_ms: 1_000 },
                PendingPress { button: 5, at_ms: 1_050 }
            ]
        );
        assert!(!chords.has_pending());
    }

    #[test]
    fn window_rearms_from_latest_press() {
        let mut timers = TimerQueue::new();
        let mut chords = ChordManager::new();
        chords.add(3, 1_000, 120, &mut timers);
        chords.add(5, 1_050, 120, &mut timers);

        // The first press's deadline was cancelled; only t=1170 remains.
        assert!(timers.fire_due(1_120).is_empty());
        assert_eq!(timers.fire_due(1_170).len(), 1);
    }

    #[test]
    fn window_is_clamped() {
        let mut timers = TimerQueue::new();
        let mut chords = ChordManager::new();
        chords.add(0, 1_000, 5, &mut timers);
        assert!(timers.fire_due(1_035).is_empty());
        assert_eq!(timers.fire_due(1_040).len(), 1);
    }

    #[test]
    fn reset_cancels_the_timer() {
        let mut timers = TimerQueue::new();
        let mut chords = ChordManager::new();
        chords.add(1, 0, 80, &mut timers);
        chords.reset(&mut timers);
        assert!(timers.fire_due(10_000).is_empty());
        assert!(!chords.is_pending(1));
    }
}
