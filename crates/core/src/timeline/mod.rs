//! Deadline scheduling for the engine's one-shot timers.
//!
//! The engine is single threaded and driven by poll ticks, so timers are not
//! OS timers: they are deadlines held in a queue and fired by whichever poll
//! tick first observes a timestamp at or past the deadline. Tests drive the
//! queue with explicit millisecond values, which is what makes every timing
//! contract in the engine deterministic.

/// Handle returned by [`TimerQueue::schedule_at`], used to cancel the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct TimerEntry<T> {
    token: TimerToken,
    due_ms: u64,
    task: T,
}

/// One-shot timer queue ordered by deadline.
#[derive(Debug)]
pub struct TimerQueue<T> {
    entries: Vec<TimerEntry<T>>,
    next_token: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_token: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to fire once `now >= due_ms`.
    pub fn schedule_at(&mut self, due_ms: u64, task: T) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.entries.push(TimerEntry { token, due_ms, task });
        token
    }

    /// Cancels a pending entry. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.token != token);
        self.entries.len() != before
    }

    /// Removes and returns every task whose deadline has passed, ordered by
    /// deadline (ties keep scheduling order).
    pub fn fire_due(&mut self, now_ms: u64) -> Vec<T> {
        let mut due: Vec<TimerEntry<T>> = Vec::new();
        let mut remaining: Vec<TimerEntry<T>> = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.due_ms <= now_ms {
                due.push(entry);
            } else {
                remaining.push(entry);
            }
        }
        self.entries = remaining;
        due.sort_by_key(|e| (e.due_ms, e.token.0));
        due.into_iter().map(|e| e.task).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
