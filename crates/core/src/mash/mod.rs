//! Mash burst detection.
//!
//! Rapid repeats of an identical chip collapse into one `Mash` chip. Bursts
//! are keyed by structured content equality, and the window re-arms from the
//! latest member, mirroring the chord manager's policy. The caller applies
//! the structural edits so they flow through the normal logged mutation path.

use crate::chip::{Chip, ChipContent};

/// What the caller must do with the chip it just appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MashOutcome {
    /// Chip stays as appended.
    Kept,
    /// Third repeat: remove the last two chips and relabel the burst owner
    /// (found by its stable source index) as a mash.
    Collapse { owner_source: u64 },
    /// Fourth or later repeat: silently remove the just-appended chip.
    Drop,
}

#[derive(Debug)]
struct MashBurst {
    key: ChipContent,
    owner_source: u64,
    last_at_ms: u64,
    count: u32,
}

/// Tracks the live burst, if any.
#[derive(Debug, Default)]
pub struct MashCollapse {
    burst: Option<MashBurst>,
}

impl MashCollapse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes a newly appended chip and decides its fate.
    pub fn observe(&mut self, chip: &Chip, now_ms: u64, window_ms: u64) -> MashOutcome {
        if let Some(burst) = self.burst.as_mut() {
            if burst.key == chip.content && now_ms.saturating_sub(burst.last_at_ms) <= window_ms {
                burst.count += 1;
                burst.last_at_ms = now_ms;
                return match burst.count {
                    2 => MashOutcome::Kept,
                    3 => MashOutcome::Collapse {
                        owner_source: burst.owner_source,
                    },
                    _ => MashOutcome::Drop,
                };
            }
        }

        self.burst = Some(MashBurst {
            key: chip.content.clone(),
            owner_source: chip.source_index,
            last_at_ms: now_ms,
            count: 1,
        });
        MashOutcome::Kept
    }

    pub fn reset(&mut self) {
        self.burst = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip(label: &str, source_index: u64) -> Chip {
        Chip {
            content: ChipContent::Button(label.to_string()),
            source_index,
        }
    }

    #[test]
    fn third_repeat_collapses_and_fourth_drops() {
        let mut mash = MashCollapse::new();
        assert_eq!(mash.observe(&chip("H", 0), 0, 350), MashOutcome::Kept);
        assert_eq!(mash.observe(&chip("H", 1), 100, 350), MashOutcome::Kept);
        assert_eq!(
            mash.observe(&chip("H", 2), 250, 350),
            MashOutcome::Collapse { owner_source: 0 }
        );
        assert_eq!(mash.observe(&chip("H", 3), 300, 350), MashOutcome::Drop);
    }

    #[test]
    fn different_content_starts_a_fresh_burst() {
        let mut mash = MashCollapse::new();
        mash.observe(&chip("H", 0), 0, 350);
        mash.observe(&chip("H", 1), 50, 350);
        assert_eq!(mash.observe(&chip("M", 2), 100, 350), MashOutcome::Kept);
        // The H streak was superseded; two more H presses only reach count 2.
        assert_eq!(mash.observe(&chip("H", 3), 150, 350), MashOutcome::Kept);
        assert_eq!(mash.observe(&chip("H", 4), 200, 350), MashOutcome::Kept);
    }

    #[test]
    fn window_rearms_from_latest_member() {
        let mut mash = MashCollapse::new();
        mash.observe(&chip("H", 0), 0, 350);
        mash.observe(&chip("H", 1), 300, 350);
        // 600 is beyond the first press but within 350 of the second.
        assert_eq!(
            mash.observe(&chip("H", 2), 600, 350),
            MashOutcome::Collapse { owner_source: 0 }
        );
    }

    #[test]
    fn elapsed_window_starts_over() {
        let mut mash = MashCollapse::new();
        mash.observe(&chip("H", 0), 0, 350);
        assert_eq!(mash.observe(&chip("H", 1), 400, 350), MashOutcome::Kept);
        assert_eq!(mash.observe(&chip("H", 2), 500, 350), MashOutcome::Kept);
        assert_eq!(
            mash.observe(&chip("H", 3), 600, 350),
            MashOutcome::Collapse { owner_source: 1 }
        );
    }
}
