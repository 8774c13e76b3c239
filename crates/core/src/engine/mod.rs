//! The per-session engine that drives the whole recognition pipeline.
//!
//! One poll per display frame reads raw controller state, updates direction
//! tracking, batches presses into chords, composes chips, and folds mash
//! bursts, all synchronously. Timers are deadlines fired at the top of each
//! poll, so identical input traces always produce identical notation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chip::{Chip, ChipContent};
use crate::chord::ChordManager;
use crate::compose;
use crate::config::{Profile, DPAD_RANGE};
use crate::direction::{DirectionToken, DirectionTracker};
use crate::mash::{MashCollapse, MashOutcome};
use crate::sequence::{ChipEvent, ChipSequence, SubscriptionId};
use crate::timeline::{TimerQueue, TimerToken};

/// Raw controller state for one poll tick. Indices 12..=15 of `buttons` are
/// the digital d-pad and feed direction tracking instead of chip creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerFrame {
    pub buttons: Vec<bool>,
    #[serde(default)]
    pub axes: [f32; 2],
}

impl ControllerFrame {
    fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }
}

/// Work items carried by the engine's timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    FinalizeChord,
    HoldElapsed(usize),
}

#[derive(Debug)]
struct ActivePress {
    source_index: u64,
    label: String,
    held: bool,
}

/// Owns every piece of per-session recognition state.
#[derive(Debug)]
pub struct Engine {
    profile: Profile,
    tracker: DirectionTracker,
    chords: ChordManager,
    mash: MashCollapse,
    sequence: ChipSequence,
    timers: TimerQueue<TimerTask>,
    prev_buttons: Vec<bool>,
    last_press_ms: HashMap<usize, u64>,
    active_presses: HashMap<usize, ActivePress>,
    hold_timers: HashMap<usize, TimerToken>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Profile::default())
    }
}

impl Engine {
    pub fn new(mut profile: Profile) -> Self {
        profile.sanitize();
        Self {
            profile,
            tracker: DirectionTracker::new(),
            chords: ChordManager::new(),
            mash: MashCollapse::new(),
            sequence: ChipSequence::new(),
            timers: TimerQueue::new(),
            prev_buttons: Vec::new(),
            last_press_ms: HashMap::new(),
            active_presses: HashMap::new(),
            hold_timers: HashMap::new(),
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn set_profile(&mut self, mut profile: Profile) {
        profile.sanitize();
        self.profile = profile;
    }

    pub fn sequence(&self) -> &ChipSequence {
        &self.sequence
    }

    /// Direct access for external editing features; mutations made here flow
    /// through the same logged path as engine-driven ones.
    pub fn sequence_mut(&mut self) -> &mut ChipSequence {
        &mut self.sequence
    }

    pub fn chips(&self) -> &[Chip] {
        self.sequence.chips()
    }

    /// Rendered notation line for the current sequence.
    pub fn notation(&self) -> String {
        self.sequence.render(&self.profile.separator)
    }

    pub fn subscribe(&mut self, listener: Box<dyn FnMut(&ChipEvent)>) -> SubscriptionId {
        self.sequence.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.sequence.unsubscribe(id)
    }

    pub fn can_undo(&self) -> bool {
        self.sequence.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.sequence.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.sequence.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.sequence.redo()
    }

    /// Runs one poll tick at `now_ms`. Due timers fire first, then direction
    /// tracking, then button edge handling.
    pub fn poll(&mut self, frame: &ControllerFrame, now_ms: u64) {
        self.advance(now_ms);
        self.track_directions(frame, now_ms);
        self.handle_buttons(frame, now_ms);
    }

    /// Fires due timers without reading new controller state. Useful to flush
    /// a pending chord after the last frame of a recorded trace.
    pub fn advance(&mut self, now_ms: u64) {
        for task in self.timers.fire_due(now_ms) {
            match task {
                TimerTask::FinalizeChord => self.finalize_chord(now_ms),
                TimerTask::HoldElapsed(button) => self.on_hold_elapsed(button),
            }
        }
    }

    /// Clears the visible sequence (logged, so it can be undone) and resets
    /// the transient chord/mash/hold/charge state that belongs with it.
    pub fn clear(&mut self) {
        self.sequence.clear();
        self.reset_transients();
    }

    /// Full session reset: also discards direction history, the op log and
    /// button edge state.
    pub fn reset_session(&mut self) {
        self.reset_transients();
        self.sequence.reset();
        self.tracker.reset();
        self.timers.clear();
        self.prev_buttons.clear();
        self.last_press_ms.clear();
    }

    fn reset_transients(&mut self) {
        self.chords.reset(&mut self.timers);
        self.mash.reset();
        for (_, token) in self.hold_timers.drain() {
            self.timers.cancel(token);
        }
        self.active_presses.clear();
        self.tracker.reset_charge();
    }

    fn track_directions(&mut self, frame: &ControllerFrame, now_ms: u64) {
        let digital = DirectionToken::from_digital(
            frame.button(12),
            frame.button(13),
            frame.button(14),
            frame.button(15),
        );
        let token = if digital.is_neutral() {
            DirectionToken::from_axes(frame.axes[0], frame.axes[1], self.profile.deadzone)
        } else {
            digital
        };

        if self.tracker.update(token, now_ms, &self.profile) {
            tracing::debug!(at_ms = now_ms, "double-tap dash");
            self.append_with_mash(ChipContent::Button("Dash".to_string()), now_ms);
        }
    }

    fn handle_buttons(&mut self, frame: &ControllerFrame, now_ms: u64) {
        if self.prev_buttons.len() < frame.buttons.len() {
            self.prev_buttons.resize(frame.buttons.len(), false);
        }
        let mut released = Vec::new();
        for index in 0..self.prev_buttons.len() {
            let pressed = frame.button(index);
            let was = self.prev_buttons[index];
            if pressed && !was {
                self.on_press(index, now_ms);
            } else if !pressed && was {
                released.push(index);
            }
            self.prev_buttons[index] = pressed;
        }
        for index in released {
            self.on_release(index, now_ms);
        }
    }

    fn on_press(&mut self, button: usize, now_ms: u64) {
        if DPAD_RANGE.contains(&button) {
            return;
        }
        if let Some(&last) = self.last_press_ms.get(&button) {
            if now_ms.saturating_sub(last) < self.profile.repeat_lockout_ms {
                return;
            }
        }
        self.last_press_ms.insert(button, now_ms);

        // A press entering a chord can never double as a sustained hold.
        if let Some(token) = self.hold_timers.remove(&button) {
            self.timers.cancel(token);
        }
        self.active_presses.remove(&button);

        self.chords
            .add(button, now_ms, self.profile.chord_window_ms, &mut self.timers);
    }

    fn on_release(&mut self, button: usize, _now_ms: u64) {
        if let Some(token) = self.hold_timers.remove(&button) {
            self.timers.cancel(token);
        }
        if let Some(active) = self.active_presses.remove(&button) {
            if active.held {
                self.sequence
                    .push(ChipContent::Button(format!("]{}[", active.label)));
            }
        }
    }

    fn finalize_chord(&mut self, now_ms: u64) {
        let group = self.chords.finalize();
        match group.as_slice() {
            [] => {}
            [press] => {
                let label = self.profile.button_label(press.button);
                let content = compose::compose(
                    ChipContent::Button(label),
                    &mut self.tracker,
                    now_ms,
                    &self.profile,
                );
                let still_pressed = self.prev_buttons.get(press.button).copied().unwrap_or(false);
                if let Some((source_index, label)) = self.append_with_mash(content, now_ms) {
                    if !still_pressed {
                        // Released while the chord window was open; there is
                        // nothing left to hold.
                        return;
                    }
                    self.active_presses.insert(
                        press.button,
                        ActivePress {
                            source_index,
                            label,
                            held: false,
                        },
                    );
                    let token = self.timers.schedule_at(
                        now_ms + self.profile.hold_ms,
                        TimerTask::HoldElapsed(press.button),
                    );
                    self.hold_timers.insert(press.button, token);
                }
            }
            group => {
                let labels: Vec<String> = group
                    .iter()
                    .map(|p| self.profile.button_label(p.button))
                    .collect();
                let content = compose::compose(
                    ChipContent::Chord(labels),
                    &mut self.tracker,
                    now_ms,
                    &self.profile,
                );
                self.append_with_mash(content, now_ms);
            }
        }
    }

    /// Appends a composed chip and runs the mash pass over it. Returns the
    /// stable id and primary label when the chip stayed in the sequence.
    fn append_with_mash(&mut self, content: ChipContent, now_ms: u64) -> Option<(u64, String)> {
        let index = self.sequence.push(content);
        let chip = self.sequence.get(index)?.clone();
        match self
            .mash
            .observe(&chip, now_ms, self.profile.mash_window_ms)
        {
            MashOutcome::Kept => {
                let label = chip.content.primary_label().unwrap_or_default().to_string();
                Some((chip.source_index, label))
            }
            MashOutcome::Collapse { owner_source } => {
                let len = self.sequence.len();
                self.sequence.remove_at(len - 1);
                if len >= 2 {
                    self.sequence.remove_at(len - 2);
                }
                if let Some(position) = self.sequence.position_of_source(owner_source) {
                    if let Some(current) = self.sequence.get(position).map(|c| c.content.clone()) {
                        self.sequence
                            .replace_at(position, ChipContent::Mash(Box::new(current)));
                    }
                }
                tracing::debug!(at_ms = now_ms, "mash burst collapsed");
                None
            }
            MashOutcome::Drop => {
                let len = self.sequence.len();
                self.sequence.remove_at(len - 1);
                None
            }
        }
    }

    fn on_hold_elapsed(&mut self, button: usize) {
        self.hold_timers.remove(&button);
        let Some(active) = self.active_presses.get_mut(&button) else {
            return;
        };
        active.held = true;
        let Some(position) = self.sequence.position_of_source(active.source_index) else {
            return;
        };
        let Some(mut content) = self.sequence.get(position).map(|c| c.content.clone()) else {
            return;
        };
        let bracketed = format!("[{}]", active.label);
        if content.rewrite_label(&active.label, &bracketed) {
            self.sequence.replace_at(position, content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(pressed: &[usize]) -> ControllerFrame {
        let mut buttons = vec![false; 16];
        for &index in pressed {
            buttons[index] = true;
        }
        ControllerFrame {
            buttons,
            axes: [0.0, 0.0],
        }
    }

    fn texts(engine: &Engine) -> Vec<String> {
        engine.chips().iter().map(|c| c.content.render()).collect()
    }

    #[test]
    fn single_press_becomes_one_chip_after_the_window() {
        let mut engine = Engine::default();
        engine.poll(&frame(&[0]), 1_000);
        assert!(engine.chips().is_empty());

        engine.poll(&frame(&[]), 1_100);
        assert_eq!(texts(&engine), ["L"]);
    }

    #[test]
    fn near_simultaneous_presses_chord_in_press_time_order() {
        let mut engine = Engine::default();
        let mut profile = Profile::default();
        profile.chord_window_ms = 120;
        engine.set_profile(profile);

        engine.poll(&frame(&[4]), 1_000);
        engine.poll(&frame(&[4, 5]), 1_050);
        // The re-armed window holds until t=1170.
        engine.poll(&frame(&[4, 5]), 1_169);
        assert!(engine.chips().is_empty());

        engine.poll(&frame(&[]), 1_170);
        assert_eq!(texts(&engine), ["LB + RB"]);
    }

    #[test]
    fn held_direction_prefixes_the_chip() {
        let mut engine = Engine::default();
        engine.poll(&frame(&[15, 2]), 0);
        engine.poll(&frame(&[15]), 100);
        assert_eq!(texts(&engine), ["→ + H"]);
    }

    #[test]
    fn analog_stick_feeds_direction_when_dpad_is_idle() {
        let mut engine = Engine::default();
        let stick = ControllerFrame {
            buttons: {
                let mut b = vec![false; 16];
                b[2] = true;
                b
            },
            axes: [0.9, 0.9],
        };
        engine.poll(&stick, 0);
        engine.poll(&frame(&[]), 100);
        assert_eq!(texts(&engine), ["↘ + H"]);
    }

    #[test]
    fn repeat_lockout_swallows_rapid_same_button_presses() {
        let mut engine = Engine::default();
        engine.poll(&frame(&[0]), 0);
        engine.poll(&frame(&[]), 30);
        engine.poll(&frame(&[0]), 50);
        engine.poll(&frame(&[]), 300);
        assert_eq!(texts(&engine), ["L"]);
    }

    #[test]
    fn mash_burst_collapses_and_then_swallows() {
        let mut profile = Profile::default();
        profile.repeat_lockout_ms = 10;
        let mut engine = Engine::new(profile);

        for (press_at, release_at) in [(0, 20), (100, 120), (250, 270), (400, 420)] {
            engine.poll(&frame(&[0]), press_at);
            engine.poll(&frame(&[]), release_at);
        }
        // Flush the last pending chord while the burst window is still open;
        // its chip is the fourth identical repeat and gets swallowed.
        engine.advance(500);

        assert_eq!(texts(&engine), ["Mash L"]);
    }

    #[test]
    fn held_button_marks_the_chip_and_logs_the_release() {
        let mut engine = Engine::default();
        engine.poll(&frame(&[0]), 0);
        engine.poll(&frame(&[0]), 90);
        assert_eq!(texts(&engine), ["L"]);

        // Hold timer was armed at finalize (t=90) for holdMs=250.
        engine.poll(&frame(&[0]), 340);
        assert_eq!(texts(&engine), ["[L]"]);

        engine.poll(&frame(&[]), 400);
        assert_eq!(texts(&engine), ["[L]", "]L["]);
    }

    #[test]
    fn release_before_finalize_never_arms_the_hold() {
        let mut engine = Engine::default();
        engine.poll(&frame(&[0]), 0);
        engine.poll(&frame(&[]), 30);
        engine.poll(&frame(&[]), 500);
        assert_eq!(texts(&engine), ["L"]);

        // No hold timer was armed for the already-released press.
        engine.advance(2_000);
        assert_eq!(texts(&engine), ["L"]);
    }

    #[test]
    fn double_tap_forward_emits_a_dash_chip() {
        let mut engine = Engine::default();
        engine.poll(&frame(&[15]), 0);
        engine.poll(&frame(&[]), 50);
        engine.poll(&frame(&[15]), 120);
        assert_eq!(texts(&engine), ["Dash"]);
    }

    #[test]
    fn charge_release_composes_through_the_engine() {
        let mut engine = Engine::default();
        engine.poll(&frame(&[14]), 0);
        for at in (16..600).step_by(16) {
            engine.poll(&frame(&[14]), at);
        }
        engine.poll(&frame(&[15, 2]), 600);
        engine.poll(&frame(&[15]), 700);
        assert_eq!(texts(&engine), ["← → H"]);
    }

    #[test]
    fn undo_redo_and_clear_round_trip() {
        let mut engine = Engine::default();
        for (button, at) in [(0usize, 0u64), (1, 300), (2, 600)] {
            engine.poll(&frame(&[button]), at);
            engine.poll(&frame(&[]), at + 100);
        }
        engine.advance(1_000);
        assert_eq!(texts(&engine), ["L", "M", "H"]);

        engine.clear();
        assert!(engine.chips().is_empty());
        assert!(engine.can_undo());
        assert!(!engine.can_redo());

        assert!(engine.undo());
        assert_eq!(texts(&engine), ["L", "M", "H"]);

        assert!(engine.redo());
        assert!(engine.chips().is_empty());
    }
}
