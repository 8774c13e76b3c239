use serde::{Deserialize, Serialize};

use crate::Result;

/// Button indices 12..=15 carry the digital d-pad and never become chips.
pub const DPAD_RANGE: std::ops::RangeInclusive<usize> = 12..=15;

const DEFAULT_BUTTON_LABELS: [&str; 16] = [
    "L", "M", "H", "S", "LB", "RB", "LT", "RT", "Select", "Start", "L3", "R3", "D↑", "D↓", "D←",
    "D→",
];

/// Which way the player character faces. Mirrors left/right during motion
/// pattern matching only; stored direction history is never mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Right,
    Left,
}

impl Default for Facing {
    fn default() -> Self {
        Facing::Right
    }
}

/// Per-session capture profile. All timing fields are milliseconds unless the
/// name says otherwise. Fields missing from a profile document fall back to
/// their defaults, and out-of-range values are clamped by [`Profile::sanitize`]
/// rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub button_labels: Vec<String>,
    /// Minimum analog axis magnitude that registers as a direction.
    pub deadzone: f32,
    pub chord_window_ms: u64,
    pub repeat_lockout_ms: u64,
    pub hold_ms: u64,
    pub motion_window_ms: u64,
    /// Charge hold requirement, expressed in 60 fps frames.
    pub charge_frames: u32,
    pub charge_window_ms: u64,
    pub mash_window_ms: u64,
    pub facing: Facing,
    pub separator: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            button_labels: DEFAULT_BUTTON_LABELS.iter().map(|s| s.to_string()).collect(),
            deadzone: 0.5,
            chord_window_ms: 80,
            repeat_lockout_ms: 110,
            hold_ms: 250,
            motion_window_ms: 700,
            charge_frames: 30,
            charge_window_ms: 180,
            mash_window_ms: 350,
            facing: Facing::Right,
            separator: ">".to_string(),
        }
    }
}

impl Profile {
    /// Parses a profile from a JSON document and sanitizes it.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut profile: Profile = serde_json::from_str(raw)?;
        profile.sanitize();
        Ok(profile)
    }

    /// Clamps or defaults numeric fields so that a hostile or hand-edited
    /// document can never put the engine in an unusable state.
    pub fn sanitize(&mut self) {
        let defaults = Profile::default();
        if !self.deadzone.is_finite() || self.deadzone <= 0.0 || self.deadzone >= 1.0 {
            self.deadzone = defaults.deadzone;
        }
        self.chord_window_ms = self.chord_window_ms.clamp(40, 600);
        if self.hold_ms == 0 {
            self.hold_ms = defaults.hold_ms;
        }
        if self.motion_window_ms == 0 {
            self.motion_window_ms = defaults.motion_window_ms;
        }
        if self.charge_frames == 0 {
            self.charge_frames = defaults.charge_frames;
        }
        if self.charge_window_ms == 0 {
            self.charge_window_ms = defaults.charge_window_ms;
        }
        if self.mash_window_ms == 0 {
            self.mash_window_ms = defaults.mash_window_ms;
        }
        if self.separator.is_empty() {
            self.separator = defaults.separator;
        }
    }

    /// Rendered label for a button index; unlabelled buttons become `#<index>`.
    pub fn button_label(&self, index: usize) -> String {
        match self.button_labels.get(index) {
            Some(label) if !label.is_empty() => label.clone(),
            _ => format!("#{index}"),
        }
    }

    /// Milliseconds a direction must be held before it counts as charged.
    pub fn charge_hold_ms(&self) -> u64 {
        (f64::from(self.charge_frames) * (1000.0 / 60.0)).round() as u64
    }

    /// Retention window for direction history entries.
    pub fn history_retention_ms(&self) -> u64 {
        self.motion_window_ms.max(700) + 200
    }
}
