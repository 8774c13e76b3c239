//! Direction tracking and motion recognition.
//!
//! One token is derived per poll tick from the digital d-pad and the analog
//! stick, deduplicated into a time-windowed history, and matched against the
//! classic motion patterns when a button arrives. Facing is applied only to
//! the compressed sequence used for matching; stored history stays raw.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::{Facing, Profile};

/// Two taps of the forward direction inside this window register as a dash.
pub const DASH_WINDOW_MS: u64 = 200;

/// Eight-way direction plus neutral, recomputed every poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionToken {
    Neutral,
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Default for DirectionToken {
    fn default() -> Self {
        DirectionToken::Neutral
    }
}

impl DirectionToken {
    /// Derives a token from the four digital d-pad lines. Left/right win over
    /// nothing, up wins over down when both are held.
    pub fn from_digital(up: bool, down: bool, left: bool, right: bool) -> Self {
        use DirectionToken::*;
        let mut tok = if left {
            Left
        } else if right {
            Right
        } else {
            Neutral
        };
        if up {
            tok = match tok {
                Left => UpLeft,
                Right => UpRight,
                _ => Up,
            };
        } else if down {
            tok = match tok {
                Left => DownLeft,
                Right => DownRight,
                _ => Down,
            };
        }
        tok
    }

    /// Derives a token from the analog stick. An axis registers only when its
    /// magnitude reaches the deadzone; both axes combine into a diagonal.
    pub fn from_axes(x: f32, y: f32, deadzone: f32) -> Self {
        use DirectionToken::*;
        let horizontal = if x.abs() >= deadzone {
            Some(if x < 0.0 { Left } else { Right })
        } else {
            None
        };
        let vertical = if y.abs() >= deadzone {
            Some(if y < 0.0 { Up } else { Down })
        } else {
            None
        };
        match (vertical, horizontal) {
            (Some(Up), Some(Left)) => UpLeft,
            (Some(Up), Some(Right)) => UpRight,
            (Some(Down), Some(Left)) => DownLeft,
            (Some(Down), Some(Right)) => DownRight,
            (Some(v), None) => v,
            (None, Some(h)) => h,
            _ => Neutral,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == DirectionToken::Neutral
    }

    pub fn has_up(self) -> bool {
        use DirectionToken::*;
        matches!(self, Up | UpLeft | UpRight)
    }

    pub fn has_down(self) -> bool {
        use DirectionToken::*;
        matches!(self, Down | DownLeft | DownRight)
    }

    pub fn has_left(self) -> bool {
        use DirectionToken::*;
        matches!(self, Left | UpLeft | DownLeft)
    }

    pub fn has_right(self) -> bool {
        use DirectionToken::*;
        matches!(self, Right | UpRight | DownRight)
    }

    /// Swaps the left/right component, keeping the vertical one.
    pub fn mirrored(self) -> Self {
        use DirectionToken::*;
        match self {
            Left => Right,
            Right => Left,
            UpLeft => UpRight,
            UpRight => UpLeft,
            DownLeft => DownRight,
            DownRight => DownLeft,
            other => other,
        }
    }

    /// True when the two tokens share an opposed component on either axis.
    pub fn is_opposite(self, other: DirectionToken) -> bool {
        (self.has_left() && other.has_right())
            || (self.has_right() && other.has_left())
            || (self.has_up() && other.has_down())
            || (self.has_down() && other.has_up())
    }

    /// Display glyph for the token, if one is mapped.
    pub fn glyph(self) -> Option<&'static str> {
        use DirectionToken::*;
        match self {
            Up => Some("↑"),
            Down => Some("↓"),
            Left => Some("←"),
            Right => Some("→"),
            UpLeft => Some("↖"),
            UpRight => Some("↗"),
            DownLeft => Some("↙"),
            DownRight => Some("↘"),
            Neutral => None,
        }
    }

    fn key(self) -> &'static str {
        use DirectionToken::*;
        match self {
            Neutral => "n",
            Up => "u",
            Down => "d",
            Left => "l",
            Right => "r",
            UpLeft => "ul",
            UpRight => "ur",
            DownLeft => "dl",
            DownRight => "dr",
        }
    }

    /// Rendered text: the glyph, or the uppercase raw token as a fallback.
    pub fn display(self) -> String {
        match self.glyph() {
            Some(glyph) => glyph.to_string(),
            None => self.key().to_uppercase(),
        }
    }
}

/// Recognized motion input, rendered as a prefix ahead of the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionGlyph {
    QuarterForward,
    QuarterBack,
    DragonPunchForward,
    DragonPunchBack,
    HalfCircleForward,
    HalfCircleBack,
    Full360,
}

impl MotionGlyph {
    fn key(self) -> &'static str {
        use MotionGlyph::*;
        match self {
            QuarterForward => "qcf",
            QuarterBack => "qcb",
            DragonPunchForward => "dpf",
            DragonPunchBack => "dpb",
            HalfCircleForward => "hcf",
            HalfCircleBack => "hcb",
            Full360 => "360",
        }
    }

    /// Display glyph for the motion, if one is mapped. The text projection
    /// carries no image assets, so every key currently takes the fallback.
    pub fn glyph(self) -> Option<&'static str> {
        None
    }

    /// Rendered text: the glyph, or the uppercase raw key as a fallback.
    pub fn display(self) -> String {
        match self.glyph() {
            Some(glyph) => glyph.to_string(),
            None => self.key().to_uppercase(),
        }
    }
}

/// One deduplicated entry of the direction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionEvent {
    pub token: DirectionToken,
    pub at_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct ChargedDirection {
    token: DirectionToken,
    at_ms: u64,
}

/// Tracks direction history, charge state and the double-tap dash detector
/// for one engine session.
#[derive(Debug, Default)]
pub struct DirectionTracker {
    history: VecDeque<DirectionEvent>,
    current: DirectionToken,
    current_since_ms: u64,
    last_charged: Option<ChargedDirection>,
    forward_held: bool,
    forward_tap_ms: Option<u64>,
}

impl DirectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one tick's token. Returns true when a double-tap dash fired.
    pub fn update(&mut self, token: DirectionToken, now_ms: u64, profile: &Profile) -> bool {
        if self.history.back().map(|e| e.token) != Some(token) {
            self.history.push_back(DirectionEvent { token, at_ms: now_ms });
            let cutoff = now_ms.saturating_sub(profile.history_retention_ms());
            while self.history.front().map_or(false, |e| e.at_ms < cutoff) {
                self.history.pop_front();
            }
        }
        self.update_charge(token, now_ms, profile);
        self.detect_dash(token, now_ms, profile)
    }

    /// Most recent token if it is non-neutral.
    pub fn snapshot_direction(&self) -> Option<DirectionToken> {
        match self.history.back() {
            Some(e) if !e.token.is_neutral() => Some(e.token),
            _ => None,
        }
    }

    /// Runs motion pattern matching over the compressed sequence. First match
    /// in priority order wins: 360, double quarter-circle, half-circle,
    /// quarter-circle / dragon-punch.
    pub fn detect_motion(&self, now_ms: u64, profile: &Profile) -> Option<Vec<MotionGlyph>> {
        use DirectionToken::*;
        use MotionGlyph::*;

        let seq = self.compressed_sequence(now_ms, profile);
        if seq.is_empty() {
            return None;
        }

        if [Up, Down, Left, Right].iter().all(|t| seq.contains(t)) {
            return Some(vec![Full360]);
        }
        if is_subsequence(&seq, &[Down, DownRight, Right, Down, DownRight, Right]) {
            return Some(vec![QuarterForward, QuarterForward]);
        }
        if is_subsequence(&seq, &[Down, DownLeft, Left, Down, DownLeft, Left]) {
            return Some(vec![QuarterBack, QuarterBack]);
        }
        if half_circle(&seq, Left, Right) {
            return Some(vec![HalfCircleForward]);
        }
        if half_circle(&seq, Right, Left) {
            return Some(vec![HalfCircleBack]);
        }
        let simple: [(MotionGlyph, [DirectionToken; 3]); 4] = [
            (QuarterForward, [Down, DownRight, Right]),
            (QuarterBack, [Down, DownLeft, Left]),
            (DragonPunchForward, [Right, Down, DownRight]),
            (DragonPunchBack, [Left, Down, DownLeft]),
        ];
        for (glyph, pattern) in simple {
            if is_subsequence(&seq, &pattern) {
                return Some(vec![glyph]);
            }
        }
        None
    }

    /// Consumes the pending charge if it is fresh and opposite to the current
    /// direction. One-shot: a successful call clears the stored charge.
    pub fn consume_charge(
        &mut self,
        now_ms: u64,
        profile: &Profile,
    ) -> Option<(DirectionToken, DirectionToken)> {
        let charged = self.last_charged?;
        if now_ms.saturating_sub(charged.at_ms) > profile.charge_window_ms {
            return None;
        }
        let current = self.snapshot_direction()?;
        if !charged.token.is_opposite(current) {
            return None;
        }
        self.last_charged = None;
        Some((charged.token, current))
    }

    /// Drops the pending charge without recording it as used.
    pub fn reset_charge(&mut self) {
        self.last_charged = None;
    }

    /// Forgets everything, including direction history. Session reset only.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// History entries within the motion window, neutrals dropped, facing
    /// applied, consecutive duplicates collapsed.
    fn compressed_sequence(&self, now_ms: u64, profile: &Profile) -> Vec<DirectionToken> {
        let start = now_ms.saturating_sub(profile.motion_window_ms);
        let mut out: Vec<DirectionToken> = Vec::new();
        for event in &self.history {
            if event.at_ms < start || event.token.is_neutral() {
                continue;
            }
            let token = match profile.facing {
                Facing::Right => event.token,
                Facing::Left => event.token.mirrored(),
            };
            if out.last() != Some(&token) {
                out.push(token);
            }
        }
        out
    }

    fn update_charge(&mut self, token: DirectionToken, now_ms: u64, profile: &Profile) {
        if token == self.current {
            return;
        }
        if !self.current.is_neutral() {
            let held_ms = now_ms.saturating_sub(self.current_since_ms);
            if held_ms >= profile.charge_hold_ms() {
                self.last_charged = Some(ChargedDirection {
                    token: self.current,
                    at_ms: now_ms,
                });
            }
        }
        self.current = token;
        self.current_since_ms = now_ms;
    }

    fn detect_dash(&mut self, token: DirectionToken, now_ms: u64, profile: &Profile) -> bool {
        let forward = match profile.facing {
            Facing::Right => token,
            Facing::Left => token.mirrored(),
        } == DirectionToken::Right;

        if forward {
            if self.forward_held {
                return false;
            }
            self.forward_held = true;
            if let Some(tap_ms) = self.forward_tap_ms {
                if now_ms.saturating_sub(tap_ms) <= DASH_WINDOW_MS {
                    self.forward_tap_ms = None;
                    return true;
                }
            }
            self.forward_tap_ms = Some(now_ms);
        } else {
            self.forward_held = false;
        }
        false
    }
}

/// Ordered subsequence match: each pattern token must occur at or after the
/// position where the previous one was found; gaps are allowed.
fn is_subsequence(seq: &[DirectionToken], pattern: &[DirectionToken]) -> bool {
    let mut start = 0;
    for wanted in pattern {
        match seq[start..].iter().position(|t| t == wanted) {
            Some(offset) => start += offset + 1,
            None => return false,
        }
    }
    true
}

/// Half-circle check: the first occurrence of the start cardinal must precede
/// the last occurrence of the end cardinal, with a down-variant strictly
/// between the two.
fn half_circle(seq: &[DirectionToken], start: DirectionToken, end: DirectionToken) -> bool {
    let first = match seq.iter().position(|t| *t == start) {
        Some(i) => i,
        None => return false,
    };
    let last = match seq.iter().rposition(|t| *t == end) {
        Some(i) => i,
        None => return false,
    };
    first < last && seq[first + 1..last].iter().any(|t| t.has_down())
}
