//! Chip composition.
//!
//! Turns a finalized button or chord into final chip content using the
//! direction tracker's state. Priority: charge release, then motion pattern,
//! then directional prefix, then the bare input.

use crate::chip::ChipContent;
use crate::config::Profile;
use crate::direction::{DirectionToken, DirectionTracker};

/// Composes the content for one finalized input.
pub fn compose(
    mut inner: ChipContent,
    tracker: &mut DirectionTracker,
    now_ms: u64,
    profile: &Profile,
) -> ChipContent {
    let snapshot = tracker.snapshot_direction();

    // The jump marker is a label-text transform, independent of whichever
    // prefix wins below.
    if snapshot == Some(DirectionToken::Up) {
        apply_jump_marker(&mut inner);
    }

    if let Some((held, release)) = tracker.consume_charge(now_ms, profile) {
        return ChipContent::DirectionPrefixed {
            directions: vec![held, release],
            inner: Box::new(inner),
        };
    }

    if let Some(motions) = tracker.detect_motion(now_ms, profile) {
        return ChipContent::MotionPrefixed {
            motions,
            inner: Box::new(inner),
        };
    }

    if let Some(token) = snapshot {
        return ChipContent::DirectionPrefixed {
            directions: vec![token],
            inner: Box::new(inner),
        };
    }

    inner
}

fn apply_jump_marker(content: &mut ChipContent) {
    match content {
        ChipContent::Button(label) => jump_prefix(label),
        ChipContent::Chord(labels) => {
            if let Some(first) = labels.first_mut() {
                jump_prefix(first);
            }
        }
        ChipContent::DirectionPrefixed { inner, .. }
        | ChipContent::MotionPrefixed { inner, .. }
        | ChipContent::Mash(inner) => apply_jump_marker(inner),
    }
}

fn jump_prefix(label: &mut String) {
    if !label.to_lowercase().starts_with("j.") {
        *label = format!("j.{label}");
    }
}
