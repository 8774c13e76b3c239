//! Core library for the Combo Overlay application.
//!
//! The crate turns a noisy, high-frequency stream of raw controller state
//! into a small number of discrete notation chips: directions and motion
//! inputs (quarter-circles, dragon punches, half-circles, 360s, charges,
//! dashes), deterministically batched chords, and collapsed mash bursts.
//! Every structural change to the resulting chip sequence is recorded in an
//! invertible operation log, so the overlay is fully undo/redo capable.
//! Rendering, persistence and export are external collaborators that consume
//! the typed [`ChipEvent`] stream.

pub mod chip;
pub mod chord;
pub mod compose;
pub mod config;
pub mod direction;
pub mod engine;
pub mod error;
pub mod history;
pub mod mash;
pub mod sequence;
pub mod timeline;

pub use chip::{Chip, ChipContent};
pub use chord::{ChordManager, PendingPress};
pub use config::{Facing, Profile};
pub use direction::{DirectionEvent, DirectionToken, DirectionTracker, MotionGlyph};
pub use engine::{ControllerFrame, Engine};
pub use error::{OverlayError, Result};
pub use history::{HistoryLog, HistoryOp};
pub use mash::{MashCollapse, MashOutcome};
pub use sequence::{ChipEvent, ChipSequence, SubscriptionId};
pub use timeline::{TimerQueue, TimerToken};
