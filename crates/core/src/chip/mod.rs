use serde::{Deserialize, Serialize};

use crate::direction::{DirectionToken, MotionGlyph};

/// Structured content of one notation chip. Rendered text is always a pure
/// projection of this value; nothing downstream stores chip text separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChipContent {
    /// A single button press, label already resolved through the profile.
    Button(String),
    /// Two or more near-simultaneous presses, labels in press-time order.
    Chord(Vec<String>),
    /// A directional prefix: one token for a plain direction, two for a
    /// charge release (held direction followed by the release direction).
    DirectionPrefixed {
        directions: Vec<DirectionToken>,
        inner: Box<ChipContent>,
    },
    /// A recognized motion input prefix.
    MotionPrefixed {
        motions: Vec<MotionGlyph>,
        inner: Box<ChipContent>,
    },
    /// A collapsed burst of identical inputs.
    Mash(Box<ChipContent>),
}

impl ChipContent {
    /// Projects the content to display text.
    pub fn render(&self) -> String {
        match self {
            ChipContent::Button(label) => label.clone(),
            ChipContent::Chord(labels) => labels.join(" + "),
            ChipContent::DirectionPrefixed { directions, inner } => match directions.as_slice() {
                [single] => format!("{} + {}", single.display(), inner.render()),
                many => {
                    let prefix: Vec<String> = many.iter().map(|d| d.display()).collect();
                    format!("{} {}", prefix.join(" "), inner.render())
                }
            },
            ChipContent::MotionPrefixed { motions, inner } => {
                let prefix: Vec<String> = motions.iter().map(|m| m.display()).collect();
                format!("{} {}", prefix.join(" "), inner.render())
            }
            // Mash chips drop the `+` joiners so the line reads as one unit.
            ChipContent::Mash(inner) => format!("Mash {}", inner.render().replace(" + ", " ")),
        }
    }

    /// Label of the innermost button, or the first chord label in press order.
    pub fn primary_label(&self) -> Option<&str> {
        match self {
            ChipContent::Button(label) => Some(label),
            ChipContent::Chord(labels) => labels.first().map(String::as_str),
            ChipContent::DirectionPrefixed { inner, .. }
            | ChipContent::MotionPrefixed { inner, .. }
            | ChipContent::Mash(inner) => inner.primary_label(),
        }
    }

    /// Rewrites the first label equal to `from` (innermost first) to `to`.
    /// Returns false when no label matched.
    pub fn rewrite_label(&mut self, from: &str, to: &str) -> bool {
        match self {
            ChipContent::Button(label) => {
                if label == from {
                    *label = to.to_string();
                    true
                } else {
                    false
                }
            }
            ChipContent::Chord(labels) => {
                for label in labels.iter_mut() {
                    if label == from {
                        *label = to.to_string();
                        return true;
                    }
                }
                false
            }
            ChipContent::DirectionPrefixed { inner, .. }
            | ChipContent::MotionPrefixed { inner, .. }
            | ChipContent::Mash(inner) => inner.rewrite_label(from, to),
        }
    }
}

/// One chip of the visible sequence. `source_index` is the stable creation
/// order and survives index shifts from removals further left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chip {
    pub content: ChipContent,
    pub source_index: u64,
}
