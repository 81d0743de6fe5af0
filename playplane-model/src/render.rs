use crate::comment::{CommentLayer, StyleOverride};
use crate::ids::SlotId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Delta command pushed to the rendering surface. The surface owns glyph
/// layout and animation; the core only says what appears and disappears.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "op", rename_all = "snake_case"))]
pub enum RenderCommand {
    Activate {
        slot_id: SlotId,
        lane: u8,
        layer: CommentLayer,
        text: String,
        font_size_px: f32,
        color_rgb: u32,
        stroke_color_rgb: u32,
        style: Option<StyleOverride>,
    },
    Deactivate {
        slot_id: SlotId,
    },
}

impl RenderCommand {
    pub fn slot_id(&self) -> SlotId {
        match self {
            RenderCommand::Activate { slot_id, .. }
            | RenderCommand::Deactivate { slot_id } => *slot_id,
        }
    }

    pub fn is_activate(&self) -> bool {
        matches!(self, RenderCommand::Activate { .. })
    }
}
