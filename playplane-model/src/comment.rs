//! Timed comment records and the style overrides applied to them.

use std::str::FromStr;

use crate::error::ModelError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stroke used behind white text.
pub const DEFAULT_STROKE_DARK: u32 = 0x000000;
/// Stroke used behind any non-white text.
pub const DEFAULT_STROKE_LIGHT: u32 = 0xFFFFFF;

const WHITE: u32 = 0xFFFFFF;

/// Motion/position class of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CommentLayer {
    /// Scrolls right to left (the common case)
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "scroll_rl"))]
    ScrollRL,
    /// Scrolls left to right
    #[cfg_attr(feature = "serde", serde(rename = "scroll_lr"))]
    ScrollLR,
    TopFixed,
    BottomFixed,
    /// Custom-positioned comments; layout is owned by the rendering surface
    Advanced,
}

impl CommentLayer {
    pub const ALL: [CommentLayer; 5] = [
        CommentLayer::ScrollRL,
        CommentLayer::ScrollLR,
        CommentLayer::TopFixed,
        CommentLayer::BottomFixed,
        CommentLayer::Advanced,
    ];

    /// Map a wire type code onto a layer. Unknown codes fall back to
    /// [`CommentLayer::ScrollRL`].
    pub fn from_type_code(code: i32) -> Self {
        match code {
            1..=3 => CommentLayer::ScrollRL,
            4 => CommentLayer::BottomFixed,
            5 => CommentLayer::TopFixed,
            6 => CommentLayer::ScrollLR,
            7 => CommentLayer::Advanced,
            _ => CommentLayer::ScrollRL,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, CommentLayer::TopFixed | CommentLayer::BottomFixed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommentLayer::ScrollRL => "scroll_rl",
            CommentLayer::ScrollLR => "scroll_lr",
            CommentLayer::TopFixed => "top_fixed",
            CommentLayer::BottomFixed => "bottom_fixed",
            CommentLayer::Advanced => "advanced",
        }
    }
}

impl FromStr for CommentLayer {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scroll_rl" | "scroll" => Ok(CommentLayer::ScrollRL),
            "scroll_lr" | "reverse" => Ok(CommentLayer::ScrollLR),
            "top_fixed" | "top" => Ok(CommentLayer::TopFixed),
            "bottom_fixed" | "bottom" => Ok(CommentLayer::BottomFixed),
            "advanced" => Ok(CommentLayer::Advanced),
            other => Err(ModelError::UnknownLayer(other.to_string())),
        }
    }
}

/// One scheduled overlay unit.
///
/// Created once per content load and never mutated afterwards; the scheduler
/// takes ownership after the filter pipeline has run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Comment {
    /// Offset from content start in milliseconds
    pub show_at_ms: u64,
    pub text: String,
    pub layer: CommentLayer,
    pub font_size_px: f32,
    /// 0xRRGGBB
    pub color_rgb: u32,
    /// Derived from `color_rgb`: white text gets a dark stroke
    pub stroke_color_rgb: u32,
    /// Opaque sender hash, only used for block-list matching
    pub sender_key: String,
    /// Opaque record id, not guaranteed unique
    pub source_id: String,
}

impl Comment {
    pub fn new(
        show_at_ms: u64,
        text: impl Into<String>,
        layer: CommentLayer,
        font_size_px: f32,
        color_rgb: u32,
    ) -> Self {
        let color_rgb = color_rgb & 0xFF_FFFF;
        Self {
            show_at_ms,
            text: text.into(),
            layer,
            font_size_px,
            color_rgb,
            stroke_color_rgb: stroke_for(color_rgb),
            sender_key: String::new(),
            source_id: String::new(),
        }
    }

    pub fn with_sender(mut self, sender_key: impl Into<String>) -> Self {
        self.sender_key = sender_key.into();
        self
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }
}

fn stroke_for(color_rgb: u32) -> u32 {
    if color_rgb == WHITE {
        DEFAULT_STROKE_DARK
    } else {
        DEFAULT_STROKE_LIGHT
    }
}

/// Visual override produced by a styler plugin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleOverride {
    pub text_color_rgb: Option<u32>,
    /// 0xAARRGGBB
    pub background_argb: Option<u32>,
    pub bold: bool,
    pub scale: f32,
}

impl StyleOverride {
    /// Highlight preset: distinct color, semi-opaque dark background, bold,
    /// slightly enlarged.
    pub fn highlight(text_color_rgb: u32) -> Self {
        Self {
            text_color_rgb: Some(text_color_rgb & 0xFF_FFFF),
            background_argb: Some(0x8000_0000),
            bold: true,
            scale: 1.15,
        }
    }
}

impl Default for StyleOverride {
    fn default() -> Self {
        Self {
            text_color_rgb: None,
            background_argb: None,
            bold: false,
            scale: 1.0,
        }
    }
}

/// A comment that survived the filter pipeline, with its resolved style.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyledComment {
    pub comment: Comment,
    pub style: Option<StyleOverride>,
}

impl StyledComment {
    pub fn plain(comment: Comment) -> Self {
        Self {
            comment,
            style: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_collapse_onto_layers() {
        assert_eq!(CommentLayer::from_type_code(1), CommentLayer::ScrollRL);
        assert_eq!(CommentLayer::from_type_code(2), CommentLayer::ScrollRL);
        assert_eq!(CommentLayer::from_type_code(3), CommentLayer::ScrollRL);
        assert_eq!(CommentLayer::from_type_code(4), CommentLayer::BottomFixed);
        assert_eq!(CommentLayer::from_type_code(5), CommentLayer::TopFixed);
        assert_eq!(CommentLayer::from_type_code(6), CommentLayer::ScrollLR);
        assert_eq!(CommentLayer::from_type_code(7), CommentLayer::Advanced);
        assert_eq!(CommentLayer::from_type_code(42), CommentLayer::ScrollRL);
        assert_eq!(CommentLayer::from_type_code(-1), CommentLayer::ScrollRL);
    }

    #[test]
    fn stroke_contrasts_with_text_color() {
        let white = Comment::new(0, "a", CommentLayer::ScrollRL, 25.0, 0xFFFFFF);
        assert_eq!(white.stroke_color_rgb, DEFAULT_STROKE_DARK);

        let red = Comment::new(0, "a", CommentLayer::ScrollRL, 25.0, 0xFF0000);
        assert_eq!(red.stroke_color_rgb, DEFAULT_STROKE_LIGHT);
    }

    #[test]
    fn color_is_masked_to_rgb() {
        let comment =
            Comment::new(0, "a", CommentLayer::ScrollRL, 25.0, 0x7FFF_FFFF);
        assert_eq!(comment.color_rgb, 0xFFFFFF);
        assert_eq!(comment.stroke_color_rgb, DEFAULT_STROKE_DARK);
    }

    #[test]
    fn layer_names_parse() {
        assert_eq!("top".parse::<CommentLayer>(), Ok(CommentLayer::TopFixed));
        assert_eq!(
            " Bottom_Fixed ".parse::<CommentLayer>(),
            Ok(CommentLayer::BottomFixed)
        );
        assert!("sideways".parse::<CommentLayer>().is_err());
    }
}
