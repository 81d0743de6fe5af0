use playplane_model::CommentLayer;
use serde::{Deserialize, Serialize};

/// Maximum number of concurrently visible lanes per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneLimit {
    Bounded(u8),
    Unbounded,
}

impl LaneLimit {
    /// Derive the lane limit from the fraction of the video the overlay may
    /// cover.
    pub fn from_display_ratio(ratio: f32) -> Self {
        if ratio <= 0.25 {
            LaneLimit::Bounded(3)
        } else if ratio <= 0.5 {
            LaneLimit::Bounded(5)
        } else if ratio <= 0.75 {
            LaneLimit::Bounded(8)
        } else {
            LaneLimit::Unbounded
        }
    }

    /// Highest usable lane count, with `Unbounded` capped by the lane type.
    pub fn capacity(&self) -> usize {
        match self {
            LaneLimit::Bounded(n) => *n as usize,
            LaneLimit::Unbounded => u8::MAX as usize + 1,
        }
    }
}

/// Timed-comment overlay settings. Changing these at runtime goes through the
/// scheduler's `configure` call so the new values land on a tick boundary.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Fraction of the picture the overlay may cover (0.0 - 1.0). Drives the
    /// lane limit: <=0.25 gives 3 lanes, <=0.5 gives 5, <=0.75 gives 8, and
    /// anything above is unbounded.
    pub display_area_ratio: f32,
    /// How long scrolling and advanced comments stay visible.
    pub scroll_duration_ms: u64,
    /// How long top/bottom fixed comments stay visible.
    pub fixed_duration_ms: u64,
    /// Collapse identical comments posted close together into one slot with
    /// an occurrence counter.
    pub merge_duplicates: bool,
    /// Window used by `merge_duplicates`, measured from the first occurrence.
    pub merge_window_ms: u64,
    /// Poll interval when the position feed is pulled rather than pushed.
    pub tick_interval_ms: u64,
    /// Plain ticks that jump further than this (or go backwards) are treated
    /// as seeks.
    pub discontinuity_threshold_ms: u64,
    /// Layers the viewer has chosen to hide entirely.
    pub hidden_layers: Vec<CommentLayer>,
    /// Upper bound on comments armed per content load; the earliest ones win.
    pub max_comments_per_load: Option<usize>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            display_area_ratio: 0.5,
            scroll_duration_ms: 4_000,
            fixed_duration_ms: 5_000,
            merge_duplicates: false,
            merge_window_ms: 2_000,
            tick_interval_ms: 200,
            discontinuity_threshold_ms: 1_500,
            hidden_layers: Vec::new(),
            max_comments_per_load: None,
        }
    }
}

impl OverlayConfig {
    pub fn lane_limit(&self) -> LaneLimit {
        LaneLimit::from_display_ratio(self.display_area_ratio)
    }
}
