//! Position-triggered segment skipping.

use std::borrow::Cow;
use std::collections::HashSet;

use playplane_config::SkipConfig;
use playplane_model::{ContentKey, PluginId, SkipAction, SponsorSegment};
use tracing::{debug, trace};

use crate::pipeline::PositionWatcher;

pub const SEGMENT_SKIP_ID: &str = "segment-skip";

/// Human-readable label for a category slug. Unknown slugs pass through.
pub fn category_label(category: &str) -> Cow<'_, str> {
    let label = match category {
        "sponsor" => "Sponsor",
        "intro" => "Intermission/Intro",
        "outro" => "Endcards/Credits",
        "selfpromo" => "Self Promotion",
        "interaction" => "Interaction Reminder",
        "preview" => "Preview/Recap",
        "music_offtopic" => "Non-Music Section",
        "filler" => "Filler",
        other => return Cow::Borrowed(other),
    };
    Cow::Borrowed(label)
}

/// Watches the position and skips over segments.
///
/// Each segment fires at most once per content: after an auto-skip, a manual
/// skip or a dismissal its id is consumed until the content changes or ends.
#[derive(Debug, Default)]
pub struct SegmentSkipController {
    config: SkipConfig,
    content: Option<ContentKey>,
    segments: Vec<SponsorSegment>,
    consumed: HashSet<String>,
}

impl SegmentSkipController {
    pub fn new(config: SkipConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn auto_skip(&self) -> bool {
        self.config.auto_skip
    }

    pub fn set_auto_skip(&mut self, enabled: bool) {
        self.config.auto_skip = enabled;
    }

    pub fn content(&self) -> Option<ContentKey> {
        self.content
    }

    pub fn segments(&self) -> &[SponsorSegment] {
        &self.segments
    }

    pub fn is_consumed(&self, segment_id: &str) -> bool {
        self.consumed.contains(segment_id)
    }

    /// Replace the segment list for `content`. Segments outside the category
    /// allow-list, shorter than the minimum, or with inverted ranges are
    /// dropped; source order is kept. Returns how many were accepted.
    pub fn load_segments(&mut self, content: ContentKey, segments: Vec<SponsorSegment>) -> usize {
        self.clear();
        self.content = Some(content);

        let offered = segments.len();
        self.segments = segments
            .into_iter()
            .filter(|segment| {
                segment.start_ms <= segment.end_ms
                    && segment.duration_ms() >= self.config.min_segment_ms
                    && self.config.allows_category(&segment.category)
            })
            .collect();

        debug!(
            content = %content,
            offered,
            accepted = self.segments.len(),
            "skip segments loaded"
        );
        self.segments.len()
    }

    /// Forget segments and consumed ids.
    pub fn clear(&mut self) {
        self.content = None;
        self.segments.clear();
        self.consumed.clear();
    }

    /// Reset applied when the content plays to its end.
    pub fn on_content_end(&mut self) {
        self.clear();
    }

    fn candidate(&self, position_ms: u64) -> Option<&SponsorSegment> {
        self.segments
            .iter()
            .find(|segment| segment.contains(position_ms) && !self.consumed.contains(&segment.id))
    }

    pub fn on_position_tick(&mut self, position_ms: u64) -> SkipAction {
        if !self.config.auto_skip {
            return SkipAction::None;
        }
        let Some(segment) = self.candidate(position_ms) else {
            return SkipAction::None;
        };

        let id = segment.id.clone();
        let action = skip_to(segment);
        debug!(segment_id = %id, position_ms, ?action, "auto-skipping segment");
        self.consumed.insert(id);
        action
    }

    /// Segment the host should offer a manual skip for at this position.
    pub fn pending_prompt(&self, position_ms: u64) -> Option<&SponsorSegment> {
        self.candidate(position_ms)
    }

    /// Viewer declined the skip. Returns whether the segment was known.
    pub fn dismiss(&mut self, segment_id: &str) -> bool {
        if !self.segments.iter().any(|segment| segment.id == segment_id) {
            return false;
        }
        trace!(segment_id, "segment dismissed");
        self.consumed.insert(segment_id.to_string())
    }

    /// Viewer asked to skip a segment.
    pub fn skip_manually(&mut self, segment_id: &str) -> SkipAction {
        let Some(segment) = self
            .segments
            .iter()
            .find(|segment| segment.id == segment_id && !self.consumed.contains(&segment.id))
        else {
            return SkipAction::None;
        };

        let action = skip_to(segment);
        self.consumed.insert(segment_id.to_string());
        action
    }
}

fn skip_to(segment: &SponsorSegment) -> SkipAction {
    SkipAction::SkipTo {
        target_ms: segment.end_ms,
        reason: category_label(&segment.category).into_owned(),
    }
}

impl PositionWatcher for SegmentSkipController {
    fn id(&self) -> PluginId {
        PluginId::new(SEGMENT_SKIP_ID)
    }

    fn on_position_tick(&mut self, position_ms: u64) -> SkipAction {
        SegmentSkipController::on_position_tick(self, position_ms)
    }

    fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, start_ms: u64, end_ms: u64, category: &str) -> SponsorSegment {
        SponsorSegment::new(id, start_ms, end_ms, category).unwrap()
    }

    fn controller(config: SkipConfig) -> SegmentSkipController {
        let mut controller = SegmentSkipController::new(config);
        controller.load_segments(
            ContentKey::whole(1),
            vec![
                segment("A", 0, 10_000, "sponsor"),
                segment("B", 20_000, 30_000, "intro"),
            ],
        );
        controller
    }

    #[test]
    fn auto_skip_consumes_each_segment_once() {
        let mut controller = controller(SkipConfig::default());

        let action = controller.on_position_tick(5_000);
        assert_eq!(
            action,
            SkipAction::SkipTo {
                target_ms: 10_000,
                reason: "Sponsor".into()
            }
        );
        assert!(controller.is_consumed("A"));
        assert_eq!(controller.on_position_tick(5_000), SkipAction::None);

        assert_eq!(controller.on_position_tick(25_000).target_ms(), Some(30_000));
        assert_eq!(controller.on_position_tick(15_000), SkipAction::None);
    }

    #[test]
    fn end_bound_is_exclusive() {
        let mut controller = controller(SkipConfig::default());
        assert_eq!(controller.on_position_tick(10_000), SkipAction::None);
        assert!(controller.on_position_tick(0).is_skip());
    }

    #[test]
    fn manual_mode_leaves_decision_to_host() {
        let mut controller = controller(SkipConfig {
            auto_skip: false,
            ..SkipConfig::default()
        });

        assert_eq!(controller.on_position_tick(5_000), SkipAction::None);
        assert_eq!(controller.pending_prompt(5_000).map(|s| s.id.as_str()), Some("A"));

        let action = controller.skip_manually("A");
        assert_eq!(action.target_ms(), Some(10_000));
        assert!(controller.pending_prompt(5_000).is_none());
        assert_eq!(controller.skip_manually("A"), SkipAction::None);

        assert!(controller.dismiss("B"));
        assert!(controller.pending_prompt(25_000).is_none());
        assert!(!controller.dismiss("missing"));
    }

    #[test]
    fn content_change_and_end_clear_state() {
        let mut controller = controller(SkipConfig::default());
        controller.on_position_tick(5_000);

        controller.load_segments(ContentKey::whole(2), vec![segment("A", 0, 10_000, "sponsor")]);
        assert!(!controller.is_consumed("A"));
        assert!(controller.on_position_tick(5_000).is_skip());

        controller.on_content_end();
        assert!(controller.segments().is_empty());
        assert!(controller.content().is_none());
    }

    #[test]
    fn load_filters_categories_and_short_segments() {
        let mut controller = SegmentSkipController::new(SkipConfig {
            categories: vec!["sponsor".into()],
            min_segment_ms: 2_000,
            ..SkipConfig::default()
        });
        let mut inverted = segment("inv", 0, 5_000, "sponsor");
        inverted.start_ms = 9_000;

        let accepted = controller.load_segments(
            ContentKey::whole(1),
            vec![
                segment("short", 0, 1_000, "sponsor"),
                segment("intro", 0, 5_000, "intro"),
                inverted,
                segment("keep", 0, 5_000, "sponsor"),
            ],
        );
        assert_eq!(accepted, 1);
        assert_eq!(controller.segments()[0].id, "keep");
    }

    #[test]
    fn labels_known_categories() {
        assert_eq!(category_label("outro"), "Endcards/Credits");
        assert_eq!(category_label("music_offtopic"), "Non-Music Section");
        assert_eq!(category_label("custom"), "custom");
    }
}
