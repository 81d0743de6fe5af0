//! Comment filter/style pipeline.
//!
//! Filters compose by short-circuit AND in registration order: the first
//! filter that rejects a comment drops it and later filters are not asked.
//! Stylers run only for kept comments and the first override wins.

pub mod plugins;
pub mod registry;
pub mod store;

use std::sync::Arc;

use playplane_config::FilterConfig;
use playplane_model::{Comment, CommentLayer, PluginId, SkipAction, StyleOverride, StyledComment};
use tracing::debug;

pub use plugins::{HighlightStyler, KeywordBlockList, LayerFilter, SenderBlockList};
pub use registry::{PluginKind, PluginRegistry, PluginStats};
pub use store::PluginConfigStore;

/// Keeps or drops a comment. `true` keeps it.
pub trait CommentFilter: Send + Sync {
    fn id(&self) -> PluginId;
    fn filter(&self, comment: &Comment) -> bool;
}

/// Optionally restyles a kept comment.
pub trait CommentStyler: Send + Sync {
    fn id(&self) -> PluginId;
    fn style(&self, comment: &Comment) -> Option<StyleOverride>;
}

/// Reacts to the playback clock, e.g. to skip segments.
pub trait PositionWatcher: Send {
    fn id(&self) -> PluginId;
    fn on_position_tick(&mut self, position_ms: u64) -> SkipAction;
    /// Forget per-content state.
    fn reset(&mut self);
}

/// Result of running a batch through the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    pub kept: Vec<StyledComment>,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    pub enabled: bool,
    pub plugins: Vec<PluginStats>,
}

#[derive(Debug)]
pub struct FilterPipeline {
    registry: PluginRegistry,
    enabled: bool,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new(PluginRegistry::new())
    }
}

impl FilterPipeline {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            enabled: true,
        }
    }

    /// Canonical plugins: keyword block-list, sender block-list, layer filter
    /// (nothing hidden) and the highlight styler.
    pub fn from_config(config: &FilterConfig) -> Self {
        Self::with_hidden_layers(config, &[])
    }

    pub fn with_hidden_layers(config: &FilterConfig, hidden_layers: &[CommentLayer]) -> Self {
        let mut registry = PluginRegistry::new();
        registry
            .register_filter(Arc::new(KeywordBlockList::new(config.blocked_keyword_list())))
            .register_filter(Arc::new(SenderBlockList::new(config.blocked_sender_list())))
            .register_filter(Arc::new(LayerFilter::new(hidden_layers.iter().copied())))
            .register_styler(Arc::new(HighlightStyler::new(
                config.highlight_keyword_list(),
                config.highlight_color,
            )));
        Self::new(registry)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn the whole pipeline on or off. A disabled pipeline passes every
    /// comment through unstyled. Toggling starts a new counting session.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.registry.reset_counters();
        }
    }

    pub fn set_plugin_enabled(&mut self, id: &PluginId, enabled: bool) -> bool {
        self.registry.set_enabled(id, enabled)
    }

    /// `None` means dropped.
    pub fn apply(&self, comment: Comment) -> Option<StyledComment> {
        if !self.enabled {
            return Some(StyledComment::plain(comment));
        }

        for entry in self.registry.filters.iter().filter(|entry| entry.enabled) {
            if !entry.plugin.filter(&comment) {
                entry.record_applied();
                return None;
            }
        }

        let style = self
            .registry
            .stylers
            .iter()
            .filter(|entry| entry.enabled)
            .find_map(|entry| {
                let style = entry.plugin.style(&comment)?;
                entry.record_applied();
                Some(style)
            });

        Some(StyledComment { comment, style })
    }

    pub fn process(&self, comments: Vec<Comment>) -> PipelineOutput {
        let total = comments.len();
        let kept: Vec<StyledComment> =
            comments.into_iter().filter_map(|comment| self.apply(comment)).collect();
        let dropped = total - kept.len();
        debug!(kept = kept.len(), dropped, "comment pipeline applied");
        PipelineOutput { kept, dropped }
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            enabled: self.enabled,
            plugins: self.registry.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFilter {
        id: &'static str,
        keep: bool,
        calls: Arc<AtomicUsize>,
    }

    impl CommentFilter for CountingFilter {
        fn id(&self) -> PluginId {
            PluginId::new(self.id)
        }

        fn filter(&self, _comment: &Comment) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.keep
        }
    }

    struct FixedStyler(&'static str, f32);

    impl CommentStyler for FixedStyler {
        fn id(&self) -> PluginId {
            PluginId::new(self.0)
        }

        fn style(&self, _comment: &Comment) -> Option<StyleOverride> {
            Some(StyleOverride {
                scale: self.1,
                ..StyleOverride::default()
            })
        }
    }

    fn comment(text: &str) -> Comment {
        Comment::new(0, text, CommentLayer::ScrollRL, 25.0, 0xFFFFFF)
    }

    fn stat<'a>(stats: &'a PipelineStats, id: &str) -> &'a PluginStats {
        stats
            .plugins
            .iter()
            .find(|plugin| plugin.id.as_str() == id)
            .unwrap()
    }

    #[test]
    fn first_rejecting_filter_short_circuits() {
        let second_calls = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry
            .register_filter(Arc::new(CountingFilter {
                id: "reject",
                keep: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }))
            .register_filter(Arc::new(CountingFilter {
                id: "later",
                keep: true,
                calls: second_calls.clone(),
            }));
        let pipeline = FilterPipeline::new(registry);

        assert!(pipeline.apply(comment("x")).is_none());
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        assert_eq!(stat(&pipeline.stats(), "reject").applied, 1);
    }

    #[test]
    fn first_styler_wins_and_only_for_kept_comments() {
        let mut registry = PluginRegistry::new();
        registry
            .register_styler(Arc::new(FixedStyler("big", 2.0)))
            .register_styler(Arc::new(FixedStyler("small", 0.5)));
        let pipeline = FilterPipeline::new(registry);

        let styled = pipeline.apply(comment("x")).unwrap();
        assert_eq!(styled.style.unwrap().scale, 2.0);
        assert_eq!(stat(&pipeline.stats(), "big").applied, 1);
        assert_eq!(stat(&pipeline.stats(), "small").applied, 0);
    }

    #[test]
    fn canonical_pipeline_from_config() {
        let config = FilterConfig {
            blocked_keywords: "spoiler".into(),
            blocked_senders: "troll".into(),
            highlight_keywords: "wow".into(),
            ..FilterConfig::default()
        };
        let pipeline =
            FilterPipeline::with_hidden_layers(&config, &[CommentLayer::BottomFixed]);

        let output = pipeline.process(vec![
            comment("a spoiler"),
            comment("hello").with_sender("troll42"),
            Comment::new(0, "bottom", CommentLayer::BottomFixed, 25.0, 0),
            comment("wow nice"),
            comment("plain"),
        ]);

        assert_eq!(output.dropped, 3);
        assert_eq!(output.kept.len(), 2);
        assert!(output.kept[0].style.is_some());
        assert!(output.kept[1].style.is_none());

        let stats = pipeline.stats();
        assert_eq!(stat(&stats, plugins::KEYWORD_BLOCK_ID).applied, 1);
        assert_eq!(stat(&stats, plugins::SENDER_BLOCK_ID).applied, 1);
        assert_eq!(stat(&stats, plugins::LAYER_FILTER_ID).applied, 1);
        assert_eq!(stat(&stats, plugins::HIGHLIGHT_ID).applied, 1);
    }

    #[test]
    fn re_enabling_a_plugin_resets_its_counter() {
        let config = FilterConfig {
            blocked_keywords: "spoiler".into(),
            ..FilterConfig::default()
        };
        let mut pipeline = FilterPipeline::from_config(&config);
        let id = PluginId::new(plugins::KEYWORD_BLOCK_ID);

        pipeline.process(vec![comment("spoiler"), comment("spoiler")]);
        assert_eq!(stat(&pipeline.stats(), plugins::KEYWORD_BLOCK_ID).applied, 2);

        // Same value is not a toggle.
        assert!(pipeline.set_plugin_enabled(&id, true));
        assert_eq!(stat(&pipeline.stats(), plugins::KEYWORD_BLOCK_ID).applied, 2);

        pipeline.set_plugin_enabled(&id, false);
        assert!(pipeline.apply(comment("spoiler")).is_some());
        pipeline.set_plugin_enabled(&id, true);
        assert_eq!(stat(&pipeline.stats(), plugins::KEYWORD_BLOCK_ID).applied, 0);

        assert!(!pipeline.set_plugin_enabled(&PluginId::new("missing"), false));
    }

    #[test]
    fn disabled_pipeline_passes_everything_through() {
        let config = FilterConfig {
            blocked_keywords: "spoiler".into(),
            highlight_keywords: "spoiler".into(),
            ..FilterConfig::default()
        };
        let mut pipeline = FilterPipeline::from_config(&config);
        pipeline.process(vec![comment("spoiler")]);

        pipeline.set_enabled(false);
        let output = pipeline.process(vec![comment("spoiler")]);
        assert_eq!(output.dropped, 0);
        assert!(output.kept[0].style.is_none());
        assert!(pipeline.stats().plugins.iter().all(|p| p.applied == 0));
    }
}
