use serde::{Deserialize, Serialize};

/// Segment-skip behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SkipConfig {
    /// Skip matching segments without asking. When off, the host is expected
    /// to offer a manual skip affordance instead.
    pub auto_skip: bool,
    /// Category slugs eligible for skipping; empty means every category.
    pub categories: Vec<String>,
    /// Segments shorter than this are ignored at load time.
    pub min_segment_ms: u64,
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            auto_skip: true,
            categories: Vec::new(),
            min_segment_ms: 1_000,
        }
    }
}

impl SkipConfig {
    pub fn allows_category(&self, category: &str) -> bool {
        self.categories.is_empty()
            || self
                .categories
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(category))
    }
}
