use serde::{Deserialize, Serialize};

use crate::util::split_csv;

/// Block-list and highlight settings for the comment filter pipeline.
///
/// List-valued settings are stored as comma separated strings so they can be
/// edited as a single text field and round-trip through the key-value store
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Comments containing any of these (case-insensitive) are dropped.
    pub blocked_keywords: String,
    /// Sender keys (or fragments of them) whose comments are dropped.
    pub blocked_senders: String,
    /// Comments containing any of these get the highlight style.
    pub highlight_keywords: String,
    /// Text color used for highlighted comments, 0xRRGGBB.
    pub highlight_color: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            blocked_keywords: String::new(),
            blocked_senders: String::new(),
            highlight_keywords: String::new(),
            highlight_color: 0xFFD700,
        }
    }
}

impl FilterConfig {
    pub fn blocked_keyword_list(&self) -> Vec<String> {
        split_csv(&self.blocked_keywords)
    }

    pub fn blocked_sender_list(&self) -> Vec<String> {
        split_csv(&self.blocked_senders)
    }

    pub fn highlight_keyword_list(&self) -> Vec<String> {
        split_csv(&self.highlight_keywords)
    }
}
