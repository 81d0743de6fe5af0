//! Built-in filters and stylers.

use std::collections::HashSet;

use playplane_model::{Comment, CommentLayer, PluginId, StyleOverride};

use super::{CommentFilter, CommentStyler};

pub const KEYWORD_BLOCK_ID: &str = "keyword-block";
pub const SENDER_BLOCK_ID: &str = "sender-block";
pub const LAYER_FILTER_ID: &str = "layer-filter";
pub const HIGHLIGHT_ID: &str = "highlight";

/// Lower-cased, non-blank tokens.
fn normalize_tokens<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| token.as_ref().trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    if needles.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

/// Drops comments whose text contains a blocked keyword (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct KeywordBlockList {
    keywords: Vec<String>,
}

impl KeywordBlockList {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: normalize_tokens(keywords),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl CommentFilter for KeywordBlockList {
    fn id(&self) -> PluginId {
        PluginId::new(KEYWORD_BLOCK_ID)
    }

    fn filter(&self, comment: &Comment) -> bool {
        !contains_any(&comment.text, &self.keywords)
    }
}

/// Drops comments from blocked senders.
///
/// A sender matches a token when the normalized sender key equals the token,
/// is a prefix of it, or contains it. Blank tokens and blank sender keys
/// never match.
#[derive(Debug, Clone, Default)]
pub struct SenderBlockList {
    tokens: Vec<String>,
}

impl SenderBlockList {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: normalize_tokens(tokens),
        }
    }

    pub fn is_blocked(&self, sender_key: &str) -> bool {
        let sender = sender_key.trim().to_lowercase();
        if sender.is_empty() {
            return false;
        }
        self.tokens.iter().any(|token| {
            sender == *token
                || token.starts_with(sender.as_str())
                || sender.contains(token.as_str())
        })
    }
}

impl CommentFilter for SenderBlockList {
    fn id(&self) -> PluginId {
        PluginId::new(SENDER_BLOCK_ID)
    }

    fn filter(&self, comment: &Comment) -> bool {
        !self.is_blocked(&comment.sender_key)
    }
}

/// Hides whole layers, e.g. every top-fixed comment.
#[derive(Debug, Clone, Default)]
pub struct LayerFilter {
    hidden: HashSet<CommentLayer>,
}

impl LayerFilter {
    pub fn new(hidden: impl IntoIterator<Item = CommentLayer>) -> Self {
        Self {
            hidden: hidden.into_iter().collect(),
        }
    }
}

impl CommentFilter for LayerFilter {
    fn id(&self) -> PluginId {
        PluginId::new(LAYER_FILTER_ID)
    }

    fn filter(&self, comment: &Comment) -> bool {
        !self.hidden.contains(&comment.layer)
    }
}

/// Highlights comments that mention a keyword.
#[derive(Debug, Clone)]
pub struct HighlightStyler {
    keywords: Vec<String>,
    color_rgb: u32,
}

impl HighlightStyler {
    pub fn new<I, S>(keywords: I, color_rgb: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: normalize_tokens(keywords),
            color_rgb,
        }
    }
}

impl CommentStyler for HighlightStyler {
    fn id(&self) -> PluginId {
        PluginId::new(HIGHLIGHT_ID)
    }

    fn style(&self, comment: &Comment) -> Option<StyleOverride> {
        contains_any(&comment.text, &self.keywords)
            .then(|| StyleOverride::highlight(self.color_rgb))
    }
}
