use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of one loadable piece of content.
///
/// `sub_content_id == 0` means the content has no sub-parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContentKey {
    pub content_id: u64,
    pub sub_content_id: u64,
}

impl ContentKey {
    pub fn new(content_id: u64, sub_content_id: u64) -> Self {
        Self {
            content_id,
            sub_content_id,
        }
    }

    pub fn whole(content_id: u64) -> Self {
        Self::new(content_id, 0)
    }

    pub fn has_sub_content(&self) -> bool {
        self.sub_content_id != 0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_sub_content() {
            write!(f, "{}/{}", self.content_id, self.sub_content_id)
        } else {
            write!(f, "{}", self.content_id)
        }
    }
}

/// Handle for a visible overlay slot; unique per scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotId(pub u64);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Stable identifier of a registered plugin; also used to key its persisted
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PluginId(String);

impl PluginId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PluginId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
