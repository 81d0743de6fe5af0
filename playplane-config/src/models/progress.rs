use serde::{Deserialize, Serialize};

/// Resume-position cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Key prefix in the shared key-value store.
    pub namespace: String,
    /// Minimum distance playback has to travel before a periodic save.
    pub save_interval_ms: u64,
    /// Cached positions earlier than this are not worth resuming.
    pub min_resume_ms: u64,
    /// Cached positions this close to the end restart from the beginning.
    pub end_margin_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            namespace: "playplane".to_string(),
            save_interval_ms: 15_000,
            min_resume_ms: 5_000,
            end_margin_ms: 10_000,
        }
    }
}
