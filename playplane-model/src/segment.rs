use crate::error::{ModelError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Time range within content that may be skipped automatically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SponsorSegment {
    pub id: String,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Category slug as delivered by the remote source (`sponsor`, `intro`, ...)
    pub category: String,
}

impl SponsorSegment {
    /// Build a segment, rejecting ranges that end before they start.
    pub fn new(
        id: impl Into<String>,
        start_ms: u64,
        end_ms: u64,
        category: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        if start_ms > end_ms {
            return Err(ModelError::InvalidSegment {
                id,
                start_ms,
                end_ms,
            });
        }
        Ok(Self {
            id,
            start_ms,
            end_ms,
            category: category.into(),
        })
    }

    /// Half-open containment: `start <= position < end`.
    pub fn contains(&self, position_ms: u64) -> bool {
        self.start_ms <= position_ms && position_ms < self.end_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Outcome of a position tick on the segment-skip controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "action", rename_all = "snake_case"))]
pub enum SkipAction {
    #[default]
    None,
    SkipTo {
        target_ms: u64,
        /// Human-readable category label
        reason: String,
    },
}

impl SkipAction {
    pub fn is_skip(&self) -> bool {
        matches!(self, SkipAction::SkipTo { .. })
    }

    pub fn target_ms(&self) -> Option<u64> {
        match self {
            SkipAction::SkipTo { target_ms, .. } => Some(*target_ms),
            SkipAction::None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_ranges() {
        let err = SponsorSegment::new("a", 10, 5, "sponsor").unwrap_err();
        assert!(matches!(err, ModelError::InvalidSegment { .. }));
        assert!(SponsorSegment::new("b", 5, 5, "sponsor").is_ok());
    }

    #[test]
    fn containment_is_half_open() {
        let segment = SponsorSegment::new("a", 1000, 2000, "intro").unwrap();
        assert!(!segment.contains(999));
        assert!(segment.contains(1000));
        assert!(segment.contains(1999));
        assert!(!segment.contains(2000));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn skip_action_serializes_with_tag() {
        let action = SkipAction::SkipTo {
            target_ms: 10_000,
            reason: "Sponsor".into(),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(
            json,
            r#"{"action":"skip_to","target_ms":10000,"reason":"Sponsor"}"#
        );
    }
}
