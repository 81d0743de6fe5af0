//! Core data model definitions shared across Playplane crates.
#![allow(missing_docs)]

pub mod comment;
pub mod error;
pub mod ids;
pub mod playback;
pub mod quality;
pub mod render;
pub mod segment;

// Intentionally curated re-exports for downstream consumers.
pub use comment::{
    Comment, CommentLayer, DEFAULT_STROKE_DARK, DEFAULT_STROKE_LIGHT,
    StyleOverride, StyledComment,
};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{ContentKey, PluginId, SlotId};
pub use playback::{DiscontinuityReason, EnginePlaybackState, SchedulerState};
pub use quality::{
    Capabilities, DeviceFeature, Entitlement, QualityDecision, QualityTier,
};
pub use render::RenderCommand;
pub use segment::{SkipAction, SponsorSegment};
