//! Playback control plane.
//!
//! The engines that sit between a media clock and the features reacting to
//! it: the comment-track [`parser`], the filter/style [`pipeline`], the
//! timeline [`scheduler`], the segment [`skip`] controller, [`quality`]
//! negotiation and the resume-position [`progress`] cache. A
//! [`session::PlaybackSession`] wires them to a host's media engine, render
//! surface, data source and key-value store (see [`ports`]).
#![allow(missing_docs)]

pub mod error;
pub mod events;
pub mod parser;
pub mod pipeline;
pub mod ports;
pub mod progress;
pub mod quality;
pub mod scheduler;
pub mod session;
pub mod skip;
pub mod telemetry;

pub use error::{CoreError, Result};
pub use events::{EventBus, PlaybackEvent};
pub use parser::{ParseReport, parse, parse_with_report};
pub use pipeline::{
    CommentFilter, CommentStyler, FilterPipeline, PipelineOutput, PipelineStats,
    PluginConfigStore, PluginRegistry, PositionWatcher,
};
pub use ports::{
    EnginePositionSource, KeyValueStore, MediaEngine, PositionSource, RemoteDataSource,
    RenderSurface,
};
pub use progress::{InMemoryStore, ProgressCache, ProgressEntry, ProgressThrottle, progress_key};
pub use quality::{Negotiation, QUALITY_TIERS, check_permission, max_available, negotiate};
pub use scheduler::{ArmReport, ConfigDelta, OverlayOptions, SchedulerSnapshot, TimelineScheduler};
pub use session::{LoadHandle, PlaybackSession};
pub use skip::{SegmentSkipController, category_label};

pub use playplane_config as config;
pub use playplane_model as model;
