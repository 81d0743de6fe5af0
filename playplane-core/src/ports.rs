//! Traits for the collaborators the control plane drives or consumes.
//!
//! The core never owns playback, rendering, transport or persistence; hosts
//! plug their implementations in through these seams.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use playplane_model::{ContentKey, RenderCommand, SponsorSegment};

/// Player handle. Positions are milliseconds from content start.
#[cfg_attr(test, automock)]
pub trait MediaEngine: Send + Sync {
    fn current_position_ms(&self) -> u64;

    /// Content duration; zero or negative when unknown.
    fn duration_ms(&self) -> i64;

    fn is_playing(&self) -> bool;

    fn seek_to(&self, position_ms: u64);
}

/// Receiver of overlay deltas.
///
/// Called while the scheduler lock is held so batches arrive in order; an
/// implementation must not call back into the session.
pub trait RenderSurface: Send + Sync {
    fn render(&self, commands: Vec<RenderCommand>);
}

/// Remote repository for per-content comment tracks and skip segments.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    async fn fetch_comments(&self, content: ContentKey) -> anyhow::Result<Vec<u8>>;

    async fn fetch_segments(
        &self,
        content: ContentKey,
    ) -> anyhow::Result<Vec<SponsorSegment>>;
}

/// String blob store shared by plugin configuration and resume positions.
/// Last write wins; no transactions are assumed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()>;

    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Pull-style position feed. Push-style engines call
/// `PlaybackSession::on_tick` directly instead.
pub trait PositionSource: Send + Sync {
    /// Current position, or `None` when the engine has nothing to report.
    fn poll_position_ms(&self) -> Option<u64>;
}

/// Poll the media engine itself.
pub struct EnginePositionSource<E: ?Sized> {
    engine: std::sync::Arc<E>,
}

impl<E: ?Sized> std::fmt::Debug for EnginePositionSource<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePositionSource").finish_non_exhaustive()
    }
}

impl<E: MediaEngine + ?Sized> EnginePositionSource<E> {
    pub fn new(engine: std::sync::Arc<E>) -> Self {
        Self { engine }
    }
}

impl<E: MediaEngine + ?Sized> PositionSource for EnginePositionSource<E> {
    fn poll_position_ms(&self) -> Option<u64> {
        Some(self.engine.current_position_ms())
    }
}
