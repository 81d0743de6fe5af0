#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use playplane_core::config::PlayplaneConfig;
use playplane_core::model::{ContentKey, RenderCommand, SponsorSegment};
use playplane_core::ports::{
    KeyValueStore, MediaEngine, PositionSource, RemoteDataSource, RenderSurface,
};
use playplane_core::{PlaybackEvent, PlaybackSession};
use tokio::sync::broadcast;

/// Engine whose clock the test moves by hand.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    position_ms: AtomicU64,
    playing: AtomicBool,
    duration_ms: AtomicU64,
    seeks: Mutex<Vec<u64>>,
}

impl ScriptedEngine {
    pub fn playing(duration_ms: u64) -> Arc<Self> {
        let engine = Self::default();
        engine.playing.store(true, Ordering::SeqCst);
        engine.duration_ms.store(duration_ms, Ordering::SeqCst);
        Arc::new(engine)
    }

    pub fn set_position(&self, position_ms: u64) {
        self.position_ms.store(position_ms, Ordering::SeqCst);
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    pub fn seeks(&self) -> Vec<u64> {
        self.seeks.lock().clone()
    }

    pub fn set_duration(&self, duration_ms: u64) {
        self.duration_ms.store(duration_ms, Ordering::SeqCst);
    }
}

impl MediaEngine for ScriptedEngine {
    fn current_position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::SeqCst)
    }

    fn duration_ms(&self) -> i64 {
        self.duration_ms.load(Ordering::SeqCst) as i64
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn seek_to(&self, position_ms: u64) {
        self.seeks.lock().push(position_ms);
        self.set_position(position_ms);
    }
}

/// Position feed that counts how often it is polled.
#[derive(Debug)]
pub struct CountingPositionSource {
    engine: Arc<ScriptedEngine>,
    polls: AtomicU64,
}

impl CountingPositionSource {
    pub fn new(engine: Arc<ScriptedEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            polls: AtomicU64::new(0),
        })
    }

    /// Polls since the last call.
    pub fn take_polls(&self) -> u64 {
        self.polls.swap(0, Ordering::SeqCst)
    }
}

impl PositionSource for CountingPositionSource {
    fn poll_position_ms(&self) -> Option<u64> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Some(self.engine.current_position_ms())
    }
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Mutex<Vec<RenderCommand>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn commands(&self) -> Vec<RenderCommand> {
        self.commands.lock().clone()
    }

    /// `(lane, text)` of every activation so far.
    pub fn activations(&self) -> Vec<(u8, String)> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                RenderCommand::Activate { lane, text, .. } => Some((*lane, text.clone())),
                RenderCommand::Deactivate { .. } => None,
            })
            .collect()
    }
}

impl RenderSurface for RecordingSurface {
    fn render(&self, commands: Vec<RenderCommand>) {
        self.commands.lock().extend(commands);
    }
}

/// Canned remote data. Content listed in `hang_on` never answers.
#[derive(Debug, Clone, Default)]
pub struct StubSource {
    comments: Option<Vec<u8>>,
    segments: Option<Vec<SponsorSegment>>,
    hang_on: Option<u64>,
    /// Per-content comment tracks, checked before `comments`.
    tracks: Vec<(u64, Vec<u8>)>,
}

impl StubSource {
    pub fn new(comments: Vec<u8>, segments: Vec<SponsorSegment>) -> Arc<Self> {
        Arc::new(Self {
            comments: Some(comments),
            segments: Some(segments),
            hang_on: None,
            tracks: Vec::new(),
        })
    }

    pub fn per_content(tracks: Vec<(u64, Vec<u8>)>) -> Arc<Self> {
        Arc::new(Self {
            segments: Some(Vec::new()),
            tracks,
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hanging_on(content_id: u64, comments: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            comments: Some(comments),
            segments: Some(Vec::new()),
            hang_on: Some(content_id),
            tracks: Vec::new(),
        })
    }

    async fn maybe_hang(&self, content: ContentKey) {
        if self.hang_on == Some(content.content_id) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl RemoteDataSource for StubSource {
    async fn fetch_comments(&self, content: ContentKey) -> anyhow::Result<Vec<u8>> {
        self.maybe_hang(content).await;
        if let Some((_, track)) = self.tracks.iter().find(|(id, _)| *id == content.content_id) {
            return Ok(track.clone());
        }
        self.comments
            .clone()
            .ok_or_else(|| anyhow::anyhow!("comment endpoint unavailable"))
    }

    async fn fetch_segments(&self, content: ContentKey) -> anyhow::Result<Vec<SponsorSegment>> {
        self.maybe_hang(content).await;
        self.segments
            .clone()
            .ok_or_else(|| anyhow::anyhow!("segment endpoint unavailable"))
    }
}

/// Comment track in the `<d p="...">` wire format, one scrolling comment per
/// `(seconds, text)` pair.
pub fn track(records: &[(f64, &str)]) -> Vec<u8> {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><i>"#);
    for (index, (seconds, text)) in records.iter().enumerate() {
        xml.push_str(&format!(
            r#"<d p="{seconds},1,25,16777215,1700000000,0,user{index},{index}">{text}</d>"#
        ));
    }
    xml.push_str("</i>");
    xml.into_bytes()
}

pub fn session(
    config: PlayplaneConfig,
    engine: Arc<ScriptedEngine>,
    source: Arc<StubSource>,
    store: Arc<dyn KeyValueStore>,
) -> PlaybackSession {
    PlaybackSession::new(config, engine, source, store).expect("session on test runtime")
}

pub fn drain(receiver: &mut broadcast::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

/// Let spawned tasks run until `done` holds, or give up.
pub async fn settle(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if done() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    done()
}
