//! The playback session: one explicitly owned context object per player.
//!
//! A session owns the comment data, the scheduler, the skip controller and
//! the progress hooks for whatever content is loaded. Surfaces come and go
//! through [`PlaybackSession::bind`] / [`PlaybackSession::unbind`] without
//! touching that data, so a host can rebuild its UI (e.g. on rotation) and
//! rebind the same session.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use playplane_config::{FilterConfig, PlayplaneConfig};
use playplane_model::{
    ContentKey, DiscontinuityReason, EnginePlaybackState, PluginId, RenderCommand,
    SchedulerState, SkipAction, SponsorSegment,
};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{CoreError, Result};
use crate::events::{EventBus, PlaybackEvent};
use crate::parser;
use crate::pipeline::{FilterPipeline, PipelineStats, PluginConfigStore, PositionWatcher};
use crate::ports::{KeyValueStore, MediaEngine, PositionSource, RemoteDataSource, RenderSurface};
use crate::progress::{ProgressCache, ProgressThrottle};
use crate::scheduler::{ConfigDelta, OverlayOptions, SchedulerSnapshot, TimelineScheduler};
use crate::skip::SegmentSkipController;

/// Plugin id under which the filter settings are persisted.
pub const FILTERS_PLUGIN_ID: &str = "filters";

#[derive(Debug, Clone)]
struct LoadedContent {
    key: ContentKey,
    duration_ms: i64,
    token: CancellationToken,
}

/// Background work started by [`PlaybackSession::load_content`].
#[derive(Debug)]
pub struct LoadHandle {
    generation: u64,
    comments: JoinHandle<()>,
    segments: JoinHandle<()>,
}

impl LoadHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for both fetches to settle. Fetch failures are not errors here;
    /// they only disable the dependent feature.
    pub async fn finished(self) -> Result<()> {
        for handle in [self.comments, self.segments] {
            if let Err(err) = handle.await {
                if err.is_cancelled() {
                    return Err(CoreError::Cancelled(format!(
                        "content load {} was aborted",
                        self.generation
                    )));
                }
                return Err(CoreError::Internal(format!("content load task failed: {err}")));
            }
        }
        Ok(())
    }
}

struct SessionInner {
    config: PlayplaneConfig,
    runtime: Handle,
    engine: Arc<dyn MediaEngine>,
    source: Arc<dyn RemoteDataSource>,
    progress: ProgressCache,
    plugin_store: PluginConfigStore,
    pipeline: Arc<RwLock<FilterPipeline>>,
    scheduler: Mutex<TimelineScheduler>,
    skip: Mutex<SegmentSkipController>,
    watchers: Mutex<Vec<Box<dyn PositionWatcher>>>,
    surface: Mutex<Option<Arc<dyn RenderSurface>>>,
    poller: Mutex<Option<Arc<dyn PositionSource>>>,
    poll_token: Mutex<Option<CancellationToken>>,
    current: Mutex<Option<LoadedContent>>,
    generation: AtomicU64,
    throttle: Mutex<ProgressThrottle>,
    events: EventBus,
    shutdown: CancellationToken,
}

/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("content", &self.current_content())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PlaybackSession {
    /// Build a session on the current tokio runtime. Engine callbacks may
    /// arrive on any thread afterwards.
    pub fn new(
        config: PlayplaneConfig,
        engine: Arc<dyn MediaEngine>,
        source: Arc<dyn RemoteDataSource>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|err| {
            CoreError::Internal(format!("playback session needs a tokio runtime: {err}"))
        })?;

        let pipeline =
            FilterPipeline::with_hidden_layers(&config.filters, &config.overlay.hidden_layers);
        let scheduler = TimelineScheduler::new(OverlayOptions::from(&config.overlay));
        let skip = SegmentSkipController::new(config.skip.clone());
        let progress = ProgressCache::new(Arc::clone(&store), config.progress.clone());
        let plugin_store = PluginConfigStore::new(store, config.progress.namespace.clone());
        let throttle = ProgressThrottle::new(config.progress.save_interval_ms);

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                runtime,
                engine,
                source,
                progress,
                plugin_store,
                pipeline: Arc::new(RwLock::new(pipeline)),
                scheduler: Mutex::new(scheduler),
                skip: Mutex::new(skip),
                watchers: Mutex::new(Vec::new()),
                surface: Mutex::new(None),
                poller: Mutex::new(None),
                poll_token: Mutex::new(None),
                current: Mutex::new(None),
                generation: AtomicU64::new(0),
                throttle: Mutex::new(throttle),
                events: EventBus::default(),
                shutdown: CancellationToken::new(),
            }),
        })
    }

    pub fn config(&self) -> &PlayplaneConfig {
        &self.inner.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.scheduler.lock().state()
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.inner.scheduler.lock().snapshot()
    }

    pub fn current_content(&self) -> Option<ContentKey> {
        self.inner.current.lock().as_ref().map(|current| current.key)
    }

    /// Switch to new content. Everything tied to the previous content is
    /// cancelled and cleared before the fetches for `content` start.
    pub fn load_content(&self, content: ContentKey, duration_ms: i64) -> LoadHandle {
        self.inner.load_content(content, duration_ms)
    }

    /// Attach a rendering surface. Armed data starts rendering right away.
    pub fn bind(&self, surface: Arc<dyn RenderSurface>) {
        *self.inner.surface.lock() = Some(surface);
        let position_ms = self.inner.engine.current_position_ms();
        self.inner.drive(|scheduler| scheduler.attach_surface(position_ms));
    }

    /// Detach the surface. Comment data stays armed for the next `bind`.
    pub fn unbind(&self) {
        self.inner.drive(|scheduler| {
            scheduler.detach_surface();
            Vec::new()
        });
        *self.inner.surface.lock() = None;
    }

    /// Push-style position update.
    pub fn on_tick(&self, position_ms: u64) {
        self.inner.on_tick(position_ms);
    }

    pub fn on_position_discontinuity(&self, reason: DiscontinuityReason) {
        match reason {
            DiscontinuityReason::Seek => {
                let target = self.inner.engine.current_position_ms();
                debug!(position_ms = target, "seek reported");
                // Applied on the next tick so rapid seeks collapse into one rebuild.
                self.inner.drive(|scheduler| {
                    scheduler.request_resync(target);
                    Vec::new()
                });
            }
            DiscontinuityReason::Other => trace!("non-seek discontinuity ignored"),
        }
    }

    pub fn on_playback_state_changed(&self, state: EnginePlaybackState) {
        match state {
            EnginePlaybackState::Ended => self.inner.content_ended(),
            EnginePlaybackState::Ready => {
                self.inner.adopt_engine_duration();
                if self.inner.engine.is_playing() {
                    self.inner.drive(TimelineScheduler::resume);
                }
            }
            other => trace!(state = ?other, "playback state change ignored"),
        }
    }

    pub fn on_is_playing_changed(&self, playing: bool) {
        if playing {
            self.inner.drive(TimelineScheduler::resume);
            return;
        }

        self.inner.drive(|scheduler| {
            scheduler.pause();
            Vec::new()
        });
        let position_ms = self.inner.engine.current_position_ms();
        self.inner.spawn_progress_save(position_ms);
    }

    /// Poll `source` on the configured tick interval. The poller is tied to
    /// the loaded content and restarted on every content load.
    pub fn start_polling(&self, source: Arc<dyn PositionSource>) {
        *self.inner.poller.lock() = Some(source);
        self.inner.spawn_poller();
    }

    pub fn stop_polling(&self) {
        *self.inner.poller.lock() = None;
        if let Some(token) = self.inner.poll_token.lock().take() {
            token.cancel();
        }
    }

    /// Where to start playback of the loaded content, if anywhere but zero.
    pub async fn resume_position(&self) -> Option<u64> {
        let current = self.inner.current.lock().clone()?;
        let duration_ms = u64::try_from(current.duration_ms).unwrap_or(0);
        let key = current.key;

        match self
            .inner
            .progress
            .resume_position(key.content_id, key.sub_content_id, duration_ms)
            .await
        {
            Ok(position) => position,
            Err(err) => {
                warn!(content = %key, error = %err, "resume position unavailable");
                None
            }
        }
    }

    /// Save `position_ms` for the loaded content now, regardless of the
    /// periodic throttle. Used on pause and detach.
    pub async fn flush_progress(&self, position_ms: u64) -> Result<()> {
        let Some(content) = self.current_content() else {
            return Ok(());
        };
        self.inner.throttle.lock().mark_saved(position_ms);
        self.inner.persist_progress(content, position_ms).await
    }

    pub fn configure_overlay(&self, options: OverlayOptions) -> ConfigDelta {
        self.inner.scheduler.lock().configure(options)
    }

    /// Register an additional watcher. Watchers see every tick after the
    /// segment-skip controller; the first skip wins.
    pub fn add_watcher(&self, watcher: Box<dyn PositionWatcher>) {
        self.inner.watchers.lock().push(watcher);
    }

    pub fn set_auto_skip(&self, enabled: bool) {
        self.inner.skip.lock().set_auto_skip(enabled);
    }

    /// Segment to offer a manual skip for at the current position.
    pub fn pending_skip_prompt(&self) -> Option<SponsorSegment> {
        let position_ms = self.inner.engine.current_position_ms();
        self.inner.skip.lock().pending_prompt(position_ms).cloned()
    }

    pub fn dismiss_segment(&self, segment_id: &str) -> bool {
        self.inner.skip.lock().dismiss(segment_id)
    }

    /// Skip a segment on the viewer's request. Returns whether a seek was
    /// issued.
    pub fn skip_segment(&self, segment_id: &str) -> bool {
        let action = self.inner.skip.lock().skip_manually(segment_id);
        match action {
            SkipAction::SkipTo { target_ms, reason } => {
                self.inner.perform_skip(segment_id.to_string(), target_ms, reason);
                true
            }
            SkipAction::None => false,
        }
    }

    /// Toggle a filter or styler. Applies from the next content load.
    pub fn set_plugin_enabled(&self, id: &PluginId, enabled: bool) -> bool {
        self.inner.pipeline.write().set_plugin_enabled(id, enabled)
    }

    pub fn set_pipeline_enabled(&self, enabled: bool) {
        self.inner.pipeline.write().set_enabled(enabled);
    }

    pub fn pipeline_stats(&self) -> PipelineStats {
        self.inner.pipeline.read().stats()
    }

    /// Persist new filter settings and rebuild the pipeline from them.
    /// Applies from the next content load.
    pub async fn update_filters(&self, filters: FilterConfig) -> Result<()> {
        self.inner
            .plugin_store
            .save(&PluginId::new(FILTERS_PLUGIN_ID), &filters)
            .await?;
        self.inner.install_filters(&filters);
        Ok(())
    }

    /// Rebuild the pipeline from persisted filter settings, if any.
    pub async fn restore_filters(&self) -> Result<bool> {
        let stored: Option<FilterConfig> = self
            .inner
            .plugin_store
            .load(&PluginId::new(FILTERS_PLUGIN_ID))
            .await?;
        match stored {
            Some(filters) => {
                self.inner.install_filters(&filters);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Cancel every background task owned by this session.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        info!("playback session shut down");
    }
}

impl SessionInner {
    /// Run `f` against the scheduler, forward its commands to the surface
    /// and publish any state change.
    fn drive<F>(&self, f: F)
    where
        F: FnOnce(&mut TimelineScheduler) -> Vec<RenderCommand>,
    {
        let (from, to) = {
            let mut scheduler = self.scheduler.lock();
            let from = scheduler.state();
            let commands = f(&mut scheduler);
            let to = scheduler.state();
            self.dispatch(commands);
            (from, to)
        };

        if from != to {
            debug!(?from, ?to, "scheduler state changed");
            self.events
                .publish(PlaybackEvent::SchedulerStateChanged { from, to });
        }
    }

    fn dispatch(&self, commands: Vec<RenderCommand>) {
        if commands.is_empty() {
            return;
        }
        let surface = self.surface.lock().clone();
        match surface {
            Some(surface) => surface.render(commands),
            None => trace!(dropped = commands.len(), "no surface bound"),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn load_content(self: &Arc<Self>, content: ContentKey, duration_ms: i64) -> LoadHandle {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.shutdown.child_token();
        let previous = self.current.lock().replace(LoadedContent {
            key: content,
            duration_ms,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            debug!(content = %previous.key, "cancelling previous content load");
            previous.token.cancel();
        }

        self.drive(TimelineScheduler::reset);
        self.skip.lock().clear();
        self.watchers
            .lock()
            .iter_mut()
            .for_each(|watcher| watcher.reset());
        self.throttle.lock().reset();

        info!(content = %content, duration_ms, generation, "loading content");
        self.events
            .publish(PlaybackEvent::ContentLoaded { content });
        self.spawn_poller();

        let comments = self.runtime.spawn(Arc::clone(self).load_comments(
            content,
            duration_ms,
            generation,
            token.clone(),
        ));
        let segments = self
            .runtime
            .spawn(Arc::clone(self).load_segments(content, generation, token));

        LoadHandle {
            generation,
            comments,
            segments,
        }
    }

    #[instrument(skip(self, token), fields(content = %content))]
    async fn load_comments(
        self: Arc<Self>,
        content: ContentKey,
        duration_ms: i64,
        generation: u64,
        token: CancellationToken,
    ) {
        let fetched = tokio::select! {
            _ = token.cancelled() => {
                debug!("comment fetch cancelled");
                return;
            }
            result = self.source.fetch_comments(content) => result,
        };
        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(err) => {
                let err = CoreError::source(err);
                warn!(error = %err, "comment fetch failed, overlay disabled for this content");
                return;
            }
        };

        let pipeline = Arc::clone(&self.pipeline);
        let processed = tokio::task::spawn_blocking(move || {
            let report = parser::parse_with_report(&bytes);
            let output = pipeline.read().process(report.comments);
            (report.skipped, output)
        })
        .await;
        let (skipped, output) = match processed {
            Ok(processed) => processed,
            Err(err) => {
                warn!(error = %err, "comment parsing task failed");
                return;
            }
        };

        if token.is_cancelled() {
            debug!("content changed while parsing, result discarded");
            return;
        }

        let filtered = output.dropped;
        let mut armed = None;
        self.drive(|scheduler| {
            if !self.is_current(generation) {
                return Vec::new();
            }
            // The engine may have reported a duration while we were fetching.
            let duration_ms = self
                .current
                .lock()
                .as_ref()
                .map_or(duration_ms, |current| current.duration_ms);
            let report = scheduler.arm(output.kept, duration_ms);
            armed = Some(report);
            if scheduler.state().is_running() {
                scheduler.request_resync(self.engine.current_position_ms());
                scheduler.resync_now()
            } else {
                Vec::new()
            }
        });

        let Some(report) = armed else {
            debug!("stale comment load discarded");
            return;
        };
        debug!(
            armed = report.armed,
            merged = report.merged,
            filtered,
            malformed = skipped,
            "comments armed"
        );
        self.events.publish(PlaybackEvent::CommentsArmed {
            content,
            count: report.armed,
            dropped: filtered + report.dropped,
        });
    }

    #[instrument(skip(self, token), fields(content = %content))]
    async fn load_segments(
        self: Arc<Self>,
        content: ContentKey,
        generation: u64,
        token: CancellationToken,
    ) {
        let fetched = tokio::select! {
            _ = token.cancelled() => {
                debug!("segment fetch cancelled");
                return;
            }
            result = self.source.fetch_segments(content) => result,
        };
        let segments = fetched.unwrap_or_else(|err| {
            let err = CoreError::source(err);
            warn!(error = %err, "segment fetch failed, skipping disabled for this content");
            Vec::new()
        });

        let count = {
            let mut skip = self.skip.lock();
            if !self.is_current(generation) || token.is_cancelled() {
                debug!("stale segment load discarded");
                return;
            }
            skip.load_segments(content, segments)
        };

        self.events
            .publish(PlaybackEvent::SegmentsLoaded { content, count });
    }

    /// The engine is prepared. Arms comments that were held back because the
    /// content was loaded with an unknown duration.
    fn adopt_engine_duration(&self) {
        let duration_ms = self.engine.duration_ms();
        if duration_ms <= 0 {
            return;
        }
        let content = {
            let mut current = self.current.lock();
            let Some(current) = current.as_mut() else {
                return;
            };
            if current.duration_ms > 0 {
                return;
            }
            current.duration_ms = duration_ms;
            current.key
        };

        let mut armed = None;
        self.drive(|scheduler| {
            let Some(report) = scheduler.update_duration(duration_ms) else {
                return Vec::new();
            };
            armed = Some(report);
            if scheduler.state().is_running() {
                scheduler.request_resync(self.engine.current_position_ms());
                scheduler.resync_now()
            } else {
                Vec::new()
            }
        });

        if let Some(report) = armed {
            debug!(duration_ms, armed = report.armed, "deferred comments armed");
            self.events.publish(PlaybackEvent::CommentsArmed {
                content,
                count: report.armed,
                dropped: report.dropped,
            });
        }
    }

    fn on_tick(self: &Arc<Self>, position_ms: u64) {
        self.drive(|scheduler| scheduler.tick(position_ms));
        self.run_watchers(position_ms);

        let due = {
            let mut throttle = self.throttle.lock();
            let due = self.current.lock().is_some() && throttle.is_due(position_ms);
            if due {
                throttle.mark_saved(position_ms);
            }
            due
        };
        if due {
            self.spawn_progress_save(position_ms);
        }
    }

    fn run_watchers(&self, position_ms: u64) {
        let skipped = {
            let mut skip = self.skip.lock();
            let segment_id = skip.pending_prompt(position_ms).map(|segment| segment.id.clone());
            let watcher: &mut dyn PositionWatcher = &mut *skip;
            match (watcher.on_position_tick(position_ms), segment_id) {
                (SkipAction::SkipTo { target_ms, reason }, Some(id)) => {
                    Some((id, target_ms, reason))
                }
                _ => None,
            }
        };

        let skipped = skipped.or_else(|| {
            self.watchers.lock().iter_mut().find_map(|watcher| {
                match watcher.on_position_tick(position_ms) {
                    SkipAction::SkipTo { target_ms, reason } => {
                        Some((watcher.id().to_string(), target_ms, reason))
                    }
                    SkipAction::None => None,
                }
            })
        });

        if let Some((segment_id, target_ms, reason)) = skipped {
            self.perform_skip(segment_id, target_ms, reason);
        }
    }

    fn perform_skip(&self, segment_id: String, target_ms: u64, reason: String) {
        info!(segment_id = %segment_id, target_ms, reason = %reason, "skipping segment");
        self.engine.seek_to(target_ms);
        self.drive(|scheduler| {
            scheduler.request_resync(target_ms);
            scheduler.resync_now()
        });
        self.events.publish(PlaybackEvent::SegmentSkipped {
            segment_id,
            target_ms,
            reason,
        });
    }

    fn content_ended(self: &Arc<Self>) {
        debug!("content ended");
        self.drive(TimelineScheduler::ended);
        self.skip.lock().on_content_end();
        self.watchers
            .lock()
            .iter_mut()
            .for_each(|watcher| watcher.reset());
        self.throttle.lock().reset();

        let Some(current) = self.current.lock().clone() else {
            return;
        };
        let progress = self.progress.clone();
        self.runtime.spawn(async move {
            let key = current.key;
            if let Err(err) = progress
                .clear_position(key.content_id, key.sub_content_id)
                .await
            {
                warn!(content = %key, error = %err, "failed to clear finished position");
            }
        });
    }

    fn spawn_progress_save(self: &Arc<Self>, position_ms: u64) {
        let Some(current) = self.current.lock().clone() else {
            return;
        };
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            if let Err(err) = inner.persist_progress(current.key, position_ms).await {
                warn!(content = %current.key, error = %err, "failed to save resume position");
            }
        });
    }

    async fn persist_progress(&self, content: ContentKey, position_ms: u64) -> Result<()> {
        self.progress
            .save_position(content.content_id, content.sub_content_id, position_ms)
            .await?;
        self.events.publish(PlaybackEvent::ProgressSaved {
            content,
            position_ms,
        });
        Ok(())
    }

    fn spawn_poller(self: &Arc<Self>) {
        if let Some(previous) = self.poll_token.lock().take() {
            previous.cancel();
        }
        let Some(source) = self.poller.lock().clone() else {
            return;
        };
        let Some(content_token) = self
            .current
            .lock()
            .as_ref()
            .map(|current| current.token.clone())
        else {
            return;
        };

        let token = content_token.child_token();
        *self.poll_token.lock() = Some(token.clone());

        let interval = Duration::from_millis(self.config.overlay.tick_interval_ms.max(1));
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(position_ms) = source.poll_position_ms() {
                            inner.on_tick(position_ms);
                        }
                    }
                }
            }
            trace!("position poller stopped");
        });
    }

    fn install_filters(&self, filters: &FilterConfig) {
        let pipeline =
            FilterPipeline::with_hidden_layers(filters, &self.config.overlay.hidden_layers);
        *self.pipeline.write() = pipeline;
        debug!("filter pipeline rebuilt");
    }
}
