//! Timeline scheduler for timed comments.
//!
//! The scheduler maps the media position onto the set of visible comments
//! and emits only the deltas ([`RenderCommand::Activate`] /
//! [`RenderCommand::Deactivate`]). It never talks to a surface itself; the
//! owning session forwards the returned commands.
//!
//! Lifecycle: `Idle -> Armed -> Running <-> Paused`, with `arm`/`reset` as
//! the forced return path on content change.

use std::collections::HashMap;

use playplane_config::{LaneLimit, OverlayConfig};
use playplane_model::{CommentLayer, RenderCommand, SchedulerState, SlotId, StyledComment};
use tracing::{debug, trace};

/// Scheduler-facing subset of the overlay configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayOptions {
    pub lane_limit: LaneLimit,
    pub scroll_duration_ms: u64,
    pub fixed_duration_ms: u64,
    pub merge_duplicates: bool,
    pub merge_window_ms: u64,
    pub discontinuity_threshold_ms: u64,
    pub max_comments_per_load: Option<usize>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self::from(&OverlayConfig::default())
    }
}

impl From<&OverlayConfig> for OverlayOptions {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            lane_limit: config.lane_limit(),
            scroll_duration_ms: config.scroll_duration_ms,
            fixed_duration_ms: config.fixed_duration_ms,
            merge_duplicates: config.merge_duplicates && config.merge_window_ms > 0,
            merge_window_ms: config.merge_window_ms,
            discontinuity_threshold_ms: config.discontinuity_threshold_ms,
            max_comments_per_load: config.max_comments_per_load,
        }
    }
}

impl OverlayOptions {
    fn visible_duration_ms(&self, layer: CommentLayer) -> u64 {
        if layer.is_fixed() {
            self.fixed_duration_ms
        } else {
            self.scroll_duration_ms
        }
    }

    /// Longest visibility across all layers; bounds how far back a resync has
    /// to look.
    fn max_visible_duration_ms(&self) -> u64 {
        self.scroll_duration_ms.max(self.fixed_duration_ms)
    }
}

/// What a staged [`OverlayOptions`] change touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigDelta {
    pub lanes_changed: bool,
    pub durations_changed: bool,
    pub merge_changed: bool,
    pub threshold_changed: bool,
    pub limit_changed: bool,
}

impl ConfigDelta {
    fn between(current: &OverlayOptions, next: &OverlayOptions) -> Self {
        Self {
            lanes_changed: current.lane_limit != next.lane_limit,
            durations_changed: current.scroll_duration_ms != next.scroll_duration_ms
                || current.fixed_duration_ms != next.fixed_duration_ms,
            merge_changed: current.merge_duplicates != next.merge_duplicates
                || current.merge_window_ms != next.merge_window_ms,
            threshold_changed: current.discontinuity_threshold_ms
                != next.discontinuity_threshold_ms,
            limit_changed: current.max_comments_per_load != next.max_comments_per_load,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether visible slots have to be rebuilt once the change lands.
    pub fn requires_resync(&self) -> bool {
        self.lanes_changed || self.durations_changed || self.requires_rebuild()
    }

    fn requires_rebuild(&self) -> bool {
        self.merge_changed || self.limit_changed
    }
}

/// Outcome of [`TimelineScheduler::arm`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArmReport {
    /// Timeline entries after merging.
    pub armed: usize,
    /// Comments discarded at arm time (past the end, over the load cap).
    pub dropped: usize,
    pub merged: usize,
}

/// One visible slot, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot {
    pub slot_id: SlotId,
    pub lane: u8,
    pub layer: CommentLayer,
    pub text: String,
    pub show_at_ms: u64,
    pub expires_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSnapshot {
    pub state: SchedulerState,
    pub position_ms: Option<u64>,
    pub entries: usize,
    pub pending_resync: Option<u64>,
    pub active: Vec<SlotSnapshot>,
}

#[derive(Debug, Clone)]
struct TimelineEntry {
    comment: StyledComment,
    occurrences: u32,
}

impl TimelineEntry {
    fn show_at_ms(&self) -> u64 {
        self.comment.comment.show_at_ms
    }

    fn display_text(&self) -> String {
        if self.occurrences > 1 {
            format!("{} \u{00D7}{}", self.comment.comment.text, self.occurrences)
        } else {
            self.comment.comment.text.clone()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveSlot {
    slot_id: SlotId,
    entry: usize,
    lane: u8,
    layer: CommentLayer,
    expires_at_ms: u64,
}

#[derive(Debug, Default)]
pub struct TimelineScheduler {
    options: OverlayOptions,
    staged: Option<OverlayOptions>,
    state: SchedulerState,
    surface_attached: bool,
    duration_ms: u64,
    /// Filtered, time-ordered comments before merging.
    source: Vec<StyledComment>,
    entries: Vec<TimelineEntry>,
    /// Index of the first entry not yet considered for activation.
    cursor: usize,
    active: Vec<ActiveSlot>,
    position_ms: Option<u64>,
    /// Target of the last resync while nothing has advanced since.
    settled_at: Option<u64>,
    pending_resync: Option<u64>,
    /// Comments bound before the duration was known.
    deferred: Vec<StyledComment>,
    next_slot: u64,
}

impl TimelineScheduler {
    pub fn new(options: OverlayOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    pub fn position_ms(&self) -> Option<u64> {
        self.position_ms
    }

    /// Duration of the armed content; zero while idle.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn is_surface_attached(&self) -> bool {
        self.surface_attached
    }

    /// Stage new options. They take effect on the next tick boundary (or
    /// the next arm/resync), never in the middle of one.
    pub fn configure(&mut self, options: OverlayOptions) -> ConfigDelta {
        let delta = ConfigDelta::between(&self.options, &options);
        if delta.is_empty() {
            self.staged = None;
        } else {
            self.staged = Some(options);
        }
        delta
    }

    /// Bind a new comment list, replacing any previous one. Callers clear the
    /// surface through [`Self::reset`] first; slots still active here are
    /// forgotten without deactivation.
    ///
    /// A non-positive duration leaves the scheduler `Idle` and holds the
    /// comments until [`Self::update_duration`] reports a real one. Comments
    /// that start after the end are never scheduled.
    pub fn arm(&mut self, comments: Vec<StyledComment>, duration_ms: i64) -> ArmReport {
        let _ = self.reset();
        let _ = self.apply_staged();

        let total = comments.len();
        if duration_ms <= 0 {
            debug!(duration_ms, total, "non-positive duration, arm deferred");
            self.deferred = comments;
            return ArmReport {
                dropped: total,
                ..ArmReport::default()
            };
        }
        let duration_ms = duration_ms as u64;

        let mut source: Vec<StyledComment> = comments
            .into_iter()
            .filter(|styled| styled.comment.show_at_ms <= duration_ms)
            .collect();
        source.sort_by_key(|styled| styled.comment.show_at_ms);
        if let Some(cap) = self.options.max_comments_per_load {
            source.truncate(cap);
        }
        let dropped = total - source.len();

        self.duration_ms = duration_ms;
        self.source = source;
        self.rebuild_entries();
        self.state = SchedulerState::Armed;
        if self.surface_attached {
            self.state = SchedulerState::Running;
        }

        let report = ArmReport {
            armed: self.entries.len(),
            dropped,
            merged: self.source.len() - self.entries.len(),
        };
        debug!(
            armed = report.armed,
            dropped = report.dropped,
            merged = report.merged,
            state = ?self.state,
            "comment timeline armed"
        );
        report
    }

    /// Drop all content and go back to `Idle`, deactivating whatever is
    /// still on screen.
    pub fn reset(&mut self) -> Vec<RenderCommand> {
        let commands = self.deactivate_all();
        self.state = SchedulerState::Idle;
        self.duration_ms = 0;
        self.source.clear();
        self.entries.clear();
        self.cursor = 0;
        self.active.clear();
        self.position_ms = None;
        self.settled_at = None;
        self.pending_resync = None;
        self.deferred.clear();
        commands
    }

    /// The media duration became known. Arms comments held back by an
    /// earlier arm with a non-positive duration.
    pub fn update_duration(&mut self, duration_ms: i64) -> Option<ArmReport> {
        if self.state != SchedulerState::Idle || self.deferred.is_empty() || duration_ms <= 0 {
            return None;
        }
        let comments = std::mem::take(&mut self.deferred);
        Some(self.arm(comments, duration_ms))
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// The surface is ready. Starts rendering if data is armed.
    pub fn attach_surface(&mut self, position_ms: u64) -> Vec<RenderCommand> {
        self.surface_attached = true;
        if self.state != SchedulerState::Armed {
            return Vec::new();
        }
        let _ = self.apply_staged();
        self.state = SchedulerState::Running;
        let target = self.pending_resync.take().unwrap_or(position_ms);
        self.resync(target)
    }

    /// The surface went away. Data is kept; slot bookkeeping is dropped since
    /// there is nobody left to deactivate on.
    pub fn detach_surface(&mut self) {
        self.surface_attached = false;
        self.active.clear();
        self.settled_at = None;
        if matches!(self.state, SchedulerState::Running | SchedulerState::Paused) {
            self.state = SchedulerState::Armed;
        }
    }

    /// Freeze rendering. Returns whether the state changed; pausing twice is
    /// a no-op.
    pub fn pause(&mut self) -> bool {
        if self.state == SchedulerState::Running {
            self.state = SchedulerState::Paused;
            true
        } else {
            false
        }
    }

    /// Continue after a pause, or restart an armed timeline on an attached
    /// surface (e.g. replay after the end).
    pub fn resume(&mut self) -> Vec<RenderCommand> {
        match self.state {
            SchedulerState::Paused => {
                self.state = SchedulerState::Running;
                match self.pending_resync.take() {
                    Some(target) => self.resync(target),
                    None => Vec::new(),
                }
            }
            SchedulerState::Armed if self.surface_attached => {
                self.state = SchedulerState::Running;
                match self.pending_resync.take().or(self.position_ms) {
                    Some(target) => self.resync(target),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    /// Content reached its end: clear the screen but keep the data armed.
    pub fn ended(&mut self) -> Vec<RenderCommand> {
        if !self.state.has_data() {
            return Vec::new();
        }
        let commands = self.deactivate_all();
        self.state = SchedulerState::Armed;
        self.cursor = 0;
        self.position_ms = None;
        self.settled_at = None;
        self.pending_resync = None;
        commands
    }

    /// Record a seek target. Only the latest target is kept; it is applied on
    /// the next tick or by [`Self::resync_now`].
    pub fn request_resync(&mut self, target_ms: u64) {
        match self.state {
            SchedulerState::Idle => {}
            SchedulerState::Armed => {
                self.position_ms = Some(target_ms);
                self.pending_resync = Some(target_ms);
            }
            SchedulerState::Running | SchedulerState::Paused => {
                trace!(target_ms, "resync requested");
                self.pending_resync = Some(target_ms);
            }
        }
    }

    /// Apply the pending resync immediately when running.
    pub fn resync_now(&mut self) -> Vec<RenderCommand> {
        if self.state != SchedulerState::Running {
            return Vec::new();
        }
        self.apply_staged_with_resync()
            .or_else(|| self.pending_resync.take().map(|target| self.resync(target)))
            .unwrap_or_default()
    }

    /// Advance to `position_ms`.
    pub fn tick(&mut self, position_ms: u64) -> Vec<RenderCommand> {
        match self.state {
            SchedulerState::Idle => return Vec::new(),
            SchedulerState::Armed => {
                let _ = self.apply_staged();
                // A tick is newer than any seek recorded while unattached.
                self.pending_resync = None;
                self.position_ms = Some(position_ms);
                return Vec::new();
            }
            SchedulerState::Paused => return Vec::new(),
            SchedulerState::Running => {}
        }

        if let Some(mut commands) = self.apply_staged_with_resync() {
            commands.extend(self.follow_resync(position_ms));
            return commands;
        }

        if let Some(target) = self.pending_resync.take() {
            let mut commands = self.resync(target);
            commands.extend(self.follow_resync(position_ms));
            return commands;
        }

        match self.position_ms {
            None => self.resync(position_ms),
            Some(last) if self.is_implicit_seek(last, position_ms) => {
                debug!(from = last, to = position_ms, "position jump treated as seek");
                self.resync(position_ms)
            }
            Some(_) => self.advance(position_ms),
        }
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            state: self.state,
            position_ms: self.position_ms,
            entries: self.entries.len(),
            pending_resync: self.pending_resync,
            active: self
                .active
                .iter()
                .map(|slot| {
                    let entry = &self.entries[slot.entry];
                    SlotSnapshot {
                        slot_id: slot.slot_id,
                        lane: slot.lane,
                        layer: slot.layer,
                        text: entry.display_text(),
                        show_at_ms: entry.show_at_ms(),
                        expires_at_ms: slot.expires_at_ms,
                    }
                })
                .collect(),
        }
    }

    fn is_implicit_seek(&self, last: u64, position_ms: u64) -> bool {
        position_ms < last || position_ms - last > self.options.discontinuity_threshold_ms
    }

    /// Advance after a resync, unless the tick predates the resync target.
    fn follow_resync(&mut self, position_ms: u64) -> Vec<RenderCommand> {
        let Some(target) = self.position_ms else {
            return self.resync(position_ms);
        };
        if position_ms >= target
            && position_ms - target <= self.options.discontinuity_threshold_ms
        {
            self.advance(position_ms)
        } else {
            Vec::new()
        }
    }

    fn apply_staged(&mut self) -> (ConfigDelta, Vec<RenderCommand>) {
        let Some(next) = self.staged.take() else {
            return (ConfigDelta::default(), Vec::new());
        };
        let delta = ConfigDelta::between(&self.options, &next);
        self.options = next;

        let mut commands = Vec::new();
        if delta.requires_rebuild() && !self.source.is_empty() {
            commands = self.deactivate_all();
            self.rebuild_entries();
        }
        debug!(?delta, "overlay options applied");
        (delta, commands)
    }

    /// Apply staged options and, when they invalidate visible slots, resync
    /// at the best known target.
    fn apply_staged_with_resync(&mut self) -> Option<Vec<RenderCommand>> {
        let (delta, mut commands) = self.apply_staged();
        if !delta.requires_resync() {
            return None;
        }
        self.settled_at = None;
        if let Some(target) = self.pending_resync.take().or(self.position_ms) {
            commands.extend(self.resync(target));
        }
        Some(commands)
    }

    fn rebuild_entries(&mut self) {
        self.active.clear();
        self.settled_at = None;
        self.cursor = 0;
        self.entries = if self.options.merge_duplicates {
            merge_duplicates(&self.source, self.options.merge_window_ms)
        } else {
            self.source
                .iter()
                .cloned()
                .map(|comment| TimelineEntry {
                    comment,
                    occurrences: 1,
                })
                .collect()
        };
    }

    /// Clear every slot and recompute from scratch at `target_ms`.
    fn resync(&mut self, target_ms: u64) -> Vec<RenderCommand> {
        if self.settled_at == Some(target_ms) && self.position_ms == Some(target_ms) {
            trace!(target_ms, "resync at current target skipped");
            return Vec::new();
        }

        let mut commands = self.deactivate_all();

        let window_start = target_ms.saturating_sub(self.options.max_visible_duration_ms());
        let first = self
            .entries
            .partition_point(|entry| entry.show_at_ms() < window_start);
        let end = self
            .entries
            .partition_point(|entry| entry.show_at_ms() <= target_ms);

        for index in first..end {
            if let Some(command) = self.try_activate(index, target_ms) {
                commands.push(command);
            }
        }

        self.cursor = end;
        self.position_ms = Some(target_ms);
        self.settled_at = Some(target_ms);
        trace!(target_ms, commands = commands.len(), "timeline resynchronized");
        commands
    }

    fn advance(&mut self, position_ms: u64) -> Vec<RenderCommand> {
        let mut commands = Vec::new();

        let mut index = 0;
        while index < self.active.len() {
            if self.active[index].expires_at_ms <= position_ms {
                let slot = self.active.swap_remove(index);
                commands.push(RenderCommand::Deactivate {
                    slot_id: slot.slot_id,
                });
            } else {
                index += 1;
            }
        }

        while self.cursor < self.entries.len()
            && self.entries[self.cursor].show_at_ms() <= position_ms
        {
            if let Some(command) = self.try_activate(self.cursor, position_ms) {
                commands.push(command);
            }
            self.cursor += 1;
        }

        if self.position_ms != Some(position_ms) {
            self.settled_at = None;
        }
        self.position_ms = Some(position_ms);
        commands
    }

    fn try_activate(&mut self, index: usize, position_ms: u64) -> Option<RenderCommand> {
        let entry = &self.entries[index];
        let layer = entry.comment.comment.layer;
        let expires_at_ms = entry.show_at_ms() + self.options.visible_duration_ms(layer);
        if expires_at_ms <= position_ms {
            return None;
        }

        let Some(lane) = self.free_lane(layer) else {
            trace!(show_at_ms = entry.show_at_ms(), ?layer, "no free lane, comment dropped");
            return None;
        };

        let slot_id = SlotId(self.next_slot);
        self.next_slot += 1;
        self.active.push(ActiveSlot {
            slot_id,
            entry: index,
            lane,
            layer,
            expires_at_ms,
        });

        let entry = &self.entries[index];
        let comment = &entry.comment.comment;
        Some(RenderCommand::Activate {
            slot_id,
            lane,
            layer,
            text: entry.display_text(),
            font_size_px: comment.font_size_px,
            color_rgb: comment.color_rgb,
            stroke_color_rgb: comment.stroke_color_rgb,
            style: entry.comment.style,
        })
    }

    fn free_lane(&self, layer: CommentLayer) -> Option<u8> {
        let capacity = self.options.lane_limit.capacity();
        let mut used = vec![false; capacity];
        for slot in self.active.iter().filter(|slot| slot.layer == layer) {
            if let Some(taken) = used.get_mut(slot.lane as usize) {
                *taken = true;
            }
        }
        used.iter()
            .position(|taken| !taken)
            .and_then(|lane| u8::try_from(lane).ok())
    }

    fn deactivate_all(&mut self) -> Vec<RenderCommand> {
        self.active
            .drain(..)
            .map(|slot| RenderCommand::Deactivate {
                slot_id: slot.slot_id,
            })
            .collect()
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collapse comments with identical normalized text whose start lies within
/// `window_ms` of the first comment of their group.
fn merge_duplicates(source: &[StyledComment], window_ms: u64) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = Vec::with_capacity(source.len());
    let mut open: HashMap<String, usize> = HashMap::new();

    for styled in source {
        let key = normalize_text(&styled.comment.text);
        let show_at_ms = styled.comment.show_at_ms;

        if let Some(&index) = open.get(&key) {
            let entry = &mut entries[index];
            if show_at_ms - entry.show_at_ms() <= window_ms {
                entry.occurrences += 1;
                continue;
            }
        }

        open.insert(key, entries.len());
        entries.push(TimelineEntry {
            comment: styled.clone(),
            occurrences: 1,
        });
    }

    entries
}
