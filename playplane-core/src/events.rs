use playplane_model::{ContentKey, SchedulerState};
use tokio::sync::broadcast;

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Notifications a host can observe without polling the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    ContentLoaded {
        content: ContentKey,
    },
    CommentsArmed {
        content: ContentKey,
        count: usize,
        dropped: usize,
    },
    SegmentsLoaded {
        content: ContentKey,
        count: usize,
    },
    SchedulerStateChanged {
        from: SchedulerState,
        to: SchedulerState,
    },
    SegmentSkipped {
        segment_id: String,
        target_ms: u64,
        reason: String,
    },
    ProgressSaved {
        content: ContentKey,
        position_ms: u64,
    },
}

/// In-process fan-out of [`PlaybackEvent`]s. Publishing without subscribers
/// is fine; slow subscribers lag rather than block playback.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlaybackEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: PlaybackEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
