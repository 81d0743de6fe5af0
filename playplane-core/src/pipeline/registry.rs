use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use playplane_model::PluginId;

use super::{CommentFilter, CommentStyler};

/// Capability a registered plugin provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Filter,
    Styler,
}

pub(crate) struct Registered<P: ?Sized> {
    pub(crate) id: PluginId,
    pub(crate) plugin: Arc<P>,
    pub(crate) enabled: bool,
    applied: AtomicU64,
}

impl<P: ?Sized> Registered<P> {
    fn new(id: PluginId, plugin: Arc<P>) -> Self {
        Self {
            id,
            plugin,
            enabled: true,
            applied: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    fn reset_counter(&self) {
        self.applied.store(0, Ordering::Relaxed);
    }
}

/// Per-plugin counters since the plugin was last enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginStats {
    pub id: PluginId,
    pub kind: PluginKind,
    pub enabled: bool,
    pub applied: u64,
}

/// Typed plugin registry. Registration order is evaluation order; there is no
/// discovery, callers build the list explicitly.
#[derive(Default)]
pub struct PluginRegistry {
    pub(crate) filters: Vec<Registered<dyn CommentFilter>>,
    pub(crate) stylers: Vec<Registered<dyn CommentStyler>>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.stats())
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_filter(&mut self, filter: Arc<dyn CommentFilter>) -> &mut Self {
        let id = filter.id();
        self.filters.push(Registered::new(id, filter));
        self
    }

    pub fn register_styler(&mut self, styler: Arc<dyn CommentStyler>) -> &mut Self {
        let id = styler.id();
        self.stylers.push(Registered::new(id, styler));
        self
    }

    pub fn contains(&self, id: &PluginId) -> bool {
        self.filters.iter().any(|entry| &entry.id == id)
            || self.stylers.iter().any(|entry| &entry.id == id)
    }

    pub fn is_enabled(&self, id: &PluginId) -> Option<bool> {
        self.filters
            .iter()
            .find(|entry| &entry.id == id)
            .map(|entry| entry.enabled)
            .or_else(|| {
                self.stylers
                    .iter()
                    .find(|entry| &entry.id == id)
                    .map(|entry| entry.enabled)
            })
    }

    /// Toggle a plugin. A real toggle starts a new counting session; setting
    /// the current value again keeps the counter. Returns `false` when no
    /// plugin has that id.
    pub fn set_enabled(&mut self, id: &PluginId, enabled: bool) -> bool {
        let mut found = false;
        for entry in self.filters.iter_mut().filter(|entry| &entry.id == id) {
            toggle(entry, enabled);
            found = true;
        }
        for entry in self.stylers.iter_mut().filter(|entry| &entry.id == id) {
            toggle(entry, enabled);
            found = true;
        }
        found
    }

    pub fn reset_counters(&self) {
        self.filters.iter().for_each(Registered::reset_counter);
        self.stylers.iter().for_each(Registered::reset_counter);
    }

    pub fn stats(&self) -> Vec<PluginStats> {
        let filters = self.filters.iter().map(|entry| PluginStats {
            id: entry.id.clone(),
            kind: PluginKind::Filter,
            enabled: entry.enabled,
            applied: entry.applied(),
        });
        let stylers = self.stylers.iter().map(|entry| PluginStats {
            id: entry.id.clone(),
            kind: PluginKind::Styler,
            enabled: entry.enabled,
            applied: entry.applied(),
        });
        filters.chain(stylers).collect()
    }
}

fn toggle<P: ?Sized>(entry: &mut Registered<P>, enabled: bool) {
    if entry.enabled != enabled {
        entry.enabled = enabled;
        entry.reset_counter();
    }
}
