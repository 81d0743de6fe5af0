//! Resume-position cache over the key-value store.
//!
//! Keys are `{namespace}:progress:{content_id}` for content without parts
//! and `{namespace}:progress:{content_id}:{sub_content_id}` otherwise, so
//! every part of multi-part content resumes independently.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use playplane_config::ProgressConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::ports::KeyValueStore;

/// Stored value for one resume position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub position_ms: u64,
    /// Unix seconds (UTC) of the write; zero for legacy bare values.
    #[serde(default)]
    pub saved_at: i64,
}

impl ProgressEntry {
    fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok().or_else(|| {
            raw.trim().parse::<u64>().ok().map(|position_ms| Self {
                position_ms,
                saved_at: 0,
            })
        })
    }
}

pub fn progress_key(namespace: &str, content_id: u64, sub_content_id: u64) -> String {
    if sub_content_id != 0 {
        format!("{namespace}:progress:{content_id}:{sub_content_id}")
    } else {
        format!("{namespace}:progress:{content_id}")
    }
}

#[derive(Clone)]
pub struct ProgressCache {
    store: Arc<dyn KeyValueStore>,
    config: ProgressConfig,
}

impl fmt::Debug for ProgressCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProgressCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: ProgressConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    pub fn key(&self, content_id: u64, sub_content_id: u64) -> String {
        progress_key(&self.config.namespace, content_id, sub_content_id)
    }

    pub async fn save_position(
        &self,
        content_id: u64,
        sub_content_id: u64,
        position_ms: u64,
    ) -> Result<()> {
        let key = self.key(content_id, sub_content_id);
        let entry = ProgressEntry {
            position_ms,
            saved_at: Utc::now().timestamp(),
        };
        let raw = serde_json::to_string(&entry)?;
        self.store.set(&key, raw).await.map_err(CoreError::store)?;
        debug!(%key, position_ms, "resume position saved");
        Ok(())
    }

    /// Cached position, or `None` if nothing readable is stored.
    pub async fn get_cached_position(
        &self,
        content_id: u64,
        sub_content_id: u64,
    ) -> Result<Option<u64>> {
        let key = self.key(content_id, sub_content_id);
        let Some(raw) = self.store.get(&key).await.map_err(CoreError::store)? else {
            return Ok(None);
        };

        match ProgressEntry::decode(&raw) {
            Some(entry) => Ok(Some(entry.position_ms)),
            None => {
                warn!(%key, "ignoring unreadable resume position");
                Ok(None)
            }
        }
    }

    pub async fn clear_position(&self, content_id: u64, sub_content_id: u64) -> Result<()> {
        let key = self.key(content_id, sub_content_id);
        self.store.remove(&key).await.map_err(CoreError::store)
    }

    /// Position worth resuming from: positions too close to the start, or
    /// within the end margin of a known duration, restart from zero.
    pub async fn resume_position(
        &self,
        content_id: u64,
        sub_content_id: u64,
        duration_ms: u64,
    ) -> Result<Option<u64>> {
        let Some(position_ms) = self.get_cached_position(content_id, sub_content_id).await?
        else {
            return Ok(None);
        };
        Ok(self.resumable(position_ms, duration_ms).then_some(position_ms))
    }

    fn resumable(&self, position_ms: u64, duration_ms: u64) -> bool {
        if position_ms < self.config.min_resume_ms {
            return false;
        }
        duration_ms == 0 || position_ms.saturating_add(self.config.end_margin_ms) < duration_ms
    }
}

/// Decides when a periodic save is due.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval_ms: u64,
    last_saved: Option<u64>,
}

impl ProgressThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_saved: None,
        }
    }

    /// Due when playback moved at least the interval (either direction)
    /// since the last save. Nothing is due before the first save baseline.
    pub fn is_due(&self, position_ms: u64) -> bool {
        match self.last_saved {
            None => position_ms >= self.interval_ms,
            Some(last) => position_ms.abs_diff(last) >= self.interval_ms,
        }
    }

    pub fn mark_saved(&mut self, position_ms: u64) {
        self.last_saved = Some(position_ms);
    }

    pub fn last_saved(&self) -> Option<u64> {
        self.last_saved
    }

    pub fn reset(&mut self) {
        self.last_saved = None;
    }
}

/// Process-local [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).map(|value| value.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockKeyValueStore;

    fn cache() -> (Arc<InMemoryStore>, ProgressCache) {
        let store = Arc::new(InMemoryStore::new());
        let cache = ProgressCache::new(store.clone(), ProgressConfig::default());
        (store, cache)
    }

    #[test]
    fn key_degrades_without_sub_content() {
        assert_eq!(progress_key("ns", 42, 0), "ns:progress:42");
        assert_eq!(progress_key("ns", 42, 7), "ns:progress:42:7");
    }

    #[tokio::test]
    async fn parts_of_one_content_do_not_collide() {
        let (store, cache) = cache();
        cache.save_position(500, 1001, 600_000).await.unwrap();
        cache.save_position(500, 1002, 120_000).await.unwrap();
        cache.save_position(500, 0, 30_000).await.unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(cache.get_cached_position(500, 1001).await.unwrap(), Some(600_000));
        assert_eq!(cache.get_cached_position(500, 1002).await.unwrap(), Some(120_000));
        assert_eq!(cache.get_cached_position(500, 0).await.unwrap(), Some(30_000));
        assert_eq!(cache.get_cached_position(501, 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn bare_and_corrupt_values() {
        let (store, cache) = cache();
        store.set("playplane:progress:1", "45000".into()).await.unwrap();
        store.set("playplane:progress:2", "garbage".into()).await.unwrap();

        assert_eq!(cache.get_cached_position(1, 0).await.unwrap(), Some(45_000));
        assert_eq!(cache.get_cached_position(2, 0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn resume_applies_start_and_end_margins() {
        let (_, cache) = cache();
        cache.save_position(1, 0, 3_000).await.unwrap();
        cache.save_position(2, 0, 95_000).await.unwrap();
        cache.save_position(3, 0, 50_000).await.unwrap();

        assert_eq!(cache.resume_position(1, 0, 100_000).await.unwrap(), None);
        assert_eq!(cache.resume_position(2, 0, 100_000).await.unwrap(), None);
        assert_eq!(cache.resume_position(3, 0, 100_000).await.unwrap(), Some(50_000));
        assert_eq!(cache.resume_position(2, 0, 0).await.unwrap(), Some(95_000));
    }

    #[tokio::test]
    async fn clear_removes_only_that_part() {
        let (store, cache) = cache();
        cache.save_position(9, 1, 10_000).await.unwrap();
        cache.save_position(9, 2, 20_000).await.unwrap();

        cache.clear_position(9, 1).await.unwrap();
        assert_eq!(store.keys(), vec!["playplane:progress:9:2".to_string()]);
    }

    #[tokio::test]
    async fn store_failures_surface_as_store_errors() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(anyhow::anyhow!("disk on fire")));
        let cache = ProgressCache::new(Arc::new(store), ProgressConfig::default());

        let err = cache.get_cached_position(1, 0).await.unwrap_err();
        assert!(matches!(err, CoreError::Store(message) if message.contains("disk on fire")));
    }

    #[test]
    fn throttle_waits_for_the_interval() {
        let mut throttle = ProgressThrottle::new(15_000);
        assert!(!throttle.is_due(10_000));
        assert!(throttle.is_due(15_000));

        throttle.mark_saved(15_000);
        assert!(!throttle.is_due(29_999));
        assert!(throttle.is_due(30_000));
        assert!(throttle.is_due(0));

        throttle.reset();
        assert_eq!(throttle.last_saved(), None);
    }
}
