use std::fmt;
use std::sync::Arc;

use playplane_model::PluginId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::ports::KeyValueStore;

/// JSON-encoded plugin settings in the shared key-value store, keyed as
/// `{namespace}:plugin:{plugin_id}`.
#[derive(Clone)]
pub struct PluginConfigStore {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl fmt::Debug for PluginConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfigStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl PluginConfigStore {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn key(&self, plugin: &PluginId) -> String {
        format!("{}:plugin:{}", self.namespace, plugin)
    }

    /// Stored settings, or `None` when nothing (or nothing readable) is stored.
    pub async fn load<T: DeserializeOwned>(&self, plugin: &PluginId) -> Result<Option<T>> {
        let key = self.key(plugin);
        let Some(raw) = self.store.get(&key).await.map_err(CoreError::store)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(%key, error = %err, "ignoring unreadable plugin config");
                Ok(None)
            }
        }
    }

    pub async fn save<T: Serialize + ?Sized>(&self, plugin: &PluginId, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store
            .set(&self.key(plugin), raw)
            .await
            .map_err(CoreError::store)
    }
}
