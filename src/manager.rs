use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::RemoteStoreConfig;
use crate::store::{FirestoreClient, RemoteStore};

/// Bridges the remote configuration store and a local in-memory cache,
/// preferring the remote store whenever it is reachable.
///
/// Remote failures never escape: initialization, reads and writes all
/// degrade to the cache with a warning, so a dead backend costs
/// persistence, not uptime.
pub struct ConfigManager {
    remote_config: RemoteStoreConfig,
    local_cache: HashMap<String, Value>,
    remote: Option<Box<dyn RemoteStore>>,
}

impl ConfigManager {
    /// Build a manager and attempt the remote-store connection once.
    pub async fn new(remote_config: RemoteStoreConfig) -> Self {
        let mut manager = Self {
            remote_config,
            local_cache: HashMap::new(),
            remote: None,
        };
        manager.init_remote().await;
        manager
    }

    /// Build a manager around an injected store implementation.
    ///
    /// Follows the same contract as `new`: a failing `connect` leaves the
    /// manager in local-only mode instead of propagating.
    pub async fn with_store(remote_config: RemoteStoreConfig, mut store: Box<dyn RemoteStore>) -> Self {
        let remote = match store.connect().await {
            Ok(()) => {
                info!(project_id = %remote_config.project_id, "Connected to remote store");
                Some(store)
            }
            Err(e) => {
                warn!("Remote store unavailable, running in local-only mode: {}", e);
                None
            }
        };

        Self {
            remote_config,
            local_cache: HashMap::new(),
            remote,
        }
    }

    async fn init_remote(&mut self) {
        if !self.remote_config.credentials_available() {
            warn!("No remote store credentials, running in local-only mode");
            return;
        }

        let client = match FirestoreClient::new(&self.remote_config) {
            Ok(client) => client,
            Err(e) => {
                warn!("Remote store setup failed, running in local-only mode: {}", e);
                return;
            }
        };

        let mut store: Box<dyn RemoteStore> = Box::new(client);
        match store.connect().await {
            Ok(()) => {
                info!(
                    project_id = %self.remote_config.project_id,
                    "Connected to remote store"
                );
                self.remote = Some(store);
            }
            Err(e) => {
                warn!("Remote store connection failed, running in local-only mode: {}", e);
            }
        }
    }

    pub fn is_remote_connected(&self) -> bool {
        self.remote.is_some()
    }

    /// Look up a config value, remote first, cache as fallback.
    ///
    /// A successful remote read refreshes the cache; a remote error or a
    /// key the remote does not know falls back to whatever is cached.
    pub async fn get(&mut self, key: &str) -> Option<Value> {
        if let Some(remote) = &self.remote {
            match remote.read(key).await {
                Ok(Some(value)) => {
                    self.local_cache.insert(key.to_string(), value.clone());
                    return Some(value);
                }
                Ok(None) => {
                    debug!("No remote document for '{}', using cache", key);
                }
                Err(e) => {
                    warn!("Remote read for '{}' failed, using cache: {}", key, e);
                }
            }
        }

        self.local_cache.get(key).cloned()
    }

    /// Store a config value in the cache and, best effort, remotely.
    pub async fn set(&mut self, key: &str, value: Value) {
        self.local_cache.insert(key.to_string(), value.clone());

        if let Some(remote) = &self.remote {
            if let Err(e) = remote.write(key, &value).await {
                warn!("Remote write for '{}' failed, value cached locally: {}", key, e);
            }
        }
    }

    /// Push every cached entry to the remote store, stamping the sync time.
    ///
    /// Returns false when there is nothing to push to (local-only mode)
    /// or when any write failed.
    pub async fn sync_to_remote(&self) -> bool {
        let Some(remote) = &self.remote else {
            debug!("Sync skipped, running in local-only mode");
            return false;
        };

        let mut all_ok = true;
        for (key, value) in &self.local_cache {
            if let Err(e) = remote.write(key, value).await {
                warn!("Sync of '{}' failed: {}", key, e);
                all_ok = false;
            }
        }

        let stamp = Value::String(chrono::Utc::now().to_rfc3339());
        if let Err(e) = remote.write("last_synced_at", &stamp).await {
            warn!("Sync timestamp write failed: {}", e);
            all_ok = false;
        }

        if all_ok {
            info!("Synced {} config entries to remote store", self.local_cache.len());
        }
        all_ok
    }
}
