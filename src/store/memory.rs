use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::{RemoteStore, StoreError};

/// In-process store with the same surface as the remote backend.
///
/// Clones share the underlying map, so a test can hand one clone to the
/// manager and inspect the other afterwards.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.documents.write().unwrap().insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.documents.read().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn connect(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.insert(key, value.clone());
        Ok(())
    }
}
