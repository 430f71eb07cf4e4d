//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::{KeyValueStore, StorageError};

/// Records held in process memory.
///
/// Clones share the same records, so a clone handed to a second
/// [`CartStore`](crate::CartStore) sees what the first one wrote. That is how
/// tests simulate an application restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, as if a previous session had written it.
    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.lock().await.insert(key.into(), value.into());
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.inner.lock().await.insert(key.to_owned(), value);
        Ok(())
    }
}
