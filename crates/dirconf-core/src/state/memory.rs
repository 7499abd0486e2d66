// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Provides a simple, fast state store that doesn't persist across restarts.
// Useful for testing and for one-shot runs that import and converge in the
// same process.
//
// ## Crash Behavior
//
// - All state is lost on exit
// - The next run sees every desired resource as new and tries to create it;
//   objects that already exist fail with a conflict until imported

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::traits::state_store::{StateRecord, StateStore, StateStoreFactory};
use crate::Error;

/// In-memory state store implementation
///
/// # Example
///
/// ```rust,no_run
/// use dirconf_core::state::MemoryStateStore;
/// use dirconf_core::traits::{StateRecord, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///
///     let record = StateRecord::new("location", "east", serde_json::json!({"id": "east"}));
///     store.set("location.east", &record).await?;
///
///     let loaded = store.get("location.east").await?;
///     assert_eq!(loaded.map(|r| r.id), Some("east".to_string()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HashMap<String, StateRecord>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Clear all records from the store
    pub async fn clear(&self) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.clear();
        Ok(())
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, address: &str) -> Result<Option<StateRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(address).cloned())
    }

    async fn set(&self, address: &str, record: &StateRecord) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(address.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, address: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(address);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().await;
        let mut addresses: Vec<String> = guard.keys().cloned().collect();
        addresses.sort();
        Ok(addresses)
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}

/// Factory for the `memory` state store type
pub struct MemoryStateStoreFactory;

#[async_trait]
impl StateStoreFactory for MemoryStateStoreFactory {
    async fn create(&self, _config: &serde_json::Value) -> Result<Box<dyn StateStore>, Error> {
        Ok(Box::new(MemoryStateStore::new()))
    }
}
