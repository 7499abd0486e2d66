// # State Store Trait
//
// Defines the interface for persistent state management.
//
// ## Purpose
//
// The state store records, for every managed resource address:
// - The resource type and the object's id on the server
// - The attributes observed after the last successful operation
// - When that happened
//
// Planning compares the desired configuration against this record, so an
// unchanged configuration produces no API calls.
//
// ## Implementations
//
// - Memory: `MemoryStateStore`
// - File-based: `FileStateStore` (JSON, atomic writes, backup)

use async_trait::async_trait;
use serde_json::Value;

/// State record for one managed resource
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateRecord {
    /// Resource type name
    pub resource_type: String,
    /// Object name on the server
    pub id: String,
    /// Attributes observed after the last successful operation
    pub attributes: Value,
    /// Timestamp of the last update
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

impl StateRecord {
    /// Create a new state record stamped with the current time
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>, attributes: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes,
            last_updated: chrono::Utc::now(),
        }
    }
}

/// Trait for state store implementations
///
/// Records are keyed by resource address (`<type>.<name>`).
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// ## Implementation Guidelines
///
/// - **Async I/O only**: Use async file/database operations, never blocking I/O
/// - **Explicit flush**: `flush()` must persist all pending changes
/// - **No business logic**: deciding what to change belongs to the `Reconciler`
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the record for an address
    ///
    /// # Returns
    ///
    /// - `Ok(Some(StateRecord))`: The record
    /// - `Ok(None)`: Address not managed yet
    /// - `Err(Error)`: Storage error
    async fn get(&self, address: &str) -> Result<Option<StateRecord>, crate::Error>;

    /// Create or replace the record for an address
    async fn set(&self, address: &str, record: &StateRecord) -> Result<(), crate::Error>;

    /// Delete the record for an address (no error if absent)
    async fn delete(&self, address: &str) -> Result<(), crate::Error>;

    /// List all addresses in the store, sorted
    async fn list(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing state stores from configuration
#[async_trait]
pub trait StateStoreFactory: Send + Sync {
    /// Create a StateStore instance from its JSON configuration
    async fn create(&self, config: &serde_json::Value)
    -> Result<Box<dyn StateStore>, crate::Error>;
}
