//! Plugin-based resource registry
//!
//! The registry maps resource type names to their [`Resource`]
//! implementations, and names to the factories that build configuration API
//! clients and state stores. Nothing in the engine knows a concrete type.
//!
//! ## Registration
//!
//! Implementation crates register themselves during initialization:
//!
//! ```rust,ignore
//! // In dirconf-resources
//! pub fn register_all(registry: &ResourceRegistry) {
//!     registry.register_adapter(LocationAdapter);
//!     registry.register_adapter(PeriodicGcPluginAdapter);
//! }
//!
//! // In dirconf-client
//! pub fn register(registry: &ResourceRegistry) {
//!     registry.register_config_api("rest", Box::new(ConfigApiClientFactory));
//! }
//! ```

use crate::adapter::TypedResource;
use crate::config::{ConnectionConfig, StateStoreConfig};
use crate::error::{Error, Result};
use crate::state::{FileStateStoreFactory, MemoryStateStoreFactory};
use crate::traits::{ConfigApi, ConfigApiFactory, Resource, ResourceAdapter};
use crate::traits::{StateStore, StateStoreFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry of resource types and collaborator factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ResourceRegistry {
    /// Resource implementations by type name
    resources: RwLock<HashMap<String, Arc<dyn Resource>>>,

    /// Registered configuration API client factories
    config_apis: RwLock<HashMap<String, Arc<dyn ConfigApiFactory>>>,

    /// Registered state store factories
    state_stores: RwLock<HashMap<String, Arc<dyn StateStoreFactory>>>,
}

// A panic while holding one of these locks cannot leave a map half-updated,
// so a poisoned lock is still safe to use.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `memory` and `file` state stores registered
    pub fn with_builtin_state_stores() -> Self {
        let registry = Self::new();
        registry.register_state_store("memory", Box::new(MemoryStateStoreFactory));
        registry.register_state_store("file", Box::new(FileStateStoreFactory));
        registry
    }

    /// Register a typed adapter under its type name
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let registry = ResourceRegistry::new();
    /// registry.register_adapter(LocationAdapter);
    /// assert!(registry.has_resource("location"));
    /// ```
    pub fn register_adapter<A: ResourceAdapter>(&self, adapter: A) {
        self.register_resource(Arc::new(TypedResource::new(adapter)));
    }

    /// Register a resource implementation under its type name
    ///
    /// A later registration for the same name replaces the earlier one.
    pub fn register_resource(&self, resource: Arc<dyn Resource>) {
        let name = resource.type_name().to_string();
        let mut resources = write(&self.resources);
        if resources.insert(name.clone(), resource).is_some() {
            tracing::warn!("Resource type '{}' registered twice; keeping the latest", name);
        }
    }

    /// Register a configuration API client factory
    pub fn register_config_api(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ConfigApiFactory>,
    ) {
        let mut apis = write(&self.config_apis);
        apis.insert(name.into(), Arc::from(factory));
    }

    /// Register a state store factory
    ///
    /// # Parameters
    ///
    /// - `name`: State store type name (e.g., "file", "memory")
    /// - `factory`: Factory object for creating state store instances
    pub fn register_state_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn StateStoreFactory>,
    ) {
        let mut stores = write(&self.state_stores);
        stores.insert(name.into(), Arc::from(factory));
    }

    /// Resource implementation for a type name
    pub fn resource(&self, resource_type: &str) -> Option<Arc<dyn Resource>> {
        read(&self.resources).get(resource_type).cloned()
    }

    /// Resource implementation for a type name, or a configuration error
    pub fn require_resource(&self, resource_type: &str) -> Result<Arc<dyn Resource>> {
        self.resource(resource_type)
            .ok_or_else(|| Error::config(format!("Unknown resource type: {}", resource_type)))
    }

    /// Create a configuration API client with a registered factory
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ConfigApi>)`: Created client
    /// - `Err(Error)`: If the factory is not registered or creation fails
    pub fn create_config_api(
        &self,
        name: &str,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn ConfigApi>> {
        let factory = read(&self.config_apis)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown config API client: {}", name)))?;

        factory.create(config)
    }

    /// Create a state store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn StateStore>)`: Created state store instance
    /// - `Err(Error)`: If store type is not registered or creation fails
    pub async fn create_state_store(
        &self,
        config: &StateStoreConfig,
    ) -> Result<Box<dyn StateStore>> {
        let (store_type, config_json) = config.factory_config();

        // Clone the factory out so the lock is not held across the await
        let factory = read(&self.state_stores)
            .get(store_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown state store type: {}", store_type)))?;

        factory.create(&config_json).await
    }

    /// All registered resource type names, sorted
    pub fn list_resources(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.resources).keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered state store types, sorted
    pub fn list_state_stores(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.state_stores).keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a resource type is registered
    pub fn has_resource(&self, name: &str) -> bool {
        read(&self.resources).contains_key(name)
    }

    /// Check if a configuration API client factory is registered
    pub fn has_config_api(&self, name: &str) -> bool {
        read(&self.config_apis).contains_key(name)
    }

    /// Check if a state store type is registered
    pub fn has_state_store(&self, name: &str) -> bool {
        read(&self.state_stores).contains_key(name)
    }
}
